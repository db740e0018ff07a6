use std::borrow::Cow;
use std::collections::HashMap;

use log::debug;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};
use roxmltree::{Document, Node};
use serde::Serialize;

use crate::collect::is_cell;
use crate::document::SourceDocument;
use crate::error::RenumberError;
use crate::table::{is_reserved, RenameTable};

/// Cell attributes that point at another cell's `id`.
pub const REFERENCE_ATTRS: [&str; 3] = ["parent", "source", "target"];

/// A reference attribute whose value matches no cell `id` and is not reserved.
///
/// These are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// Original `id` of the cell carrying the reference, if it has one.
    pub cell_id: Option<String>,
    pub attribute: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub rewritten_attributes: usize,
    pub dangling_references: Vec<DanglingReference>,
}

/// Replace `id`/`parent`/`source`/`target` values on the cells of `source` with their
/// [`RenameTable`] entries.
///
/// quick-xml only locates the tags to rebuild. Attribute values are taken from the parsed `doc`,
/// so lookups see the same entity-expanded, whitespace-normalized values the table was built from.
/// Every byte outside a rebuilt tag is copied from the source text unchanged.
pub fn rewrite_cells(
    source: &SourceDocument<'_>,
    doc: &Document<'_>,
    cell_tag: &str,
    table: &RenameTable,
) -> Result<(Vec<u8>, RewriteStats), RenumberError> {
    let text = source.text();
    let cells: HashMap<usize, Node<'_, '_>> = doc
        .descendants()
        .filter(|n| is_cell(*n, cell_tag))
        .map(|n| (n.range().start, n))
        .collect();

    let mut reader = XmlReader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut writer = XmlWriter::new(Vec::with_capacity(text.len()));
    let mut stats = RewriteStats::default();
    let mut copied = 0;

    loop {
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        let start = tag_start(text, end);

        let replacement = match &event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == cell_tag.as_bytes() => {
                match cells.get(&start) {
                    Some(node) => rewrite_cell(e, *node, table, &mut stats)?.map(|rebuilt| {
                        if matches!(event, Event::Start(_)) {
                            Event::Start(rebuilt)
                        } else {
                            Event::Empty(rebuilt)
                        }
                    }),
                    None => None,
                }
            }
            Event::Decl(decl) if source.transcoded_from().is_some() => {
                Some(Event::Decl(utf8_declaration(decl)?))
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(replacement) = replacement {
            writer
                .get_mut()
                .extend_from_slice(&text.as_bytes()[copied..start]);
            writer
                .write_event(replacement)
                .map_err(|e| RenumberError::Serialize(e.to_string()))?;
            copied = end;
        }
    }
    writer
        .get_mut()
        .extend_from_slice(&text.as_bytes()[copied..]);

    Ok((writer.into_inner(), stats))
}

/// Offset of the `<` opening the markup that ends at `end`.
///
/// Tags and the declaration cannot contain a literal `<`, so it is the last one before `end`.
fn tag_start(text: &str, end: usize) -> usize {
    text[..end].rfind('<').unwrap_or(0)
}

/// The declaration re-emitted for output that has been transcoded to UTF-8.
fn utf8_declaration(decl: &BytesDecl<'_>) -> Result<BytesDecl<'static>, RenumberError> {
    let version = decl.version()?;
    let standalone = decl.standalone().transpose()?;
    let standalone = standalone
        .as_deref()
        .map(std::str::from_utf8)
        .transpose()?;
    Ok(BytesDecl::new(
        std::str::from_utf8(&version)?,
        Some("UTF-8"),
        standalone,
    ))
}

fn identifier_attr(key: &[u8]) -> Option<&'static str> {
    if key == b"id" {
        return Some("id");
    }
    REFERENCE_ATTRS
        .into_iter()
        .find(|name| key == name.as_bytes())
}

/// Returns `None` when no attribute of the cell needs a new value, so the original tag bytes are
/// kept.
fn rewrite_cell(
    e: &BytesStart<'_>,
    node: Node<'_, '_>,
    table: &RenameTable,
    stats: &mut RewriteStats,
) -> Result<Option<BytesStart<'static>>, RenumberError> {
    let attrs = e.attributes().collect::<Result<Vec<Attribute<'_>>, _>>()?;
    let cell_id = node.attribute("id");

    let mut replacements: Vec<Option<(&'static str, &str)>> = Vec::with_capacity(attrs.len());
    for attr in &attrs {
        let Some(name) = identifier_attr(attr.key.as_ref()) else {
            replacements.push(None);
            continue;
        };
        let Some(value) = node.attribute(name) else {
            replacements.push(None);
            continue;
        };
        let replacement = table.get(value);
        if replacement.is_none() && name != "id" && !is_reserved(value) {
            debug!(
                "cell {:?}: {name}={value:?} does not match any cell id; leaving it as is",
                cell_id.unwrap_or_default()
            );
            stats.dangling_references.push(DanglingReference {
                cell_id: cell_id.map(str::to_string),
                attribute: name,
                value: value.to_string(),
            });
        }
        replacements.push(replacement.map(|new_value| (name, new_value)));
    }

    if replacements.iter().all(Option::is_none) {
        return Ok(None);
    }

    let mut rebuilt = e.clone().into_owned();
    rebuilt.clear_attributes();
    for (attr, replacement) in attrs.iter().zip(&replacements) {
        match replacement {
            Some((name, new_value)) => {
                rebuilt.push_attribute((*name, *new_value));
                stats.rewritten_attributes += 1;
            }
            // Raw values are re-emitted inside double quotes, so a value that was single-quoted
            // around a literal `"` needs it escaped.
            None if attr.value.contains(&b'"') => {
                let value = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
                rebuilt.push_attribute((attr.key.as_ref(), value.as_bytes()));
            }
            None => rebuilt.push_attribute(attr.clone()),
        }
    }

    Ok(Some(rebuilt))
}
