//! Renumber the cell identifiers of an mxGraph (draw.io) diagram.
//!
//! Every distinct `id` on an `mxCell` element, other than the reserved root (`0`) and default
//! layer (`1`), is replaced by a sequential integer starting at 2, in document order of first
//! appearance. `parent`, `source` and `target` attributes that point at a renamed cell are updated
//! to the new value; any other reference is left exactly as it was.
//!
//! The rewrite works on the raw document text: everything outside the rewritten attribute values
//! (declaration, comments, whitespace, non-cell elements, untouched cells) is copied byte for byte.
//! Documents declaring a legacy encoding are decoded with `encoding_rs` and written as UTF-8.

pub mod cli;
mod collect;
mod document;
mod error;
pub mod fs;
mod rewrite;
mod table;

use std::path::Path;

use log::info;
use serde::Serialize;

pub use collect::{collect_ids, CollectStats};
pub use document::{declared_encoding, SourceDocument};
pub use error::RenumberError;
pub use rewrite::{rewrite_cells, DanglingReference, RewriteStats, REFERENCE_ATTRS};
pub use table::{is_reserved, RenameTable, DEFAULT_FIRST_ID, RESERVED_IDS};

/// Tag name of the elements that carry identifiers.
pub const DEFAULT_CELL_TAG: &str = "mxCell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberOptions {
    /// Local name of the elements whose identifiers are renumbered.
    pub cell_tag: String,
    /// First identifier handed out. Must not collide with [`RESERVED_IDS`].
    pub first_id: u64,
}

impl Default for RenumberOptions {
    fn default() -> Self {
        Self {
            cell_tag: DEFAULT_CELL_TAG.to_string(),
            first_id: DEFAULT_FIRST_ID,
        }
    }
}

/// Summary of a single renumbering run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenumberReport {
    pub cells: usize,
    pub mapped_ids: usize,
    pub duplicate_ids: usize,
    pub rewritten_attributes: usize,
    pub dangling_references: Vec<DanglingReference>,
}

/// A rewritten document together with the table used to produce it.
#[derive(Debug, Clone)]
pub struct Renumbered {
    pub bytes: Vec<u8>,
    pub table: RenameTable,
    pub report: RenumberReport,
}

/// Renumber an in-memory document.
pub fn renumber_bytes(
    input: &[u8],
    options: &RenumberOptions,
) -> Result<Renumbered, RenumberError> {
    let source = SourceDocument::from_bytes(input)?;
    if let Some(encoding) = source.transcoded_from() {
        info!("document declares {}; writing it as UTF-8", encoding.name());
    }

    let doc = source.parse()?;
    let (table, collected) = collect_ids(&doc, &options.cell_tag, options.first_id);
    let (body, rewritten) = rewrite_cells(&source, &doc, &options.cell_tag, &table)?;

    let mut bytes = Vec::with_capacity(body.len() + 3);
    if source.has_bom() {
        bytes.extend_from_slice(document::UTF8_BOM);
    }
    bytes.extend_from_slice(&body);

    let report = RenumberReport {
        cells: collected.cells,
        mapped_ids: table.len(),
        duplicate_ids: collected.duplicate_ids,
        rewritten_attributes: rewritten.rewritten_attributes,
        dangling_references: rewritten.dangling_references,
    };

    Ok(Renumbered {
        bytes,
        table,
        report,
    })
}

/// Read `input`, renumber it, and atomically write the result to `output`.
///
/// `input` is never modified; asking for the output to replace it is an error.
pub fn renumber_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &RenumberOptions,
) -> Result<Renumbered, RenumberError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let bytes = std::fs::read(input).map_err(|source| RenumberError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let renumbered = renumber_bytes(&bytes, options)?;

    if fs::canonical_or_absolute(input) == fs::canonical_or_absolute(output) {
        return Err(RenumberError::SameFile {
            path: output.to_path_buf(),
        });
    }
    fs::write_atomically(output, &renumbered.bytes)?;

    info!(
        "renumbered {} ids across {} cells ({} attributes rewritten) -> {}",
        renumbered.report.mapped_ids,
        renumbered.report.cells,
        renumbered.report.rewritten_attributes,
        output.display()
    );
    Ok(renumbered)
}
