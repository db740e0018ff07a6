use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use roxmltree::{Document, ParsingOptions};

use crate::error::RenumberError;

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A diagram document decoded to text, ready for both XML passes.
///
/// The byte-order mark (if any) is split off so both passes see plain text; it is re-emitted in
/// front of the rewritten output. Documents declaring a non-UTF-8 encoding are transcoded, and
/// [`SourceDocument::transcoded_from`] names the original encoding so the declaration can be
/// updated on output.
#[derive(Debug, Clone)]
pub struct SourceDocument<'a> {
    text: Cow<'a, str>,
    has_bom: bool,
    transcoded_from: Option<&'static Encoding>,
}

impl<'a> SourceDocument<'a> {
    /// Decode `bytes` using the BOM or the encoding named by the XML declaration (UTF-8 when
    /// neither is present).
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, RenumberError> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            return Ok(Self {
                text: Cow::Borrowed(std::str::from_utf8(rest)?),
                has_bom: true,
                transcoded_from: None,
            });
        }

        let encoding = declared_encoding(bytes)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        if encoding == UTF_8 {
            return Ok(Self {
                text: Cow::Borrowed(std::str::from_utf8(bytes)?),
                has_bom: false,
                transcoded_from: None,
            });
        }

        let text = encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or(RenumberError::Decode {
                encoding: encoding.name(),
            })?;
        Ok(Self {
            text: Cow::Owned(text.into_owned()),
            has_bom: false,
            transcoded_from: Some(encoding),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_bom(&self) -> bool {
        self.has_bom
    }

    /// The declared encoding the text was converted from, when it was not UTF-8.
    pub fn transcoded_from(&self) -> Option<&'static Encoding> {
        self.transcoded_from
    }

    /// Parse the text into a tree, failing on anything that is not well-formed XML.
    pub fn parse(&self) -> Result<Document<'_>, RenumberError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        Ok(Document::parse_with_options(&self.text, options)?)
    }
}

/// The `encoding` pseudo-attribute of the XML declaration, if the document starts with one.
///
/// Only the prolog is read, so the rest of the document may be in any ASCII-compatible encoding.
pub fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let mut reader = XmlReader::from_reader(bytes);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Decl(decl) => {
                let encoding = decl.encoding()?.ok()?;
                return Some(String::from_utf8_lossy(&encoding).into_owned());
            }
            Event::Start(_) | Event::Empty(_) | Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}
