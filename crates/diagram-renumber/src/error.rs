use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenumberError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("document is not valid {encoding}")]
    Decode { encoding: &'static str },
    #[error("document is not well-formed xml: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("failed to serialize document: {0}")]
    Serialize(String),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output path {} refers to the input document", path.display())]
    SameFile { path: PathBuf },
}

impl RenumberError {
    /// The input could not be read or is not a well-formed document.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            RenumberError::Read { .. }
                | RenumberError::NotUtf8(_)
                | RenumberError::Decode { .. }
                | RenumberError::Malformed(_)
                | RenumberError::Xml(_)
                | RenumberError::XmlAttr(_)
        )
    }

    /// The output could not be created or written.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            RenumberError::Serialize(_)
                | RenumberError::Write { .. }
                | RenumberError::SameFile { .. }
        )
    }
}
