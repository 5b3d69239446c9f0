use std::{io, str::Utf8Error};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{element} is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("malformed tag on element {element_id}: {message}")]
    MalformedTag { element_id: String, message: String },

    #[error("attribute `{key}` could not be decoded: {message}")]
    BadAttribute { key: String, message: String },

    #[error("record field `{field}` has no column in the {sink} output")]
    UnexpectedField { sink: String, field: String },

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("could not write XML: {0}")]
    XmlWrite(#[from] quick_xml::Error),

    #[error(transparent)]
    Attr(#[from] AttrError),

    #[error(transparent)]
    Utf8(#[from] Utf8Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Errors that only concern the element being processed. The pipeline
    /// drops that element and carries on; everything else aborts the run.
    pub fn is_element_scoped(&self) -> bool {
        matches!(
            self,
            Error::MissingAttribute { .. }
                | Error::MalformedTag { .. }
                | Error::BadAttribute { .. }
                | Error::UnexpectedField { .. }
                | Error::Attr(_)
                | Error::Utf8(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
