use canopy_schema::SchemaError;
use thiserror::Error;

/// NETCONF-flavored tags attached to edit-mode XML failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditErrorTag {
    BadAttribute,
    UnknownAttribute,
    OperationNotSupported,
    MalformedMessage,
    InvalidValue,
}

impl std::fmt::Display for EditErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            EditErrorTag::BadAttribute => "bad-attribute",
            EditErrorTag::UnknownAttribute => "unknown-attribute",
            EditErrorTag::OperationNotSupported => "operation-not-supported",
            EditErrorTag::MalformedMessage => "malformed-message",
            EditErrorTag::InvalidValue => "invalid-value",
        };
        f.write_str(tag)
    }
}

/// The structured error object surfaced by edit-mode XML translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tag}: {message}")]
pub struct EditError {
    pub tag: EditErrorTag,
    /// The offending attribute, when one is implicated.
    pub attribute: Option<String>,
    pub message: String,
}

impl EditError {
    pub fn new(tag: EditErrorTag, message: impl Into<String>) -> Self {
        EditError {
            tag,
            attribute: None,
            message: message.into(),
        }
    }

    pub fn with_attribute(
        tag: EditErrorTag,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EditError {
            tag,
            attribute: Some(attribute.into()),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("list entry under '{0}' is missing its key")]
    KeyMissing(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] std::io::Error),
}
