use thiserror::Error;

/// Errors raised by the loader, the tree model, and value validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("pattern error on '{node}': {message}")]
    PatternRegex { node: String, message: String },

    #[error("value '{value}' is out of range '{range}'")]
    OutOfRange { value: String, range: String },

    #[error("value '{value}' is not a valid enumeration entry for '{node}'")]
    EnumInvalid { node: String, value: String },

    #[error("no schema node matches '{0}'")]
    NoSchemaNode(String),

    #[error("'{0}' is not readable")]
    NotReadable(String),

    #[error("'{0}' is not writable")]
    NotWritable(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] std::io::Error),
}
