use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum XPathError {
    #[error("lex error in '{expression}': {message}")]
    Lex { expression: String, message: String },

    #[error("parse error in '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("unknown axis '{0}'")]
    UnknownAxis(String),

    #[error("expression ends unexpectedly")]
    UnexpectedEnd,
}
