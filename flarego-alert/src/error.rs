use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("expression exceeds the 256-node limit")]
    TooLarge,

    #[error("unexpected end of expression")]
    UnexpectedEof,
}

pub type Result<T> = std::result::Result<T, AlertError>;
