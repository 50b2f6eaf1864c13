//! Core error types for PServ

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Compression error: {0}")]
    Compression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
