use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("insufficient training data for class {class}: {found} usable faces, need at least {required}")]
    InsufficientData {
        class: String,
        found: usize,
        required: usize,
    },

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dimension(msg: impl Into<String>) -> Self {
        Error::Dimension(msg.into())
    }
}
