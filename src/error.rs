use thiserror::Error;

/// Main error type for the library.
/// Errors of this type abort the conversion of a whole recording. Per-frame problems
/// are reported with [`SkipReason`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Parser error: {0}")]
    Parser(String),
    /// Binary or text data that doesn't have the expected layout.
    #[error("Format error: {0}")]
    Format(String),
    /// Missing or malformed inputs required before any frame can be processed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    pub fn configuration<T: ToString>(msg: T) -> Self {
        Error::Configuration(msg.to_string())
    }

    pub fn format<T: ToString>(msg: T) -> Self {
        Error::Format(msg.to_string())
    }

    pub fn parser<T: ToString>(msg: T) -> Self {
        Error::Parser(msg.to_string())
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::Parser(err.to_string())
    }
}

impl From<glob::GlobError> for Error {
    fn from(err: glob::GlobError) -> Self {
        Error::Io(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single depth frame was left out of the outputs. The batch always continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No rig-to-world pose with the frame's timestamp.
    NoPose,
    /// A transform on the frame's path couldn't be inverted.
    SingularTransform,
    /// The color stream has no frame to pair with.
    NoColorFrame,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SkipReason::NoPose => write!(f, "transform not found"),
            SkipReason::SingularTransform => write!(f, "singular transform"),
            SkipReason::NoColorFrame => write!(f, "no color frame"),
        }
    }
}
