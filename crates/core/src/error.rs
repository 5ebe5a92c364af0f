use thiserror::Error;

/// Error type returned by the collaborator traits (locator, classifier, frame source).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Whether a failure is the caller's fault or ours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Internal,
}

#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("face detection failed: {0}")]
    Detection(#[source] BoxError),
    #[error("emotion classification failed: {0}")]
    Classification(#[source] BoxError),
    #[error("classifier returned {actual} scores, expected {expected}")]
    MalformedOutput { expected: usize, actual: usize },
    #[error("failed to encode frame: {0}")]
    Encode(#[source] image::ImageError),
}

impl EmotionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmotionError::InvalidInput(_) => ErrorKind::Input,
            EmotionError::Decode(_)
            | EmotionError::Detection(_)
            | EmotionError::Classification(_)
            | EmotionError::MalformedOutput { .. }
            | EmotionError::Encode(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to read frame: {0}")]
    Read(#[source] BoxError),
    #[error("capture device is not open")]
    NotOpen,
    #[error("camera session lock poisoned")]
    Poisoned,
}
