use crate::annotation::AnnotationId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported file type `{0}`, expected a PDF document")]
    UnsupportedFile(String),
    #[error("signature capture is empty")]
    EmptyCapture,
    #[error("text annotation has no content")]
    EmptyText,
    #[error("no document loaded")]
    NoDocument,
    #[error("unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("signature image has been released by the capture surface")]
    ImageReleased,
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("PNG decode error: {0}")]
    PngDecode(#[from] png::DecodingError),
    #[error("image header error: {0}")]
    ImageSize(#[from] imagesize::ImageError),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Task(String),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Message suitable for showing to the person using the editor.
    pub fn user_message(&self) -> String {
        match self {
            Error::UnsupportedFile(_) => "Please upload a valid PDF file.".to_owned(),
            Error::EmptyCapture => "Please draw a signature first.".to_owned(),
            Error::EmptyText => "Please type some text first.".to_owned(),
            Error::NoDocument => "Please open a PDF file first.".to_owned(),
            _ => "There was an error saving the PDF. Please try again.".to_owned(),
        }
    }

    /// Whether the error only rejected input and left all state untouched.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFile(_) | Error::EmptyCapture | Error::EmptyText | Error::NoDocument
        )
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}
