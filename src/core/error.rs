use std::fmt::{Debug, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure, timeout or non-success response from the history
    /// source.
    Fetch,
    /// The history payload could not be decoded.
    Decode,
    /// Local storage could not be read or written.
    Persist,
    Registration,
    NotFound,
    /// A lookup matched more than one record.
    Ambiguous,
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch error",
            ErrorKind::Decode => "decode error",
            ErrorKind::Persist => "persist error",
            ErrorKind::Registration => "registration error",
            ErrorKind::NotFound => "not found",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::Config => "config error",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct Error {
    pub message: String,
    pub kind: ErrorKind,
    pub cause: Option<Box<dyn Debug + Send + Sync>>,
}

impl Error {
    pub fn new(message: String, kind: ErrorKind) -> Self {
        Error {
            message,
            kind,
            cause: None,
        }
    }

    pub fn wrap<T>(message: String, kind: ErrorKind, cause: T) -> Self
    where
        T: Debug + Send + Sync + 'static,
    {
        Error {
            message,
            kind,
            cause: Some(Box::new(cause)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(cause) = &self.cause {
            write!(f, "{}: {}: {:?}", self.kind, self.message, cause)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
