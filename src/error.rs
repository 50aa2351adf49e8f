use std::fmt;

use crate::submission::SubmissionState;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A batch larger than the staging cap; the whole batch is rejected.
    TooManyFiles { attempted: usize, max: usize },
    UnsupportedFile(String),
    DuplicateName(String),
    IndexOutOfRange { index: usize, len: usize },
    /// Submit was requested while the post control is disabled.
    ControlDisabled,
    IllegalTransition {
        from: &'static str,
        event: &'static str,
    },
    MalformedStatus(String),
}

impl Error {
    pub fn illegal_transition(from: &SubmissionState, event: &'static str) -> Self {
        Error::IllegalTransition {
            from: from.name(),
            event,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::TooManyFiles { attempted, max } => {
                write!(f, "Too many files: {} given, at most {} allowed", attempted, max)
            }
            Error::UnsupportedFile(name) => {
                write!(f, "Unsupported file: {} (expected a JPEG or PNG image)", name)
            }
            Error::DuplicateName(name) => write!(f, "Duplicate file name in batch: {}", name),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for {} staged photos", index, len)
            }
            Error::ControlDisabled => write!(f, "Post is not ready to submit"),
            Error::IllegalTransition { from, event } => {
                write!(f, "Illegal transition: {} while {}", event, from)
            }
            Error::MalformedStatus(msg) => write!(f, "Malformed upload status: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
