use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by grainclouds.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    ParameterError(String),
    SampleError(String),
    ClusterNotFoundError(usize),
    SendError(String),
    OutputError(Box<dyn error::Error + Send + Sync>),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::SampleError(str) => write!(f, "Invalid sample: {str}"),
            Self::ClusterNotFoundError(cluster_id) => {
                write!(f, "Cluster with id {cluster_id} not found")
            }
            Self::SendError(str) => write!(f, "Failed to send control message: {str}"),
            Self::OutputError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

#[cfg(feature = "wav-output")]
impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Error {
        match err {
            hound::Error::IoError(err) => Error::IoError(err),
            err => Error::OutputError(Box::new(err)),
        }
    }
}
