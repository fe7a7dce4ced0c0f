use thiserror::Error;

/// All errors produced by vox-core.
#[derive(Debug, Error)]
pub enum VoxError {
    #[error("no clips given")]
    EmptyInput,

    #[error("missing clip: {name}")]
    MissingClip { name: String },

    #[error("WAV format error: {0}")]
    Format(String),

    #[error("unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown phrase: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sounds directory is not configured or empty")]
    NotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VoxError {
    /// HTTP-style status a host should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            VoxError::NotFound(_) | VoxError::MissingClip { .. } => 404,
            VoxError::NotConfigured => 503,
            VoxError::InvalidConfig(_) => 400,
            _ => 500,
        }
    }

    /// Caller-facing message. Build failures stay generic; the detail is logged.
    pub fn public_message(&self) -> String {
        match self {
            VoxError::NotFound(_) => "Unknown phrase".into(),
            VoxError::MissingClip { name } => format!("Missing clip: {name}"),
            VoxError::NotConfigured => "Integration not configured".into(),
            VoxError::InvalidConfig(msg) => format!("Invalid configuration: {msg}"),
            _ => "Failed to build audio".into(),
        }
    }
}

impl From<hound::Error> for VoxError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => VoxError::Io(e),
            hound::Error::Unsupported => {
                VoxError::UnsupportedFormat("container feature not supported".into())
            }
            other => VoxError::Format(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_mapping_hides_build_detail() {
        let err = VoxError::Format("bad RIFF tag".into());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Failed to build audio");

        let err = VoxError::MissingClip {
            name: "doop".into(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.public_message(), "Missing clip: doop");

        assert_eq!(VoxError::NotFound("x".into()).public_message(), "Unknown phrase");
        assert_eq!(VoxError::NotConfigured.status_code(), 503);
    }

    #[test]
    fn hound_io_error_maps_to_io() {
        let err: VoxError =
            hound::Error::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk")).into();
        assert!(matches!(err, VoxError::Io(_)));

        let err: VoxError = hound::Error::FormatError("no RIFF tag found").into();
        assert!(matches!(err, VoxError::Format(_)));
    }
}
