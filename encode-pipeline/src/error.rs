use super::source::PixelLayout;
use snafu::Snafu;
use std::io;

/// The error type reported by `EncoderBackend` implementations.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfiguration { reason: String },
    #[snafu(display("error {operation}"))]
    Backend { operation: &'static str, source: BackendError },
    #[snafu(display("{resource} exhausted"))]
    ResourceExhausted { resource: &'static str },
    #[snafu(display("unable to write header"))]
    HeaderWrite { source: io::Error },
    #[snafu(display("unsupported pixel layout {layout:?}"))]
    UnsupportedPixelLayout { layout: PixelLayout },
    #[snafu(display("io error"), context(false))]
    Io { source: io::Error },
    #[snafu(display("post-processing aborted"))]
    PostProcessingAborted,
}

pub type Result<T> = core::result::Result<T, PipelineError>;

/// Header builders only fail when the bitstream buffer can't grow or when a field can't be
/// represented.
pub(crate) fn header_error(err: io::Error) -> PipelineError {
    match err.kind() {
        io::ErrorKind::OutOfMemory => PipelineError::ResourceExhausted { resource: "bitstream buffer" },
        _ => PipelineError::HeaderWrite { source: err },
    }
}

pub(crate) fn backend_error(operation: &'static str) -> impl FnOnce(BackendError) -> PipelineError {
    move |source| PipelineError::Backend { operation, source }
}

pub(crate) fn invalid_configuration<T>(reason: impl Into<String>) -> Result<T> {
    Err(PipelineError::InvalidConfiguration { reason: reason.into() })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_error() {
        assert!(matches!(
            header_error(io::Error::new(io::ErrorKind::OutOfMemory, "oom")),
            PipelineError::ResourceExhausted { .. }
        ));
        assert!(matches!(
            header_error(io::Error::new(io::ErrorKind::InvalidInput, "too large")),
            PipelineError::HeaderWrite { .. }
        ));
    }

    #[test]
    fn test_display() {
        let err = backend_error("syncing surface")("device lost".into());
        assert_eq!(err.to_string(), "error syncing surface");
        assert_eq!(std::error::Error::source(&err).map(|e| e.to_string()), Some("device lost".to_string()));
    }
}
