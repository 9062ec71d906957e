use thiserror::Error;

/// Errors surfaced by the renderers.
///
/// Field-level problems such as an unparsable timestamp never show up here;
/// they degrade to a default rendering and the record still completes.
#[derive(Debug, Error)]
pub enum Error {
    /// The serialized event could not be decoded. Nothing was written.
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    /// The decoded event is not a key-value structure. Nothing was written.
    #[error("event is not a key-value object")]
    NotAnObject,

    /// Writing the rendered record to the sink failed.
    #[error("failed to write to sink: {0}")]
    Io(#[from] std::io::Error),

    /// The sink was lost before the printer could be built.
    #[error("no sink available for the printer")]
    SinkUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
