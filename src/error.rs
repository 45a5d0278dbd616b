use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the decoder, the dispatcher and the handlers.
///
/// `UnknownType` is recovered locally only while decoding nested fields.
/// `RedundancyLimitExceeded`, `IriTooLong` and `InvalidOrigin` always reject
/// the inbound item.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown activity type {0:?}")]
    UnknownType(String),

    #[error("redundancy limit exceeded at nesting level {0}")]
    RedundancyLimitExceeded(usize),

    #[error("{prop} IRI is {len} bytes long")]
    IriTooLong { prop: &'static str, len: usize },

    #[error("origin {origin:?} cannot vouch for {id}")]
    InvalidOrigin { id: String, origin: Option<String> },

    #[error("actor {0} cannot be resolved")]
    ActorNotResolvable(String),

    #[error("item {0} not found")]
    ItemNotFound(String),

    #[error("unable to hand activity over for delivery")]
    Delivery(#[source] anyhow::Error),

    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
}

impl Error {
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Error::UnknownType(_))
    }

    pub(crate) fn storage(error: impl Into<anyhow::Error>) -> Error {
        Error::Storage(error.into())
    }
}
