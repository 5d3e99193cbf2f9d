#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure. Fatal to the current connection; the session
    /// transitions to [Disconnected](crate::session::LinkState::Disconnected).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid registry: {0}")]
    Registry(String),

    /// The session has no active configuration, either because
    /// [configure](crate::session::Session::configure) was never called or
    /// because the link disconnected.
    #[error("link is not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, Error>;
