use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The vendor library is missing or does not export the required symbols.
    #[error("failed to load vendor CAN library: {0}")]
    LibraryLoad(String),

    /// The vendor initializer refused the channel.
    #[error("failed to open CAN channel: {0}")]
    ChannelOpen(String),

    /// The interface is closed or the vendor write call failed.
    #[error("CAN write rejected: {0}")]
    WriteRejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
