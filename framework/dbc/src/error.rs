use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The bus description file could not be opened or read.
    #[error("cannot read bus description {path}: {source}")]
    ParseIo { path: String, source: io::Error },

    /// The caller supplied a payload shorter than the signal demands.
    #[error("payload of {got} bytes is too short for a signal spanning {needed} bytes")]
    ShortPayload { needed: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
