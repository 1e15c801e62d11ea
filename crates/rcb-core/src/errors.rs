/// Core error type for the bridge.
///
/// Adapter crates map their specific errors into this type so the pipeline can
/// decide consistently what is fatal (config) and what is skipped (fetch/decode).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("printer error: {0}")]
    Printer(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
