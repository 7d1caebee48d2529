use thiserror::Error;

/// Errors surfaced by the I/O-facing side of the crate. The extraction core
/// itself does not produce errors: a missing path between the endpoints is a
/// successful empty result, and extracting into a non-empty output graph is a
/// programming error that panics.
#[derive(Debug, Error)]
pub enum GraphsliceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse GFA: {0}")]
    GfaParse(String),

    #[error("invalid position '{0}', expected <id>[+-]:<offset>")]
    PosParse(String),
}
