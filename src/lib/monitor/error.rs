use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("OS query failed: {0}")]
    Query(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TrashError {
    #[error("Failed listing trash directory: {0}")]
    Listing(#[source] std::io::Error),

    #[error("Failed removing {path:?} after {removed} entries were removed: {source}")]
    Removal {
        path: PathBuf,
        removed: usize,
        #[source]
        source: std::io::Error,
    },
}
