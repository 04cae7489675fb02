//! Per-file content errors

use std::path::PathBuf;
use thiserror::Error;

/// Failure to split or decode a front-matter block
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("front-matter block is never closed")]
    Unclosed,

    #[error("invalid YAML front-matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure to load a single content file.
///
/// The loader logs these and skips the file; they never abort a run.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}
