use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolgraphError>;

/// Fatal errors. Unresolved calls and missing definitions are not errors: they
/// end up in the graph as labelled nodes.
#[derive(Error, Debug)]
pub enum SolgraphError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} at line {line}, column {column}: {message}")]
    ParseFailure {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("couldn't find contract {0}")]
    ContractNotFound(String),

    #[error("couldn't find function {key}")]
    EntryNotFound { key: String },

    #[error("entry {key} is ambiguous, add a parameter count to pick one of: {}", .candidates.join(", "))]
    EntryAmbiguous {
        key: String,
        candidates: Vec<String>,
    },

    #[error("bad ignore rule `{rule}`: {reason}")]
    InvalidIgnoreRule { rule: String, reason: String },

    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },

    #[error("cannot load the Solidity grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("cannot serialize graph: {0}")]
    Json(#[from] serde_json::Error),
}
