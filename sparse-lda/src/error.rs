use thiserror::Error;

/// Errors raised while building or fitting a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LdaError {
    #[error(
        "document {doc} holds a weighted feature vector; topic models expect a flat token sequence"
    )]
    InputShape { doc: usize },

    #[error("document {doc} has token id {token} outside a vocabulary of size {vocab_size}")]
    TokenOutOfRange {
        doc: usize,
        token: usize,
        vocab_size: usize,
    },

    #[error("empty corpus")]
    EmptyCorpus,

    #[error("reference group `{0}` does not appear in the corpus")]
    UnknownReference(String),

    #[error("group `{0}` is not indexed by this model")]
    UnknownGroup(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}
