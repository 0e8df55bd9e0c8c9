use thiserror::Error;

use crate::codec::CodecError;
use crate::DocId;

/// Errors raised while building, persisting or querying an index.
///
/// An unknown term is not represented here: lookups for terms missing from
/// the vocabulary return an empty postings list.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("corrupt postings record for term {term:?} at offset {offset}: {source}")]
    Corruption {
        term: String,
        offset: u64,
        #[source]
        source: CodecError,
    },

    #[error("vocabulary offset {offset} for term {term:?} lies outside the postings file ({len} bytes)")]
    StoreInconsistency { term: String, offset: u64, len: u64 },

    #[error("document {doc_id} added after document {last}; ids must be non-decreasing")]
    OutOfOrder { doc_id: DocId, last: DocId },

    #[error("position {position} for term {term:?} in document {doc_id} is not after {last}")]
    PositionOutOfOrder {
        term: String,
        doc_id: DocId,
        position: u32,
        last: u32,
    },

    #[error("index at {0} is not ready: no completed build found")]
    IndexNotReady(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vocabulary store error: {0}")]
    Vocabulary(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// True when the on-disk data can no longer be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SearchError::Corruption { .. } | SearchError::StoreInconsistency { .. }
        )
    }

    /// True when the caller supplied bad input and should not retry as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::MalformedQuery(_))
    }
}
