//! Positional inverted index with a compact on-disk postings store and a
//! boolean/phrase query evaluator.

pub mod codec;
pub mod error;
pub mod index;
pub mod kgram;
pub mod merge;
pub mod persist;
pub mod query;
pub mod reader;
pub mod tokenizer;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use codec::Encoding;
pub use error::{Result, SearchError};
pub use index::{DocumentTokens, PositionalInvertedIndex};
pub use kgram::KGramIndex;
pub use merge::{merge_postings, phrase_intersect, positional_intersect, BooleanOperator};
pub use query::{BooleanQueryParser, ParsedQuery, SearchResult};
pub use reader::DiskPositionalIndex;
pub use tokenizer::Language;
pub use writer::DiskIndexWriter;

pub type DocId = u32;
pub type Position = u32;

/// Occurrences of one term in one document. Positions are zero-based token
/// offsets in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<Position>,
}

impl Posting {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, positions: Vec::new() }
    }
}

/// Postings for one term, ordered by ascending document id.
pub type PostingsList = Vec<Posting>;
