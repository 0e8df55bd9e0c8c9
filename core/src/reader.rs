use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};

use crate::codec::{read_postings, CodecError, Encoding};
use crate::error::{Result, SearchError};
use crate::persist::{load_doc_weights, load_docs, load_meta, load_vocabulary, IndexPaths, MetaFile};
use crate::{DocId, PostingsList};

/// Read side of a written collection.
///
/// Holds no postings: every [`get_postings`](Self::get_postings) call opens
/// the postings file, seeks to the term's offset and decodes one record.
/// The term -> offset map is copied out of the vocabulary store at open time
/// and the store is closed again, so readers never contend for its lock.
pub struct DiskPositionalIndex {
    paths: IndexPaths,
    vocabulary: HashMap<String, u64>,
    meta: MetaFile,
    doc_names: Vec<String>,
    doc_weights: Vec<f64>,
}

impl DiskPositionalIndex {
    /// Open a directory produced by [`crate::DiskIndexWriter`]. Fails with
    /// [`SearchError::IndexNotReady`] if the build never completed.
    pub fn open(paths: IndexPaths) -> Result<Self> {
        let meta = load_meta(&paths)?
            .ok_or_else(|| SearchError::IndexNotReady(paths.root.display().to_string()))?;
        let vocabulary = load_vocabulary(&paths)?;
        let doc_names = load_docs(&paths)?;
        let doc_weights = load_doc_weights(&paths)?;
        tracing::info!(
            root = %paths.root.display(),
            num_docs = meta.num_docs,
            num_terms = meta.num_terms,
            encoding = ?meta.encoding,
            "opened index"
        );
        Ok(Self { paths, vocabulary, meta, doc_names, doc_weights })
    }

    /// Postings for an already normalized term. A term missing from the
    /// vocabulary yields an empty list.
    pub fn get_postings(&self, term: &str) -> Result<PostingsList> {
        let Some(&offset) = self.vocabulary.get(term) else {
            tracing::debug!(term, "term not in vocabulary");
            return Ok(Vec::new());
        };

        let mut file = File::open(self.paths.postings())?;
        let len = file.metadata()?.len();
        if offset >= len {
            return Err(SearchError::StoreInconsistency { term: term.to_string(), offset, len });
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(file);
        let postings = read_postings(&mut reader, self.meta.encoding, len - offset).map_err(
            |source: CodecError| SearchError::Corruption { term: term.to_string(), offset, source },
        )?;
        tracing::debug!(term, offset, doc_freq = postings.len(), "read postings");
        Ok(postings)
    }

    pub fn encoding(&self) -> Encoding { self.meta.encoding }

    pub fn meta(&self) -> &MetaFile { &self.meta }

    pub fn num_docs(&self) -> usize { self.doc_names.len() }

    pub fn vocabulary_len(&self) -> usize { self.vocabulary.len() }

    pub fn doc_name(&self, doc_id: DocId) -> Option<&str> {
        self.doc_names.get(doc_id as usize).map(String::as_str)
    }

    /// Length weight `sqrt(token count)` stored for `doc_id`.
    pub fn doc_weight(&self, doc_id: DocId) -> Option<f64> {
        self.doc_weights.get(doc_id as usize).copied()
    }
}
