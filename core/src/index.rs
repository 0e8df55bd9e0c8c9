use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SearchError};
use crate::tokenizer::{detect_language, stem_terms, tokenize, Language};
use crate::{DocId, Position, Posting, PostingsList};

/// Tokenized form of one document, as delivered by the extraction and
/// tokenization stage.
///
/// `token_data` drives document-level term presence and the length weight;
/// `index_and_token` drives positions. Documents whose tokenizer produces no
/// positions get position-less postings, so phrase queries never match them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentTokens {
    pub file_name: String,
    pub token_data: Vec<String>,
    pub index_and_token: Vec<(String, Position)>,
}

impl DocumentTokens {
    /// Tokenize `body` with the English pipeline from [`crate::tokenizer`].
    pub fn from_text(file_name: impl Into<String>, body: &str) -> Self {
        let index_and_token = tokenize(body);
        let token_data = index_and_token.iter().map(|(t, _)| t.clone()).collect();
        Self { file_name: file_name.into(), token_data, index_and_token }
    }

    /// Tokenize `body` for a document known to be in `language`. Only English
    /// gets positions; Spanish and French fill `token_data` alone, and any
    /// other language produces no terms at all.
    pub fn for_language(file_name: impl Into<String>, body: &str, language: Language) -> Self {
        match language {
            Language::English => Self::from_text(file_name, body),
            _ => Self {
                file_name: file_name.into(),
                token_data: stem_terms(body, language),
                index_and_token: Vec::new(),
            },
        }
    }

    /// [`for_language`](Self::for_language) with the language detected from
    /// `body`.
    pub fn from_detected_text(file_name: impl Into<String>, body: &str) -> Self {
        let language = detect_language(body);
        if language != Language::English {
            tracing::debug!(?language, "non-English document, indexing without positions");
        }
        Self::for_language(file_name, body, language)
    }
}

/// Term -> postings accumulated during one build pass.
///
/// Append-only: documents must be added in non-decreasing id order, which is
/// what keeps every postings list sorted for gap encoding.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PositionalInvertedIndex {
    postings: HashMap<String, PostingsList>,
    doc_names: Vec<String>,
    doc_weights: Vec<f64>,
}

impl PositionalInvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Record that `term` occurs in `doc_id`, without position detail.
    pub fn add_term(&mut self, term: &str, doc_id: DocId) -> Result<()> {
        self.posting_mut(term, doc_id)?;
        Ok(())
    }

    /// Record an occurrence of `term` at `position` within `doc_id`.
    ///
    /// Repeating an already recorded position is a no-op.
    pub fn add_term_occurrence(&mut self, term: &str, position: Position, doc_id: DocId) -> Result<()> {
        let posting = self.posting_mut(term, doc_id)?;
        match posting.positions.last() {
            Some(&last) if last == position => {}
            Some(&last) if last > position => {
                return Err(SearchError::PositionOutOfOrder {
                    term: term.to_string(),
                    doc_id,
                    position,
                    last,
                });
            }
            _ => posting.positions.push(position),
        }
        Ok(())
    }

    fn posting_mut(&mut self, term: &str, doc_id: DocId) -> Result<&mut Posting> {
        let list = self.postings.entry(term.to_string()).or_default();
        match list.last() {
            Some(p) if p.doc_id > doc_id => {
                return Err(SearchError::OutOfOrder { doc_id, last: p.doc_id });
            }
            Some(p) if p.doc_id == doc_id => {}
            _ => list.push(Posting::new(doc_id)),
        }
        let last = list.len() - 1;
        Ok(&mut list[last])
    }

    /// Ingest a whole document under the next sequential id.
    pub fn add_document(&mut self, doc: &DocumentTokens) -> Result<DocId> {
        let doc_id = self.doc_names.len() as DocId;
        for term in &doc.token_data {
            self.add_term(term, doc_id)?;
        }
        for (term, position) in &doc.index_and_token {
            self.add_term_occurrence(term, *position, doc_id)?;
        }
        self.doc_names.push(doc.file_name.clone());
        self.doc_weights.push((doc.token_data.len() as f64).sqrt());
        tracing::debug!(doc_id, name = %doc.file_name, tokens = doc.token_data.len(), "added document");
        Ok(doc_id)
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All terms with their postings, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn vocabulary_len(&self) -> usize { self.postings.len() }

    pub fn num_docs(&self) -> usize { self.doc_names.len() }

    pub fn doc_names(&self) -> &[String] { &self.doc_names }

    /// `sqrt(token count)` per document, in id order.
    pub fn doc_weights(&self) -> &[f64] { &self.doc_weights }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_terms_share_one_posting() {
        let mut index = PositionalInvertedIndex::new();
        index.add_term_occurrence("cat", 1, 0).unwrap();
        index.add_term_occurrence("cat", 4, 0).unwrap();
        index.add_term("cat", 0).unwrap();
        index.add_term_occurrence("cat", 2, 3).unwrap();
        assert_eq!(
            index.postings("cat"),
            &[
                Posting { doc_id: 0, positions: vec![1, 4] },
                Posting { doc_id: 3, positions: vec![2] },
            ]
        );
        assert!(index.postings("dog").is_empty());
    }

    #[test]
    fn rejects_descending_doc_ids() {
        let mut index = PositionalInvertedIndex::new();
        index.add_term("cat", 5).unwrap();
        let err = index.add_term("cat", 2).unwrap_err();
        assert!(matches!(err, SearchError::OutOfOrder { doc_id: 2, last: 5 }));
        // other terms are independent
        index.add_term("dog", 2).unwrap();
    }

    #[test]
    fn rejects_descending_positions_and_ignores_repeats() {
        let mut index = PositionalInvertedIndex::new();
        index.add_term_occurrence("cat", 7, 0).unwrap();
        index.add_term_occurrence("cat", 7, 0).unwrap();
        assert_eq!(index.postings("cat")[0].positions, vec![7]);
        assert!(index.add_term_occurrence("cat", 3, 0).is_err());
    }

    #[test]
    fn add_document_assigns_ids_and_weights() {
        let mut index = PositionalInvertedIndex::new();
        let a = index.add_document(&DocumentTokens::from_text("a", "cats chase dogs")).unwrap();
        let b = index.add_document(&DocumentTokens::from_text("b", "the dog")).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(index.doc_names(), &["a".to_string(), "b".to_string()]);
        assert!((index.doc_weights()[0] - 3f64.sqrt()).abs() < 1e-9);
        assert!((index.doc_weights()[1] - 1.0).abs() < 1e-9);
        let dog = index.postings("dog");
        assert_eq!(dog.len(), 2);
        assert_eq!(dog[1], Posting { doc_id: 1, positions: vec![1] });
    }

    #[test]
    fn documents_without_positions_are_boolean_only() {
        let mut index = PositionalInvertedIndex::new();
        let doc = DocumentTokens {
            file_name: "gato".into(),
            token_data: vec!["gato".into(), "negro".into()],
            index_and_token: vec![],
        };
        index.add_document(&doc).unwrap();
        assert_eq!(index.postings("gato"), &[Posting::new(0)]);
    }

    #[test]
    fn only_english_documents_carry_positions() {
        let es = DocumentTokens::for_language("es", "El sol feliz", Language::Spanish);
        assert_eq!(es.token_data, vec!["sol".to_string(), "feliz".to_string()]);
        assert!(es.index_and_token.is_empty());

        let other = DocumentTokens::for_language("de", "Die Sonne", Language::Other);
        assert!(other.token_data.is_empty() && other.index_and_token.is_empty());

        let en = DocumentTokens::for_language("en", "sol feliz", Language::English);
        assert_eq!(en.index_and_token, vec![("sol".to_string(), 0), ("feliz".to_string(), 1)]);
    }
}
