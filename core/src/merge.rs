//! Pairwise combination of postings lists.
//!
//! Queries fold these operators strictly left to right; there is no
//! precedence between them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::{DocId, Position, Posting, PostingsList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOperator {
    And,
    Or,
    AndNot,
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BooleanOperator::And => "AND",
            BooleanOperator::Or => "OR",
            BooleanOperator::AndNot => "AND NOT",
        })
    }
}

impl FromStr for BooleanOperator {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        match words.as_slice() {
            ["AND"] => Ok(BooleanOperator::And),
            ["OR"] => Ok(BooleanOperator::Or),
            ["AND", "NOT"] => Ok(BooleanOperator::AndNot),
            _ => Err(SearchError::MalformedQuery(format!("unknown operator {s:?}"))),
        }
    }
}

fn doc_ids(postings: &[Posting]) -> HashSet<DocId> {
    postings.iter().map(|p| p.doc_id).collect()
}

/// Positions per document, concatenated when a list repeats a document
/// (phrase results can).
fn positions_by_doc(postings: &[Posting]) -> HashMap<DocId, Vec<Position>> {
    let mut map: HashMap<DocId, Vec<Position>> = HashMap::new();
    for p in postings {
        map.entry(p.doc_id).or_default().extend_from_slice(&p.positions);
    }
    map
}

/// Combine two postings lists under `op`.
///
/// - `And`: documents in both; the right operand's postings are reported.
/// - `Or`: documents in either; where both have a document the right
///   operand's positions win, they are not unioned.
/// - `AndNot`: left documents absent from the right, unchanged.
pub fn merge_postings(left: &[Posting], right: &[Posting], op: BooleanOperator) -> PostingsList {
    match op {
        BooleanOperator::And => {
            let ids = doc_ids(left);
            right.iter().filter(|p| ids.contains(&p.doc_id)).cloned().collect()
        }
        BooleanOperator::AndNot => {
            let ids = doc_ids(right);
            left.iter().filter(|p| !ids.contains(&p.doc_id)).cloned().collect()
        }
        BooleanOperator::Or => {
            let mut merged = positions_by_doc(left);
            merged.extend(positions_by_doc(right));
            let mut out: PostingsList = merged
                .into_iter()
                .map(|(doc_id, positions)| Posting { doc_id, positions })
                .collect();
            out.sort_by_key(|p| p.doc_id);
            out
        }
    }
}

/// Strict adjacency: for each position `p` of the first list, emit
/// `(doc, [p + 1])` when the second list has `p + 1` in the same document.
pub fn phrase_intersect(postings1: &[Posting], postings2: &[Posting]) -> PostingsList {
    positional_intersect(postings1, postings2, 1)
}

/// Like [`phrase_intersect`] with the second term exactly `distance`
/// positions after the first. One result posting is emitted per match, so a
/// document can appear more than once.
pub fn positional_intersect(postings1: &[Posting], postings2: &[Posting], distance: Position) -> PostingsList {
    let second = positions_by_doc(postings2);
    let mut results = Vec::new();
    for posting in postings1 {
        let Some(candidates) = second.get(&posting.doc_id) else { continue };
        for &pos in &posting.positions {
            let Some(target) = pos.checked_add(distance) else { continue };
            if candidates.contains(&target) {
                results.push(Posting { doc_id: posting.doc_id, positions: vec![target] });
            }
        }
    }
    results
}
