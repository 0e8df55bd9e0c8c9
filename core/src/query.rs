//! Boolean/phrase query parsing and evaluation.
//!
//! A query is a sequence of phrases separated by `AND`, `OR` or `AND NOT`
//! (upper case). It evaluates as a left fold: `a AND b OR c` is
//! `(a AND b) OR c`. Text inside double quotes is always phrase text, so
//! `"rock AND roll"` is a three-word phrase rather than two operands.

use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::merge::{merge_postings, positional_intersect, BooleanOperator};
use crate::reader::DiskPositionalIndex;
use crate::tokenizer::tokenize;
use crate::{Posting, PostingsList};

/// One operand: the raw words of a phrase, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub words: Vec<String>,
}

impl Phrase {
    pub fn text(&self) -> String { self.words.join(" ") }
}

/// `operators[i]` combines the running result with `phrases[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub phrases: Vec<Phrase>,
    pub operators: Vec<BooleanOperator>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub documents: PostingsList,
    pub match_count: usize,
}

enum Token {
    Word(String),
    Quoted(String),
}

fn lex(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut quoted = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => quoted.push(ch),
                    None => {
                        return Err(SearchError::MalformedQuery("unterminated quote".into()));
                    }
                }
            }
            tokens.extend(quoted.split_whitespace().map(|w| Token::Quoted(w.to_string())));
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '"' {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }
    Ok(tokens)
}

/// Split `text` into phrases and the operators between them.
pub fn parse_query(text: &str) -> Result<ParsedQuery> {
    let tokens = lex(text)?;
    let mut phrases = Vec::new();
    let mut operators = Vec::new();
    let mut current: Vec<String> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let op = match &tokens[i] {
            Token::Word(w) if w == "AND" => {
                if matches!(tokens.get(i + 1), Some(Token::Word(n)) if n == "NOT") {
                    i += 1;
                    Some(BooleanOperator::AndNot)
                } else {
                    Some(BooleanOperator::And)
                }
            }
            Token::Word(w) if w == "OR" => Some(BooleanOperator::Or),
            Token::Word(w) if w == "NOT" => {
                return Err(SearchError::MalformedQuery("NOT is only valid as AND NOT".into()));
            }
            Token::Word(w) | Token::Quoted(w) => {
                current.push(w.clone());
                None
            }
        };
        if let Some(op) = op {
            if current.is_empty() {
                return Err(SearchError::MalformedQuery(format!("{op} has no left operand")));
            }
            phrases.push(Phrase { words: std::mem::take(&mut current) });
            operators.push(op);
        }
        i += 1;
    }

    if current.is_empty() {
        return Err(match operators.last() {
            Some(op) => SearchError::MalformedQuery(format!("{op} has no right operand")),
            None => SearchError::MalformedQuery("query is empty".into()),
        });
    }
    phrases.push(Phrase { words: current });
    Ok(ParsedQuery { phrases, operators })
}

/// Evaluates parsed queries against one collection.
pub struct BooleanQueryParser<'a> {
    index: &'a DiskPositionalIndex,
}

impl<'a> BooleanQueryParser<'a> {
    pub fn new(index: &'a DiskPositionalIndex) -> Self {
        Self { index }
    }

    pub fn parse_query(&self, text: &str) -> Result<ParsedQuery> {
        parse_query(text)
    }

    /// Fold every phrase into the running result, left to right.
    pub fn get_postings(&self, query: &ParsedQuery) -> Result<PostingsList> {
        let mut phrases = query.phrases.iter();
        let Some(first) = phrases.next() else {
            return Ok(Vec::new());
        };
        let mut postings = self.phrase_postings(first)?;
        for (phrase, &op) in phrases.zip(&query.operators) {
            let next = self.phrase_postings(phrase)?;
            postings = merge_postings(&postings, &next, op);
        }
        Ok(postings)
    }

    /// Parse and evaluate `text`. An empty result is not an error.
    pub fn search(&self, text: &str) -> Result<SearchResult> {
        let query = self.parse_query(text)?;
        let documents = self.get_postings(&query)?;
        tracing::debug!(query = text, phrases = query.phrases.len(), matches = documents.len(), "evaluated query");
        Ok(SearchResult { match_count: documents.len(), documents })
    }

    /// A phrase is normalized with the indexing tokenizer. A single term is
    /// a plain lookup; longer phrases chain adjacency checks, where the
    /// required distance is how far apart the two words sit in the phrase
    /// (more than 1 only when a stopword was dropped between them).
    fn phrase_postings(&self, phrase: &Phrase) -> Result<Vec<Posting>> {
        let terms = tokenize(&phrase.text());
        let mut terms = terms.into_iter();
        let Some((first, mut last_pos)) = terms.next() else {
            return Ok(Vec::new());
        };
        let mut postings = self.index.get_postings(&first)?;
        for (term, pos) in terms {
            if postings.is_empty() {
                break;
            }
            let next = self.index.get_postings(&term)?;
            postings = positional_intersect(&postings, &next, pos - last_pos);
            last_pos = pos;
        }
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(q: &ParsedQuery) -> Vec<Vec<&str>> {
        q.phrases.iter().map(|p| p.words.iter().map(String::as_str).collect()).collect()
    }

    #[test]
    fn splits_on_operators() {
        let q = parse_query("cat AND dog OR fish").unwrap();
        assert_eq!(words(&q), vec![vec!["cat"], vec!["dog"], vec!["fish"]]);
        assert_eq!(q.operators, vec![BooleanOperator::And, BooleanOperator::Or]);
    }

    #[test]
    fn and_not_is_one_operator() {
        let q = parse_query("new york AND NOT city").unwrap();
        assert_eq!(words(&q), vec![vec!["new", "york"], vec!["city"]]);
        assert_eq!(q.operators, vec![BooleanOperator::AndNot]);
    }

    #[test]
    fn quoted_keywords_are_words() {
        let q = parse_query("\"rock AND roll\" OR jazz").unwrap();
        assert_eq!(words(&q), vec![vec!["rock", "AND", "roll"], vec!["jazz"]]);
        assert_eq!(q.operators.len(), 1);

        let q = parse_query("\"dark matter\"").unwrap();
        assert_eq!(words(&q), vec![vec!["dark", "matter"]]);
        assert!(q.operators.is_empty());
    }

    #[test]
    fn lowercase_keywords_are_words() {
        let q = parse_query("salt and pepper").unwrap();
        assert_eq!(q.phrases.len(), 1);
    }

    #[test]
    fn malformed_queries() {
        for text in ["", "   ", "AND cat", "cat OR", "cat AND OR dog", "NOT cat", "\"open"] {
            let err = parse_query(text).unwrap_err();
            assert!(err.is_client_error(), "{text:?}: {err}");
        }
    }
}
