/// Ranked full-text search.
///
/// The query layer only sees the [`Ranker`] trait: give it a corpus, a parsed
/// query and a cap, get back row ids with relevance scores. The SQLite FTS5
/// implementation lives in [`fts5`].
pub mod fts5;

use crate::catalog::{NodeCategory, Source};
use crate::error::QueryResult;

/// Which indexed text a ranked search runs over, with its filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Pages { source: Option<Source> },
    Sections,
    Nodes { category: Option<NodeCategory> },
    CodeExamples,
}

/// One ranked match. `id` is the row id in the corpus' source table; a higher
/// `score` means more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    pub id: i64,
    pub score: f64,
    pub snippet: Option<String>,
}

/// Relevance ranking delegated to a search engine.
///
/// Implementations must return hits ordered by descending score with ties
/// broken by ascending id, and at most `limit` of them.
pub trait Ranker: Send + Sync {
    fn rank(&self, corpus: Corpus, query: &MatchQuery, limit: usize) -> QueryResult<Vec<RankedHit>>;
}

/// A free-text query reduced to lower-cased alphanumeric terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    terms: Vec<String>,
}

impl MatchQuery {
    /// Split `text` into terms. Anything that is not alphanumeric (or `_`)
    /// separates terms, so FTS operators in user input are never interpreted.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let terms = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { terms }
    }

    #[must_use]
    pub fn from_terms(terms: Vec<String>) -> Self {
        Self { terms }
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// FTS5 expression requiring every term (as a prefix).
    #[must_use]
    pub fn all_terms(&self) -> String {
        self.join(" ")
    }

    /// FTS5 expression matching any term (as a prefix).
    #[must_use]
    pub fn any_term(&self) -> String {
        self.join(" OR ")
    }

    fn join(&self, sep: &str) -> String {
        self.terms
            .iter()
            .map(|t| prefix_term(t))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Quote a term as an FTS5 string and make it a prefix query.
fn prefix_term(term: &str) -> String {
    format!("\"{}\"*", term.replace('"', "\"\""))
}
