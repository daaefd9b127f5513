//! [`Ranker`] over SQLite FTS5.
//!
//! Scores are `-bm25(...)` so that larger is better. Title-like columns are
//! weighted over body columns. A query is tried as all-terms, then any-term,
//! then with misspelled terms replaced by their nearest neighbour in the
//! index vocabulary.
use rusqlite::{Connection, params};
use tracing::debug;

use super::{Corpus, MatchQuery, RankedHit, Ranker};
use crate::db::{DocStore, table_names};
use crate::error::QueryResult;

const PAGES_SQL: &str = r#"
SELECT p.id,
       -bm25(pages_fts, 10.0, 1.0) AS score,
       snippet(pages_fts, 1, '>>>', '<<<', '...', 40)
FROM pages_fts
JOIN pages p ON p.id = pages_fts.rowid
WHERE pages_fts MATCH ?1 AND (?2 IS NULL OR p.source = ?2)
ORDER BY score DESC, p.id ASC
LIMIT ?3
"#;

const SECTIONS_SQL: &str = r#"
SELECT s.id,
       -bm25(sections_fts, 5.0, 1.0) AS score,
       snippet(sections_fts, 1, '>>>', '<<<', '...', 40)
FROM sections_fts
JOIN sections s ON s.id = sections_fts.rowid
WHERE sections_fts MATCH ?1 AND ?2 IS NULL
ORDER BY score DESC, s.id ASC
LIMIT ?3
"#;

const NODES_SQL: &str = r#"
SELECT n.id,
       -bm25(nodes_fts, 10.0, 10.0, 1.0) AS score,
       snippet(nodes_fts, 2, '>>>', '<<<', '...', 24)
FROM nodes_fts
JOIN nodes n ON n.id = nodes_fts.rowid
WHERE nodes_fts MATCH ?1 AND (?2 IS NULL OR n.category = ?2)
ORDER BY score DESC, n.id ASC
LIMIT ?3
"#;

const CODE_EXAMPLES_SQL: &str = r#"
SELECT ce.id,
       -bm25(code_examples_fts, 1.0, 2.0) AS score,
       NULL
FROM code_examples_fts
JOIN code_examples ce ON ce.id = code_examples_fts.rowid
WHERE code_examples_fts MATCH ?1 AND ?2 IS NULL
ORDER BY score DESC, ce.id ASC
LIMIT ?3
"#;

/// Terms shorter than this are never rewritten.
const MIN_CORRECTABLE_LEN: usize = 3;

impl Corpus {
    fn sql(self) -> &'static str {
        match self {
            Self::Pages { .. } => PAGES_SQL,
            Self::Sections => SECTIONS_SQL,
            Self::Nodes { .. } => NODES_SQL,
            Self::CodeExamples => CODE_EXAMPLES_SQL,
        }
    }

    fn filter(self) -> Option<&'static str> {
        match self {
            Self::Pages { source } => source.map(|s| s.as_str()),
            Self::Nodes { category } => category.map(|c| c.display_name()),
            Self::Sections | Self::CodeExamples => None,
        }
    }

    fn vocab_table(self) -> &'static str {
        match self {
            Self::Pages { .. } => "pages_vocab",
            Self::Sections => "sections_vocab",
            Self::Nodes { .. } => "nodes_vocab",
            Self::CodeExamples => "code_examples_vocab",
        }
    }
}

impl Ranker for DocStore {
    fn rank(&self, corpus: Corpus, query: &MatchQuery, limit: usize) -> QueryResult<Vec<RankedHit>> {
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        self.with_conn(|conn| {
            let hits = run_match(conn, corpus, &query.all_terms(), limit)?;
            if !hits.is_empty() {
                return Ok(hits);
            }

            if query.terms().len() > 1 {
                let hits = run_match(conn, corpus, &query.any_term(), limit)?;
                if !hits.is_empty() {
                    return Ok(hits);
                }
            }

            match correct_terms(conn, corpus, query)? {
                Some(corrected) => {
                    debug!(
                        "Retrying {:?} with corrected terms {:?}",
                        query.terms(),
                        corrected.terms()
                    );
                    run_match(conn, corpus, &corrected.all_terms(), limit)
                }
                None => Ok(Vec::new()),
            }
        })
    }
}

fn run_match(
    conn: &Connection,
    corpus: Corpus,
    expr: &str,
    limit: usize,
) -> rusqlite::Result<Vec<RankedHit>> {
    let mut stmt = conn.prepare_cached(corpus.sql())?;
    let rows = stmt.query_map(params![expr, corpus.filter(), limit as i64], |row| {
        Ok(RankedHit {
            id: row.get(0)?,
            score: row.get(1)?,
            snippet: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Replace terms that match nothing in the vocabulary with their closest
/// neighbour sharing the first character. A term with no neighbour in range
/// is kept as typed, so the corrected query never matches more than the
/// corrections allow. Returns `None` when nothing changed or the store has
/// no vocabulary table for this corpus.
fn correct_terms(
    conn: &Connection,
    corpus: Corpus,
    query: &MatchQuery,
) -> rusqlite::Result<Option<MatchQuery>> {
    let vocab = corpus.vocab_table();
    if !table_names(conn)?.contains(vocab) {
        debug!("No {vocab} table, skipping typo correction");
        return Ok(None);
    }

    let sql = format!("SELECT term FROM {vocab} WHERE term >= ?1 AND term < ?2 ORDER BY term");
    let mut stmt = conn.prepare(&sql)?;

    let mut corrected = Vec::with_capacity(query.terms().len());
    let mut changed = false;

    for term in query.terms() {
        let Some(first) = term.chars().next() else {
            continue;
        };
        let upper = char::from_u32(first as u32 + 1)
            .map_or_else(|| format!("{first}\u{10FFFF}"), String::from);

        let candidates: Vec<String> = stmt
            .query_map(params![first.to_string(), upper], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        if candidates.iter().any(|c| c.starts_with(term.as_str())) {
            corrected.push(term.clone());
            continue;
        }

        match nearest_term(term, &candidates) {
            Some(best) => {
                changed = true;
                corrected.push(best.to_string());
            }
            None => corrected.push(term.clone()),
        }
    }

    if !changed {
        return Ok(None);
    }
    Ok(Some(MatchQuery::from_terms(corrected)))
}

fn max_typo_distance(len: usize) -> usize {
    if len <= 5 { 1 } else { 2 }
}

/// Closest candidate within the allowed edit distance, counting an adjacent
/// swap as one edit. Ties go to the lexicographically smallest term.
fn nearest_term<'a>(term: &str, candidates: &'a [String]) -> Option<&'a str> {
    let len = term.chars().count();
    if len < MIN_CORRECTABLE_LEN {
        return None;
    }
    let max = max_typo_distance(len);
    candidates
        .iter()
        .map(|c| (strsim::osa_distance(term, c), c.as_str()))
        .filter(|(d, _)| *d <= max)
        .min()
        .map(|(_, c)| c)
}
