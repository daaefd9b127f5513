//! Query service: the six read-only operations behind the MCP tools.
//!
//! Validates arguments, resolves locators, hands ranking to a [`Ranker`] and
//! assembles result records from the store. Holds no mutable state.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{NodeCategory, Scope};
use crate::config::SearchConfig;
use crate::db::DocStore;
use crate::db::models::{Categories, CodeExampleHit, NodeDetails, NodeSummary, Page, PageHit};
use crate::error::{QueryError, QueryResult};
use crate::search::{Corpus, MatchQuery, Ranker};

/// How `get_page` identifies a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocator {
    ByUrl(String),
    ByTitle(String),
}

impl PageLocator {
    /// URLs start with a scheme; anything else is a title.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::ByUrl(input.to_string())
        } else {
            Self::ByTitle(input.to_string())
        }
    }
}

/// How `get_node_details` identifies a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLocator {
    ById(i64),
    ByName(String),
}

impl NodeLocator {
    /// All-digit input is a node id; anything else is a name.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = input.parse() {
                return Self::ById(id);
            }
        }
        Self::ByName(input.to_string())
    }
}

pub struct QueryService {
    store: Arc<DocStore>,
    ranker: Arc<dyn Ranker>,
    config: SearchConfig,
}

impl QueryService {
    /// Service ranking with the store's own full-text index.
    #[must_use]
    pub fn new(store: Arc<DocStore>, config: SearchConfig) -> Self {
        let ranker: Arc<dyn Ranker> = store.clone();
        Self::with_ranker(store, ranker, config)
    }

    #[must_use]
    pub fn with_ranker(store: Arc<DocStore>, ranker: Arc<dyn Ranker>, config: SearchConfig) -> Self {
        Self {
            store,
            ranker,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // ── Validation ───────────────────────────────────────────────────

    fn check_text<'a>(&self, field: &str, text: &'a str) -> QueryResult<&'a str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(QueryError::invalid(format!("{field} must be a non-empty string")));
        }
        if text.chars().count() > self.config.max_query_length {
            return Err(QueryError::invalid(format!(
                "{field} too long (max {} characters)",
                self.config.max_query_length
            )));
        }
        Ok(trimmed)
    }

    /// Limits are signed so a negative value is reported as invalid input.
    fn check_limit(&self, limit: Option<i64>, default: usize) -> QueryResult<usize> {
        let Some(limit) = limit else {
            return Ok(default);
        };
        usize::try_from(limit)
            .ok()
            .filter(|l| (1..=self.config.max_limit).contains(l))
            .ok_or_else(|| {
                QueryError::invalid(format!(
                    "limit must be between 1 and {}, got {limit}",
                    self.config.max_limit
                ))
            })
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Ranked pages matching `query` within `scope`.
    pub fn search_docs(
        &self,
        query: &str,
        scope: Scope,
        limit: Option<i64>,
    ) -> QueryResult<Vec<PageHit>> {
        let query = self.check_text("query", query)?;
        let limit = self.check_limit(limit, self.config.default_limit)?;

        let corpus = Corpus::Pages {
            source: scope.source(),
        };
        let hits = self.ranker.rank(corpus, &MatchQuery::parse(query), limit)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(page) = self.store.page_hit(hit.id, hit.score, hit.snippet)? {
                results.push(page);
            }
        }
        debug!("search_docs({query:?}, {scope:?}) -> {} hits", results.len());
        Ok(results)
    }

    /// Full page by URL or title.
    pub fn get_page(&self, locator: &str) -> QueryResult<Page> {
        let text = self.check_text("url_or_title", locator)?;
        let id = match PageLocator::parse(text) {
            PageLocator::ByUrl(url) => self.resolve_url(&url)?,
            PageLocator::ByTitle(title) => self.resolve_title(&title)?,
        };

        id.map(|id| self.store.load_page(id))
            .transpose()?
            .flatten()
            .ok_or_else(|| QueryError::NotFound(format!("no page found matching '{text}'")))
    }

    fn resolve_url(&self, url: &str) -> QueryResult<Option<i64>> {
        if let Some(id) = self.store.page_id_by_url(url)? {
            return Ok(Some(id));
        }
        let toggled = match url.strip_suffix('/') {
            Some(bare) => bare.to_string(),
            None => format!("{url}/"),
        };
        self.store.page_id_by_url(&toggled)
    }

    fn resolve_title(&self, title: &str) -> QueryResult<Option<i64>> {
        if let Some(id) = self.store.page_id_by_exact_title(title)? {
            return Ok(Some(id));
        }
        if let Some(id) = self.store.page_id_by_title_containing(title)? {
            return Ok(Some(id));
        }
        let titles = self.store.page_titles()?;
        Ok(best_fuzzy_match(
            title,
            titles.iter().map(|(id, t)| (*id, t.as_str())),
            self.config.title_similarity,
        ))
    }

    /// Ranked nodes matching `query`, optionally within one category.
    pub fn search_nodes(
        &self,
        query: &str,
        category: Option<&str>,
        limit: Option<i64>,
    ) -> QueryResult<Vec<NodeSummary>> {
        let query = self.check_text("query", query)?;
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(NodeCategory::parse)
            .transpose()?;
        let limit = self.check_limit(limit, self.config.default_node_limit)?;

        let hits = self
            .ranker
            .rank(Corpus::Nodes { category }, &MatchQuery::parse(query), limit)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(node) = self.store.node_summary(hit.id, hit.score)? {
                results.push(node);
            }
        }
        if !results.is_empty() {
            return Ok(results);
        }

        let results = self.store.nodes_matching_text(query, category, limit)?;
        if !results.is_empty() || !query.contains(' ') {
            return Ok(results);
        }

        // Multi-word fallback: union of per-word matches, first seen wins.
        let mut seen = HashSet::new();
        let mut combined = Vec::new();
        for word in query.split_whitespace().filter(|w| w.chars().count() >= 2) {
            for node in self.store.nodes_matching_text(word, category, limit)? {
                if seen.insert(node.id) {
                    combined.push(node);
                }
            }
        }
        combined.truncate(limit);
        Ok(combined)
    }

    /// Full node by id or name.
    pub fn get_node_details(&self, locator: &str) -> QueryResult<NodeDetails> {
        let text = self.check_text("node_name", locator)?;
        let id = match NodeLocator::parse(text) {
            NodeLocator::ById(id) => Some(id),
            NodeLocator::ByName(name) => self.resolve_node_name(&name)?,
        };

        id.map(|id| self.store.load_node(id))
            .transpose()?
            .flatten()
            .ok_or_else(|| {
                QueryError::NotFound(format!(
                    "no node found matching '{text}'; try search_griptape_nodes to find available nodes"
                ))
            })
    }

    fn resolve_node_name(&self, name: &str) -> QueryResult<Option<i64>> {
        if let Some(id) = self.store.node_id_by_exact_name(name)? {
            return Ok(Some(id));
        }
        if let Some(id) = self.store.node_id_by_name_containing(name, false)? {
            return Ok(Some(id));
        }
        if let Some(id) = self.store.node_id_by_name_containing(name, true)? {
            return Ok(Some(id));
        }
        let names = self.store.node_names()?;
        let candidates = names.iter().flat_map(|(id, name, display)| {
            std::iter::once((*id, name.as_str())).chain(display.as_deref().map(|d| (*id, d)))
        });
        Ok(best_fuzzy_match(
            name,
            candidates,
            self.config.title_similarity,
        ))
    }

    /// Framework sections and node categories with counts.
    pub fn list_categories(&self) -> QueryResult<Categories> {
        self.store.categories()
    }

    /// Code examples about `topic`: ranked examples first, then examples
    /// under ranked sections, then examples on ranked pages.
    pub fn get_code_examples(
        &self,
        topic: &str,
        limit: Option<i64>,
    ) -> QueryResult<Vec<CodeExampleHit>> {
        let topic = self.check_text("topic", topic)?;
        let limit = self.check_limit(limit, self.config.default_limit)?;
        let query = MatchQuery::parse(topic);

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(limit);

        let mut collect = |ids: Vec<i64>, score: f64, results: &mut Vec<CodeExampleHit>| {
            for id in ids {
                if results.len() >= limit {
                    break;
                }
                if seen.insert(id) {
                    if let Some(hit) = self.store.code_example_hit(id, score)? {
                        results.push(hit);
                    }
                }
            }
            Ok::<_, QueryError>(())
        };

        for hit in self.ranker.rank(Corpus::CodeExamples, &query, limit)? {
            collect(vec![hit.id], hit.score, &mut results)?;
        }

        if results.len() < limit {
            for hit in self.ranker.rank(Corpus::Sections, &query, limit)? {
                let ids = self.store.code_example_ids_for_section(hit.id)?;
                collect(ids, hit.score, &mut results)?;
            }
        }

        if results.len() < limit {
            let pages = Corpus::Pages { source: None };
            for hit in self.ranker.rank(pages, &query, limit)? {
                let ids = self.store.code_example_ids_for_page(hit.id)?;
                collect(ids, hit.score, &mut results)?;
            }
        }

        debug!("get_code_examples({topic:?}) -> {} examples", results.len());
        Ok(results)
    }
}

/// Candidate with the highest normalized Levenshtein similarity to `needle`
/// (case-insensitive), if it reaches `threshold`. Ties go to the lower id.
fn best_fuzzy_match<'a, I>(needle: &str, candidates: I, threshold: f64) -> Option<i64>
where
    I: IntoIterator<Item = (i64, &'a str)>,
{
    let needle = needle.to_lowercase();
    let mut best: Option<(f64, i64)> = None;
    for (id, text) in candidates {
        let score = strsim::normalized_levenshtein(&needle, &text.to_lowercase());
        if score < threshold {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_score, best_id)) => {
                score > best_score || (score == best_score && id < best_id)
            }
        };
        if better {
            best = Some((score, id));
        }
    }
    best.map(|(_, id)| id)
}
