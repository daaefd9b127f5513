use rusqlite::{Connection, OptionalExtension, Result, Row, params};

use super::DocStore;
use super::models::{CodeExample, CodeExampleHit, NodeRef, Page, PageHit, Section};
use crate::catalog::Source;
use crate::error::QueryResult;

const CODE_EXAMPLE_COLUMNS: &str = "ce.id, ce.page_id, ce.section_id, ce.language, ce.code, ce.context";

fn map_code_example(row: &Row<'_>) -> Result<CodeExample> {
    Ok(CodeExample {
        id: row.get(0)?,
        page_id: row.get(1)?,
        section_id: row.get(2)?,
        language: row
            .get::<_, Option<String>>(3)?
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        code: row.get(4)?,
        caption: row.get::<_, Option<String>>(5)?.filter(|c| !c.is_empty()),
    })
}

fn map_section(row: &Row<'_>) -> Result<Section> {
    Ok(Section {
        id: row.get(0)?,
        heading: row.get(1)?,
        level: row.get::<_, Option<i64>>(2)?.unwrap_or(2),
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        anchor: row.get::<_, Option<String>>(4)?.filter(|a| !a.is_empty()),
        position: row.get(5)?,
        code_examples: Vec::new(),
    })
}

fn parse_breadcrumbs(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Sections of a page in ordinal order.
pub(crate) fn sections_for_page(conn: &Connection, page_id: i64) -> Result<Vec<Section>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, heading, level, content, anchor, position
        FROM sections WHERE page_id = ?
        ORDER BY position ASC, id ASC
        "#,
    )?;
    let rows = stmt.query_map(params![page_id], map_section)?;
    rows.collect()
}

/// All code examples of a page in insertion order.
pub(crate) fn code_examples_for_page(conn: &Connection, page_id: i64) -> Result<Vec<CodeExample>> {
    let sql = format!(
        "SELECT {CODE_EXAMPLE_COLUMNS} FROM code_examples ce WHERE ce.page_id = ? ORDER BY ce.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![page_id], map_code_example)?;
    rows.collect()
}

/// Sections with their attached examples, plus the examples attached to no
/// section (or to a section id that is not on this page).
pub(crate) fn sections_with_examples(
    conn: &Connection,
    page_id: i64,
) -> Result<(Vec<Section>, Vec<CodeExample>)> {
    let mut sections = sections_for_page(conn, page_id)?;
    let mut unattached = Vec::new();

    for example in code_examples_for_page(conn, page_id)? {
        let owner = example
            .section_id
            .and_then(|sid| sections.iter_mut().find(|s| s.id == sid));
        match owner {
            Some(section) => section.code_examples.push(example),
            None => unattached.push(example),
        }
    }

    Ok((sections, unattached))
}

impl DocStore {
    pub fn page_id_by_url(&self, url: &str) -> QueryResult<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM pages WHERE url = ?", params![url], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    pub fn page_id_by_exact_title(&self, title: &str) -> QueryResult<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM pages WHERE title = ? COLLATE NOCASE ORDER BY id LIMIT 1",
                params![title],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Shortest title containing `text`, case-insensitively.
    pub fn page_id_by_title_containing(&self, text: &str) -> QueryResult<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id FROM pages
                WHERE instr(lower(title), lower(?)) > 0
                ORDER BY length(title) ASC, id ASC
                LIMIT 1
                "#,
                params![text],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// `(id, title)` of every page, for fuzzy title resolution.
    pub fn page_titles(&self) -> QueryResult<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT id, title FROM pages ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
    }

    /// Full page with ordered sections and code examples.
    pub fn load_page(&self, page_id: i64) -> QueryResult<Option<Page>> {
        self.with_conn(|conn| {
            let head = conn
                .query_row(
                    r#"
                    SELECT id, source, title, url, content, breadcrumbs, last_modified
                    FROM pages WHERE id = ?
                    "#,
                    params![page_id],
                    |row| {
                        Ok(Page {
                            id: row.get(0)?,
                            source: Source::from_column(&row.get::<_, String>(1)?),
                            title: row.get(2)?,
                            url: row.get(3)?,
                            content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                            breadcrumbs: parse_breadcrumbs(row.get(5)?),
                            last_modified: row.get(6)?,
                            sections: Vec::new(),
                            code_examples: Vec::new(),
                        })
                    },
                )
                .optional()?;

            let Some(mut page) = head else {
                return Ok(None);
            };
            let (sections, unattached) = sections_with_examples(conn, page.id)?;
            page.sections = sections;
            page.code_examples = unattached;
            Ok(Some(page))
        })
    }

    /// Title/URL/source of a ranked page. Score and snippet come from the ranker.
    pub fn page_hit(
        &self,
        page_id: i64,
        score: f64,
        snippet: Option<String>,
    ) -> QueryResult<Option<PageHit>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, url, source FROM pages WHERE id = ?",
                params![page_id],
                |row| {
                    Ok(PageHit {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        url: row.get(2)?,
                        source: Source::from_column(&row.get::<_, String>(3)?),
                        snippet: snippet.clone(),
                        score,
                    })
                },
            )
            .optional()
        })
    }

    /// Code example ids attached to a section.
    pub fn code_example_ids_for_section(&self, section_id: i64) -> QueryResult<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id FROM code_examples WHERE section_id = ? ORDER BY id",
            )?;
            let rows = stmt.query_map(params![section_id], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// Code example ids of a page.
    pub fn code_example_ids_for_page(&self, page_id: i64) -> QueryResult<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare_cached("SELECT id FROM code_examples WHERE page_id = ? ORDER BY id")?;
            let rows = stmt.query_map(params![page_id], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// A code example with the title and URL of its page, and the node that
    /// page documents, if any.
    pub fn code_example_hit(&self, example_id: i64, score: f64) -> QueryResult<Option<CodeExampleHit>> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT ce.id, ce.language, ce.code, ce.context, s.heading,
                       p.id, p.title, p.url,
                       (SELECT n.id FROM nodes n WHERE n.page_id = p.id ORDER BY n.id LIMIT 1),
                       (SELECT n.name FROM nodes n WHERE n.page_id = p.id ORDER BY n.id LIMIT 1)
                FROM code_examples ce
                JOIN pages p ON p.id = ce.page_id
                LEFT JOIN sections s ON s.id = ce.section_id
                WHERE ce.id = ?
                "#,
                params![example_id],
                |row| {
                    let node_id: Option<i64> = row.get(8)?;
                    let node_name: Option<String> = row.get(9)?;
                    Ok(CodeExampleHit {
                        id: row.get(0)?,
                        language: row
                            .get::<_, Option<String>>(1)?
                            .filter(|l| !l.is_empty())
                            .unwrap_or_else(|| "text".to_string()),
                        code: row.get(2)?,
                        caption: row.get::<_, Option<String>>(3)?.filter(|c| !c.is_empty()),
                        heading: row.get(4)?,
                        page_id: row.get(5)?,
                        title: row.get(6)?,
                        url: row.get(7)?,
                        node: node_id.zip(node_name).map(|(id, name)| NodeRef { id, name }),
                        score,
                    })
                },
            )
            .optional()
        })
    }
}
