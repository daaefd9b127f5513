/// Build-time write path: creates a fresh store and inserts parsed pages and
/// nodes. FTS indexes are kept in sync by the insert triggers in the schema.
///
/// Never used by the serving path, which only opens stores read-only.
use anyhow::Context;
use rusqlite::{Connection, Result, params};
use std::path::Path;
use tracing::info;

use super::SCHEMA_SQL;
use crate::catalog::{NodeCategory, Source};

#[derive(Debug, Clone, Default)]
pub struct NewSection<'a> {
    pub heading: &'a str,
    pub level: i64,
    pub content: &'a str,
    pub anchor: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCodeExample<'a> {
    /// Index into the page's sections, if the example sits under one.
    pub section: Option<usize>,
    pub language: &'a str,
    pub code: &'a str,
    pub context: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct NewPage<'a> {
    pub url: &'a str,
    pub source: Source,
    pub title: &'a str,
    pub content: &'a str,
    pub breadcrumbs: &'a [String],
    pub last_modified: Option<&'a str>,
    pub sections: &'a [NewSection<'a>],
    pub code_examples: &'a [NewCodeExample<'a>],
}

#[derive(Debug, Clone)]
pub struct NewNode<'a> {
    pub name: &'a str,
    pub display_name: Option<&'a str>,
    pub category: NodeCategory,
    pub description: Option<&'a str>,
    pub page_id: Option<i64>,
}

/// Ids assigned to an inserted page and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertedPage {
    pub page_id: i64,
    pub section_ids: Vec<i64>,
    pub code_example_ids: Vec<i64>,
}

pub struct StoreWriter {
    conn: Connection,
}

impl StoreWriter {
    /// Create a fresh store at `path`, replacing any existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("Removing existing store: {}", path.display());
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        info!("Initializing store: {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self::init(conn)?)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a page with its sections and code examples in one transaction.
    pub fn insert_page(&mut self, page: &NewPage<'_>) -> Result<InsertedPage> {
        let tx = self.conn.transaction()?;

        let breadcrumbs =
            serde_json::to_string(page.breadcrumbs).unwrap_or_else(|_| "[]".to_string());
        let page_id: i64 = tx.query_row(
            r#"
            INSERT INTO pages (url, source, title, content, content_html, breadcrumbs, last_modified)
            VALUES (?, ?, ?, ?, '', ?, ?)
            RETURNING id
            "#,
            params![
                page.url,
                page.source.as_str(),
                page.title,
                page.content,
                breadcrumbs,
                page.last_modified,
            ],
            |row| row.get(0),
        )?;

        let mut section_ids = Vec::with_capacity(page.sections.len());
        for (position, section) in page.sections.iter().enumerate() {
            tx.execute(
                "INSERT INTO sections (page_id, heading, level, content, anchor, position) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    page_id,
                    section.heading,
                    section.level,
                    section.content,
                    section.anchor,
                    position as i64,
                ],
            )?;
            section_ids.push(tx.last_insert_rowid());
        }

        let mut code_example_ids = Vec::with_capacity(page.code_examples.len());
        for example in page.code_examples {
            let section_id = example.section.and_then(|i| section_ids.get(i).copied());
            tx.execute(
                "INSERT INTO code_examples (page_id, section_id, language, code, context) VALUES (?, ?, ?, ?, ?)",
                params![
                    page_id,
                    section_id,
                    example.language,
                    example.code,
                    example.context,
                ],
            )?;
            code_example_ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        Ok(InsertedPage {
            page_id,
            section_ids,
            code_example_ids,
        })
    }

    pub fn insert_node(&mut self, node: &NewNode<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO nodes (name, display_name, category, description, page_id) VALUES (?, ?, ?, ?, ?)",
            params![
                node.name,
                node.display_name,
                node.category.display_name(),
                node.description,
                node.page_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Merge FTS segments and hand back the connection.
    pub fn finish(self) -> Result<Connection> {
        self.conn.execute_batch(
            r#"
            INSERT INTO pages_fts(pages_fts) VALUES('optimize');
            INSERT INTO sections_fts(sections_fts) VALUES('optimize');
            INSERT INTO nodes_fts(nodes_fts) VALUES('optimize');
            INSERT INTO code_examples_fts(code_examples_fts) VALUES('optimize');
            "#,
        )?;
        Ok(self.conn)
    }
}
