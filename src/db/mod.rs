//! Documentation store: a single SQLite file with FTS5 indexes, opened
//! read-only for the lifetime of the server.
use rusqlite::{Connection, OpenFlags};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::error::{QueryError, QueryResult};

pub mod categories;
pub mod models;
pub mod nodes;
pub mod pages;
pub mod writer;

use models::StoreStats;

pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT,
    content_html TEXT,
    breadcrumbs TEXT,
    last_modified TEXT,
    crawled_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    heading TEXT NOT NULL,
    level INTEGER,
    content TEXT,
    anchor TEXT,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS code_examples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    section_id INTEGER REFERENCES sections(id) ON DELETE SET NULL,
    language TEXT,
    code TEXT NOT NULL,
    context TEXT
);

CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    display_name TEXT,
    category TEXT NOT NULL,
    description TEXT,
    page_id INTEGER REFERENCES pages(id) ON DELETE SET NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
    title, content, content=pages, content_rowid=id
);
CREATE VIRTUAL TABLE IF NOT EXISTS sections_fts USING fts5(
    heading, content, content=sections, content_rowid=id
);
CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
    name, display_name, description, content=nodes, content_rowid=id
);
CREATE VIRTUAL TABLE IF NOT EXISTS code_examples_fts USING fts5(
    code, context, content=code_examples, content_rowid=id
);

CREATE VIRTUAL TABLE IF NOT EXISTS pages_vocab USING fts5vocab(pages_fts, row);
CREATE VIRTUAL TABLE IF NOT EXISTS sections_vocab USING fts5vocab(sections_fts, row);
CREATE VIRTUAL TABLE IF NOT EXISTS nodes_vocab USING fts5vocab(nodes_fts, row);
CREATE VIRTUAL TABLE IF NOT EXISTS code_examples_vocab USING fts5vocab(code_examples_fts, row);

CREATE TRIGGER IF NOT EXISTS pages_ai AFTER INSERT ON pages BEGIN
    INSERT INTO pages_fts(rowid, title, content) VALUES (new.id, new.title, new.content);
END;
CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN
    INSERT INTO pages_fts(pages_fts, rowid, title, content) VALUES('delete', old.id, old.title, old.content);
END;

CREATE TRIGGER IF NOT EXISTS sections_ai AFTER INSERT ON sections BEGIN
    INSERT INTO sections_fts(rowid, heading, content) VALUES (new.id, new.heading, new.content);
END;
CREATE TRIGGER IF NOT EXISTS sections_ad AFTER DELETE ON sections BEGIN
    INSERT INTO sections_fts(sections_fts, rowid, heading, content) VALUES('delete', old.id, old.heading, old.content);
END;

CREATE TRIGGER IF NOT EXISTS nodes_ai AFTER INSERT ON nodes BEGIN
    INSERT INTO nodes_fts(rowid, name, display_name, description)
    VALUES (new.id, new.name, new.display_name, new.description);
END;
CREATE TRIGGER IF NOT EXISTS nodes_ad AFTER DELETE ON nodes BEGIN
    INSERT INTO nodes_fts(nodes_fts, rowid, name, display_name, description)
    VALUES('delete', old.id, old.name, old.display_name, old.description);
END;

CREATE TRIGGER IF NOT EXISTS code_examples_ai AFTER INSERT ON code_examples BEGIN
    INSERT INTO code_examples_fts(rowid, code, context) VALUES (new.id, new.code, new.context);
END;
CREATE TRIGGER IF NOT EXISTS code_examples_ad AFTER DELETE ON code_examples BEGIN
    INSERT INTO code_examples_fts(code_examples_fts, rowid, code, context) VALUES('delete', old.id, old.code, old.context);
END;

CREATE INDEX IF NOT EXISTS idx_pages_source ON pages(source);
CREATE INDEX IF NOT EXISTS idx_sections_page_id ON sections(page_id);
CREATE INDEX IF NOT EXISTS idx_code_examples_page_id ON code_examples(page_id);
CREATE INDEX IF NOT EXISTS idx_code_examples_section_id ON code_examples(section_id);
CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category);
CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);
CREATE INDEX IF NOT EXISTS idx_nodes_page_id ON nodes(page_id);
"#;

/// Tables a store must carry to be served.
pub const REQUIRED_TABLES: [&str; 8] = [
    "pages",
    "sections",
    "code_examples",
    "nodes",
    "pages_fts",
    "sections_fts",
    "nodes_fts",
    "code_examples_fts",
];

/// Read-only handle to a pre-built documentation store.
///
/// Constructed once at startup and shared behind an `Arc`. The connection is
/// guarded by a mutex so concurrent tool calls serialize their reads.
#[derive(Debug)]
pub struct DocStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DocStore {
    /// Open the store at `path` read-only and run the startup checks.
    pub fn open<P: AsRef<Path>>(path: P) -> QueryResult<Self> {
        let path = path.as_ref();
        info!("Opening documentation store: {}", path.display());

        if !path.is_file() {
            return Err(QueryError::StoreUnavailable(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| {
            QueryError::StoreUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;

        verify_schema(&conn)?;
        verify_integrity(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };

        let stats = store.stats()?;
        if stats.pages() == 0 {
            return Err(QueryError::StoreUnavailable(format!(
                "{} contains no pages",
                path.display()
            )));
        }
        info!(
            "Store ready: {} framework pages, {} node pages, {} sections, {} code examples, {} nodes",
            stats.framework_pages,
            stats.node_pages,
            stats.sections,
            stats.code_examples,
            stats.nodes
        );

        Ok(store)
    }

    /// Wrap an already-open connection, e.g. an in-memory fixture.
    ///
    /// Only the schema is checked; an empty store is accepted.
    pub fn from_connection(conn: Connection) -> QueryResult<Self> {
        verify_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection. Storage errors become `Internal`.
    pub(crate) fn with_conn<T, F>(&self, f: F) -> QueryResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| QueryError::Internal("store lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }

    /// Row counts per entity.
    pub fn stats(&self) -> QueryResult<StoreStats> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> rusqlite::Result<u64> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n.max(0) as u64)
            };
            Ok(StoreStats {
                framework_pages: count("SELECT COUNT(*) FROM pages WHERE source = 'framework'")?,
                node_pages: count("SELECT COUNT(*) FROM pages WHERE source = 'nodes'")?,
                sections: count("SELECT COUNT(*) FROM sections")?,
                code_examples: count("SELECT COUNT(*) FROM code_examples")?,
                nodes: count("SELECT COUNT(*) FROM nodes")?,
            })
        })
    }
}

/// Names of all tables (virtual tables included) in the main schema.
pub(crate) fn table_names(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn verify_schema(conn: &Connection) -> QueryResult<()> {
    let tables = table_names(conn)
        .map_err(|e| QueryError::StoreUnavailable(format!("cannot read schema: {e}")))?;

    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|t| !tables.contains(*t))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(QueryError::StoreUnavailable(format!(
            "missing required tables: {}",
            missing.join(", ")
        )))
    }
}

fn verify_integrity(conn: &Connection) -> QueryResult<()> {
    let status: String = conn
        .query_row("PRAGMA quick_check(1)", [], |row| row.get(0))
        .map_err(|e| QueryError::StoreUnavailable(format!("integrity check failed: {e}")))?;
    if status.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(QueryError::StoreUnavailable(format!(
            "integrity check failed: {status}"
        )))
    }
}
