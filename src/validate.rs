/// Post-build validation of a documentation store.
///
/// Runs a fixed list of checks and reports each as PASS or FAIL instead of
/// stopping at the first problem.
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::Path;

use crate::db::{REQUIRED_TABLES, table_names};

/// Minimum counts a store must exceed. Defaults fit a full docs build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub framework_pages: u64,
    pub node_pages: u64,
    pub nodes: u64,
    pub sections: u64,
    pub code_examples: u64,
    pub node_categories: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            framework_pages: 10,
            node_pages: 10,
            nodes: 20,
            sections: 50,
            code_examples: 10,
            node_categories: 3,
        }
    }
}

impl Thresholds {
    /// Only require that each count is non-zero.
    #[must_use]
    pub fn non_empty() -> Self {
        Self {
            framework_pages: 0,
            node_pages: 0,
            nodes: 0,
            sections: 0,
            code_examples: 0,
            node_categories: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub checks: Vec<Check>,
}

impl ValidationReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    fn check(&mut self, name: impl Into<String>, passed: bool, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.into(),
            passed,
            detail: detail.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.checks {
            let status = if c.passed { "PASS" } else { "FAIL" };
            write!(f, "  [{status}] {}", c.name)?;
            if !c.detail.is_empty() {
                write!(f, " - {}", c.detail)?;
            }
            writeln!(f)?;
        }
        let summary = if self.passed() {
            "ALL CHECKS PASSED"
        } else {
            "SOME CHECKS FAILED"
        };
        write!(f, "\n{summary}")
    }
}

/// Validates the store at `path`.
pub fn validate_store(path: &Path, limits: &Thresholds) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !path.is_file() {
        report.check("Database exists", false, path.display().to_string());
        return report;
    }

    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(e) => {
            report.check("Database opens", false, e.to_string());
            return report;
        }
    };

    let tables = match table_names(&conn) {
        Ok(tables) => tables,
        Err(e) => {
            report.check("Schema readable", false, e.to_string());
            return report;
        }
    };
    let mut schema_ok = true;
    for table in REQUIRED_TABLES {
        let present = tables.contains(table);
        schema_ok &= present;
        report.check(format!("Table '{table}' exists"), present, "");
    }
    if !schema_ok {
        return report;
    }

    let integrity = conn
        .query_row("PRAGMA quick_check(1)", [], |row| row.get::<_, String>(0))
        .unwrap_or_else(|e| e.to_string());
    report.check("Integrity check", integrity.eq_ignore_ascii_case("ok"), integrity);

    let counts = [
        (
            "Framework pages",
            "SELECT COUNT(*) FROM pages WHERE source = 'framework'",
            limits.framework_pages,
        ),
        (
            "Nodes pages",
            "SELECT COUNT(*) FROM pages WHERE source = 'nodes'",
            limits.node_pages,
        ),
        ("Nodes extracted", "SELECT COUNT(*) FROM nodes", limits.nodes),
        ("Sections", "SELECT COUNT(*) FROM sections", limits.sections),
        (
            "Code examples",
            "SELECT COUNT(*) FROM code_examples",
            limits.code_examples,
        ),
        (
            "Node categories",
            "SELECT COUNT(DISTINCT category) FROM nodes",
            limits.node_categories,
        ),
    ];
    for (label, sql, min) in counts {
        match count(&conn, sql) {
            Ok(n) => report.check(format!("{label} > {min}"), n > min, format!("got {n}")),
            Err(e) => report.check(format!("{label} > {min}"), false, e.to_string()),
        }
    }

    match count(&conn, "SELECT COUNT(*) FROM pages WHERE title IS NULL OR trim(title) = ''") {
        Ok(n) => report.check("No empty page titles", n == 0, format!("got {n} empty")),
        Err(e) => report.check("No empty page titles", false, e.to_string()),
    }

    match count(&conn, "SELECT COUNT(*) FROM pages_fts WHERE pages_fts MATCH 'agent'") {
        Ok(n) => report.check("FTS search works", true, format!("'agent' matched {n} pages")),
        Err(e) => report.check("FTS search works", false, e.to_string()),
    }

    report
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
}
