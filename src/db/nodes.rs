use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Result, Row, params};

use super::DocStore;
use super::models::{NodeDetails, NodeSummary};
use super::pages::sections_with_examples;
use crate::catalog::NodeCategory;
use crate::error::QueryResult;

const SUMMARY_SELECT: &str = r#"
SELECT n.id, n.name, n.display_name, n.category, n.description, p.url
FROM nodes n
LEFT JOIN pages p ON p.id = n.page_id
"#;

fn map_summary(row: &Row<'_>, score: f64) -> Result<NodeSummary> {
    Ok(NodeSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        url: row.get(5)?,
        score,
    })
}

impl DocStore {
    pub fn node_summary(&self, node_id: i64, score: f64) -> QueryResult<Option<NodeSummary>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{SUMMARY_SELECT} WHERE n.id = ?"),
                params![node_id],
                |row| map_summary(row, score),
            )
            .optional()
        })
    }

    /// Substring search over name, display name and description, ignoring
    /// spaces in names so "Load Image" matches "LoadImage". Without a
    /// category filter the category name is searched too. Used when ranked
    /// search finds nothing. Results are ordered by name, id.
    pub fn nodes_matching_text(
        &self,
        text: &str,
        category: Option<NodeCategory>,
        limit: usize,
    ) -> QueryResult<Vec<NodeSummary>> {
        let like = format!("%{}%", escape_like(text));
        let stripped_like = format!("%{}%", escape_like(&text.replace(' ', "")));

        let mut values: Vec<Value> = vec![Value::Text(like), Value::Text(stripped_like)];
        let (category_match, category_filter) = match category {
            Some(c) => {
                values.push(Value::Text(c.display_name().to_string()));
                ("", " AND n.category = ?3")
            }
            None => (r#" OR n.category LIKE ?1 ESCAPE '\'"#, ""),
        };

        let mut query = format!(
            r#"{SUMMARY_SELECT}
            WHERE (n.name LIKE ?1 ESCAPE '\' OR n.display_name LIKE ?1 ESCAPE '\'
                OR n.description LIKE ?1 ESCAPE '\'
                OR REPLACE(n.name, ' ', '') LIKE ?2 ESCAPE '\'
                OR REPLACE(n.display_name, ' ', '') LIKE ?2 ESCAPE '\'{category_match}){category_filter}"#
        );
        query.push_str(&format!(" ORDER BY n.name ASC, n.id ASC LIMIT {}", limit as i64));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
                map_summary(row, 0.0)
            })?;
            rows.collect()
        })
    }

    /// First node whose name or display name equals `name`, ignoring case.
    pub fn node_id_by_exact_name(&self, name: &str) -> QueryResult<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id FROM nodes
                WHERE name = ?1 COLLATE NOCASE OR display_name = ?1 COLLATE NOCASE
                ORDER BY id LIMIT 1
                "#,
                params![name],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Shortest node name containing `text`; with `ignore_spaces` both sides
    /// are compared with spaces removed.
    pub fn node_id_by_name_containing(
        &self,
        text: &str,
        ignore_spaces: bool,
    ) -> QueryResult<Option<i64>> {
        let sql = if ignore_spaces {
            r#"
            SELECT id FROM nodes
            WHERE instr(lower(REPLACE(name, ' ', '')), lower(REPLACE(?1, ' ', ''))) > 0
               OR instr(lower(REPLACE(coalesce(display_name, ''), ' ', '')), lower(REPLACE(?1, ' ', ''))) > 0
            ORDER BY length(name) ASC, id ASC LIMIT 1
            "#
        } else {
            r#"
            SELECT id FROM nodes
            WHERE instr(lower(name), lower(?1)) > 0
               OR instr(lower(coalesce(display_name, '')), lower(?1)) > 0
            ORDER BY length(name) ASC, id ASC LIMIT 1
            "#
        };
        self.with_conn(|conn| {
            conn.query_row(sql, params![text], |row| row.get(0))
                .optional()
        })
    }

    /// `(id, name, display_name)` of every node, for fuzzy resolution.
    pub fn node_names(&self) -> QueryResult<Vec<(i64, String, Option<String>)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare_cached("SELECT id, name, display_name FROM nodes ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect()
        })
    }

    /// Node with its documentation page body, sections and code examples.
    pub fn load_node(&self, node_id: i64) -> QueryResult<Option<NodeDetails>> {
        self.with_conn(|conn| {
            let head = conn
                .query_row(
                    r#"
                    SELECT n.id, n.name, n.display_name, n.category, n.description,
                           n.page_id, p.url, p.content
                    FROM nodes n
                    LEFT JOIN pages p ON p.id = n.page_id
                    WHERE n.id = ?
                    "#,
                    params![node_id],
                    |row| {
                        Ok(NodeDetails {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            display_name: row.get(2)?,
                            category: row.get(3)?,
                            description: row.get(4)?,
                            page_id: row.get(5)?,
                            url: row.get(6)?,
                            documentation: row
                                .get::<_, Option<String>>(7)?
                                .filter(|d| !d.is_empty()),
                            sections: Vec::new(),
                            code_examples: Vec::new(),
                        })
                    },
                )
                .optional()?;

            let Some(mut node) = head else {
                return Ok(None);
            };
            if let Some(page_id) = node.page_id {
                let (sections, unattached) = sections_with_examples(conn, page_id)?;
                node.code_examples = sections
                    .iter()
                    .flat_map(|s| s.code_examples.iter().cloned())
                    .chain(unattached)
                    .collect();
                node.code_examples.sort_by_key(|e| e.id);
                node.sections = sections
                    .into_iter()
                    .map(|mut s| {
                        s.code_examples.clear();
                        s
                    })
                    .collect();
            }
            Ok(Some(node))
        })
    }
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
