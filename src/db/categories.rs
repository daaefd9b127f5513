use rusqlite::Result;
use std::collections::HashMap;

use super::DocStore;
use super::models::{Categories, CategoryCount};
use crate::catalog::FrameworkSection;
use crate::error::QueryResult;

/// Sort by count descending, then name, so output is stable.
fn sorted(mut counts: Vec<CategoryCount>) -> Vec<CategoryCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    counts
}

impl DocStore {
    /// Framework sections with page counts and node categories with node
    /// counts. Groups with no members are omitted.
    pub fn categories(&self) -> QueryResult<Categories> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT url FROM pages WHERE source = 'framework'")?;
            let urls = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut sections: HashMap<&'static str, u64> = HashMap::new();
            for url in urls {
                *sections.entry(FrameworkSection::from_url(&url?).name()).or_default() += 1;
            }
            let framework_sections = sorted(
                sections
                    .into_iter()
                    .map(|(category, count)| CategoryCount {
                        category: category.to_string(),
                        count,
                    })
                    .collect(),
            );

            let mut stmt = conn
                .prepare_cached("SELECT category, COUNT(*) FROM nodes GROUP BY category")?;
            let node_categories = stmt
                .query_map([], |row| {
                    Ok(CategoryCount {
                        category: row.get(0)?,
                        count: row.get::<_, i64>(1)?.max(0) as u64,
                    })
                })?
                .collect::<Result<Vec<_>>>()?;

            Ok(Categories {
                framework_sections,
                node_categories: sorted(node_categories),
            })
        })
    }
}
