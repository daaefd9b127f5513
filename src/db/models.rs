use serde::Serialize;

use crate::catalog::Source;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeExample {
    pub id: i64,
    pub page_id: i64,
    pub section_id: Option<i64>,
    pub language: String,
    pub code: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: i64,
    pub heading: String,
    pub level: i64,
    pub content: String,
    pub anchor: Option<String>,
    pub position: i64,
    pub code_examples: Vec<CodeExample>,
}

/// A documentation page with its sections in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: i64,
    pub source: Source,
    pub title: String,
    pub url: String,
    pub content: String,
    pub breadcrumbs: Vec<String>,
    pub last_modified: Option<String>,
    pub sections: Vec<Section>,
    /// Examples not attached to any section.
    pub code_examples: Vec<CodeExample>,
}

impl Page {
    /// Every code example of the page, section-attached ones first.
    pub fn all_code_examples(&self) -> impl Iterator<Item = &CodeExample> {
        self.sections
            .iter()
            .flat_map(|s| s.code_examples.iter())
            .chain(self.code_examples.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHit {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: Source,
    pub snippet: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub page_id: Option<i64>,
    /// Full body of the node's documentation page (inputs, outputs, settings).
    pub documentation: Option<String>,
    pub sections: Vec<Section>,
    pub code_examples: Vec<CodeExample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeExampleHit {
    pub id: i64,
    pub language: String,
    pub code: String,
    pub caption: Option<String>,
    pub heading: Option<String>,
    pub page_id: i64,
    pub title: String,
    pub url: String,
    pub node: Option<NodeRef>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Categories {
    pub framework_sections: Vec<CategoryCount>,
    pub node_categories: Vec<CategoryCount>,
}

/// Row counts, logged when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub framework_pages: u64,
    pub node_pages: u64,
    pub sections: u64,
    pub code_examples: u64,
    pub nodes: u64,
}

impl StoreStats {
    #[must_use]
    pub fn pages(&self) -> u64 {
        self.framework_pages + self.node_pages
    }
}
