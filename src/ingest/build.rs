use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::markdown::{ParsedDoc, parse_markdown};
use crate::catalog::{NodeCategory, Source};
use crate::db::writer::{NewCodeExample, NewNode, NewPage, NewSection, StoreWriter};

pub const FRAMEWORK_BASE_URL: &str = "https://docs.griptape.ai/stable";
pub const NODES_BASE_URL: &str = "https://docs.griptapenodes.com/en/stable";

/// Longest node description taken from a page summary, in characters.
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Category directory under `nodes/` that holds overview pages, not nodes.
const OVERVIEW_DIR: &str = "overview";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub framework_dir: Option<PathBuf>,
    pub nodes_dir: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub pages: usize,
    pub sections: usize,
    pub code_examples: usize,
    pub nodes: usize,
    pub skipped: usize,
}

/// Builds a fresh store from local markdown trees.
///
/// The store is written to a staging file next to `opts.output` and renamed
/// over it only once complete. A failed build leaves any existing store in
/// place.
pub fn build_store(opts: &BuildOptions) -> Result<BuildStats> {
    anyhow::ensure!(
        opts.framework_dir.is_some() || opts.nodes_dir.is_some(),
        "at least one of the framework or nodes directories is required"
    );
    for dir in [&opts.framework_dir, &opts.nodes_dir].into_iter().flatten() {
        anyhow::ensure!(dir.is_dir(), "not a directory: {}", dir.display());
    }

    let staging = staging_path(&opts.output)?;
    let stats = match build_into(opts, &staging) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                debug!("Could not remove {}: {cleanup}", staging.display());
            }
            return Err(e);
        }
    };
    std::fs::rename(&staging, &opts.output).with_context(|| {
        format!(
            "failed to move {} to {}",
            staging.display(),
            opts.output.display()
        )
    })?;

    info!(
        "Built {}: {} pages, {} sections, {} code examples, {} nodes ({} skipped)",
        opts.output.display(),
        stats.pages,
        stats.sections,
        stats.code_examples,
        stats.nodes,
        stats.skipped
    );
    Ok(stats)
}

fn build_into(opts: &BuildOptions, staging: &Path) -> Result<BuildStats> {
    let mut writer = StoreWriter::create(staging)
        .with_context(|| format!("failed to create store: {}", staging.display()))?;
    let mut stats = BuildStats::default();
    let mut seen_urls = HashSet::new();

    if let Some(dir) = &opts.framework_dir {
        ingest_tree(&mut writer, dir, Source::Framework, &mut seen_urls, &mut stats)?;
    }
    if let Some(dir) = &opts.nodes_dir {
        ingest_tree(&mut writer, dir, Source::Nodes, &mut seen_urls, &mut stats)?;
    }

    let conn = writer.finish().context("failed to finalize store")?;
    conn.close()
        .map_err(|(_, e)| e)
        .context("failed to close store")?;
    Ok(stats)
}

/// `<output>.building`, in the same directory so the final rename stays on
/// one filesystem.
fn staging_path(output: &Path) -> Result<PathBuf> {
    let name = output
        .file_name()
        .with_context(|| format!("output is not a file path: {}", output.display()))?;
    let mut staged = name.to_os_string();
    staged.push(".building");
    Ok(output.with_file_name(staged))
}

fn ingest_tree(
    writer: &mut StoreWriter,
    root: &Path,
    source: Source,
    seen_urls: &mut HashSet<String>,
    stats: &mut BuildStats,
) -> Result<()> {
    info!("Ingesting {source} docs from {}", root.display());

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(rel) = relative_parts(root, path) else {
            continue;
        };

        let url = page_url(source, &rel);
        if !seen_urls.insert(url.clone()) {
            warn!("Duplicate page URL {url}, skipping {}", path.display());
            stats.skipped += 1;
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                stats.skipped += 1;
                continue;
            }
        };
        let modified: Option<DateTime<Utc>> = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(Into::into);

        let doc = parse_markdown(&text);
        let title = doc
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_stem(rel.last().map(String::as_str).unwrap_or("index")));
        let breadcrumbs = breadcrumbs(&rel);

        let page_id = insert_doc(
            writer,
            &doc,
            &NewPageMeta {
                url: &url,
                source,
                title: &title,
                breadcrumbs: &breadcrumbs,
                last_modified: modified.map(|m| m.to_rfc3339()),
            },
            stats,
        )
        .with_context(|| format!("failed to insert {}", path.display()))?;
        debug!("Inserted {url} as page {page_id}");

        if source == Source::Nodes {
            if let Some(category) = node_category(&rel) {
                let description = node_description(&doc);
                writer
                    .insert_node(&NewNode {
                        name: &title,
                        display_name: Some(&title),
                        category,
                        description: description.as_deref(),
                        page_id: Some(page_id),
                    })
                    .with_context(|| format!("failed to insert node {title}"))?;
                stats.nodes += 1;
            }
        }
    }
    Ok(())
}

struct NewPageMeta<'a> {
    url: &'a str,
    source: Source,
    title: &'a str,
    breadcrumbs: &'a [String],
    last_modified: Option<String>,
}

fn insert_doc(
    writer: &mut StoreWriter,
    doc: &ParsedDoc,
    meta: &NewPageMeta<'_>,
    stats: &mut BuildStats,
) -> rusqlite::Result<i64> {
    let sections: Vec<NewSection<'_>> = doc
        .sections
        .iter()
        .map(|s| NewSection {
            heading: &s.heading,
            level: i64::from(s.level),
            content: &s.content,
            anchor: Some(s.anchor.as_str()).filter(|a| !a.is_empty()),
        })
        .collect();
    let code_examples: Vec<NewCodeExample<'_>> = doc
        .code_blocks
        .iter()
        .map(|c| NewCodeExample {
            section: c.section,
            language: &c.language,
            code: &c.code,
            context: c.context.as_deref(),
        })
        .collect();

    let inserted = writer.insert_page(&NewPage {
        url: meta.url,
        source: meta.source,
        title: meta.title,
        content: &doc.content,
        breadcrumbs: meta.breadcrumbs,
        last_modified: meta.last_modified.as_deref(),
        sections: &sections,
        code_examples: &code_examples,
    })?;

    stats.pages += 1;
    stats.sections += inserted.section_ids.len();
    stats.code_examples += inserted.code_example_ids.len();
    Ok(inserted.page_id)
}

/// Path components of `path` below `root`, with the `.md` extension dropped.
fn relative_parts(root: &Path, path: &Path) -> Option<Vec<String>> {
    let rel = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then_some(parts)
}

/// Published URL of a page: `index` files map to their directory.
fn page_url(source: Source, rel: &[String]) -> String {
    let base = match source {
        Source::Framework => FRAMEWORK_BASE_URL,
        Source::Nodes => NODES_BASE_URL,
    };
    let parts = match rel.split_last() {
        Some((last, dirs)) if last == "index" => dirs,
        _ => rel,
    };
    if parts.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{}/", parts.join("/"))
    }
}

/// Title-cased directory names above the page.
fn breadcrumbs(rel: &[String]) -> Vec<String> {
    rel.split_last()
        .map(|(_, dirs)| dirs.iter().map(|d| title_from_stem(d)).collect())
        .unwrap_or_default()
}

/// `load_image` or `prompt-drivers` to `Load Image` / `Prompt Drivers`.
fn title_from_stem(stem: &str) -> String {
    stem.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Category of a `nodes/<category>/<name>` page, if it documents a node.
fn node_category(rel: &[String]) -> Option<NodeCategory> {
    match rel {
        [nodes, slug, _name] if nodes == "nodes" && slug != OVERVIEW_DIR => {
            let category = NodeCategory::lookup(slug);
            if category.is_none() {
                warn!("Unknown node category directory '{slug}', page kept without a node");
            }
            category
        }
        _ => None,
    }
}

/// First paragraph of the page, or the start of its body when the page
/// opens with a list, table or code block.
fn node_description(doc: &ParsedDoc) -> Option<String> {
    if let Some(summary) = doc.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        return Some(truncate_description(summary));
    }
    let body = doc.content.trim_start();
    let body = match body.strip_prefix("# ") {
        Some(rest) => rest.split_once('\n').map_or("", |(_, after)| after),
        None => body,
    };
    let body = body.trim();
    (!body.is_empty()).then(|| truncate_description(body))
}

fn truncate_description(text: &str) -> String {
    text.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url(Source::Nodes, &parts("nodes/image/load_image")),
            "https://docs.griptapenodes.com/en/stable/nodes/image/load_image/"
        );
        assert_eq!(
            page_url(Source::Framework, &parts("index")),
            "https://docs.griptape.ai/stable/"
        );
        assert_eq!(
            page_url(Source::Framework, &parts("griptape-framework/structures/index")),
            "https://docs.griptape.ai/stable/griptape-framework/structures/"
        );
    }

    #[test]
    fn test_node_category_from_path() {
        assert_eq!(
            node_category(&parts("nodes/three_d/mesh_loader")),
            Some(NodeCategory::ThreeD)
        );
        assert_eq!(node_category(&parts("nodes/overview/index")), None);
        assert_eq!(node_category(&parts("nodes/sculpture/clay")), None);
        assert_eq!(node_category(&parts("guides/image/load_image")), None);
    }

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem("load_image"), "Load Image");
        assert_eq!(title_from_stem("prompt-drivers"), "Prompt Drivers");
        assert_eq!(
            breadcrumbs(&parts("griptape-framework/structures/agents")),
            vec!["Griptape Framework", "Structures"]
        );
    }

    #[test]
    fn test_build_requires_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            framework_dir: None,
            nodes_dir: None,
            output: dir.path().join("out.db"),
        };
        assert!(build_store(&opts).is_err());
    }

    #[test]
    fn test_node_description_falls_back_to_body() {
        let prose = parse_markdown("# Note\n\nLeaves a comment.\n\n- one\n");
        assert_eq!(node_description(&prose).as_deref(), Some("Leaves a comment."));

        let list = parse_markdown("# Note\n\n- one\n- two\n");
        assert_eq!(node_description(&list).as_deref(), Some("- one\n- two"));

        let long = parse_markdown(&format!("# Big\n\n```\n{}\n```\n", "x".repeat(900)));
        let description = node_description(&long).unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(description.starts_with("```"));

        assert_eq!(node_description(&parse_markdown("# Empty\n")), None);
    }

    #[test]
    fn test_staging_path_is_beside_output() {
        assert_eq!(
            staging_path(Path::new("/data/griptape.db")).unwrap(),
            PathBuf::from("/data/griptape.db.building")
        );
        assert!(staging_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_failed_build_keeps_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("agents.md"), "# Agents\n\nAgents run tasks.\n").unwrap();

        let output = dir.path().join("store.db");
        std::fs::write(&output, b"previous store").unwrap();
        // A directory in the staging slot makes the build fail before writing.
        std::fs::create_dir(staging_path(&output).unwrap()).unwrap();

        let opts = BuildOptions {
            framework_dir: Some(docs),
            nodes_dir: None,
            output: output.clone(),
        };
        assert!(build_store(&opts).is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"previous store");

        std::fs::remove_dir(staging_path(&output).unwrap()).unwrap();
        let stats = build_store(&opts).unwrap();
        assert_eq!(stats.pages, 1);
        assert!(!staging_path(&output).unwrap().exists());
        assert_ne!(std::fs::read(&output).unwrap(), b"previous store");
    }
}
