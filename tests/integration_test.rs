/// End-to-end integration tests for griptape-docs-mcp.
///
/// Tests the complete flow:
///   markdown trees → build → open read-only → query service → validate
use griptape_docs_mcp::catalog::{NodeCategory, Scope};
use griptape_docs_mcp::config::SearchConfig;
use griptape_docs_mcp::db::DocStore;
use griptape_docs_mcp::error::QueryError;
use griptape_docs_mcp::ingest::{BuildOptions, BuildStats, build_store};
use griptape_docs_mcp::service::QueryService;
use griptape_docs_mcp::validate::{Thresholds, validate_store};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

const AGENTS_URL: &str = "https://docs.griptape.ai/stable/griptape-framework/structures/agents/";

const FRAMEWORK_DOCS: &[(&str, &str)] = &[
    (
        "index.md",
        "# Griptape Framework\n\nGriptape is a modular Python framework for building AI applications.\n",
    ),
    (
        "griptape-framework/structures/agents.md",
        r#"# Agents

An Agent is the quickest way to get started with Griptape.

## Creating an Agent

Agents take tools and rulesets.

```python
from griptape.structures import Agent
agent = Agent()
agent.run("Hello")
```

## Agent Memory

Agents remember the conversation.

## Streaming

Stream agent output as it is generated.
"#,
    ),
    (
        "griptape-framework/structures/pipelines.md",
        "# Pipelines\n\nA Pipeline runs tasks in order.\n\n## Tasks\n\nEach task hands its output to the next one.\n\n```python\nfrom griptape.structures import Pipeline\npipeline = Pipeline()\n```\n",
    ),
    (
        "griptape-framework/tools/calculator.md",
        "# Calculator Tool\n\nThe calculator lets an agent do math.\n\n## Usage\n\n```python\nfrom griptape.tools import CalculatorTool\nagent = Agent(tools=[CalculatorTool()])\n```\n",
    ),
    (
        "griptape-framework/drivers/prompt-drivers.md",
        "# Prompt Drivers\n\nPrompt drivers talk to LLM providers.\n\n## OpenAI\n\n```python\nfrom griptape.drivers.prompt.openai import OpenAiChatPromptDriver\ndriver = OpenAiChatPromptDriver(model=\"gpt-4o\")\n```\n",
    ),
    (
        "griptape-framework/engines/rag-engines.md",
        "# RAG Engines\n\nRAG engines retrieve context for generation.\n\n## Stages\n\nRetrieval, augmentation and response stages.\n",
    ),
    (
        "griptape-framework/data/artifacts.md",
        "# Artifacts\n\nArtifacts carry data between tasks.\n",
    ),
    (
        "griptape-framework/misc/events.md",
        "# Events\n\nEvents report what structures are doing.\n\n## Event Listeners\n\n```python\nfrom griptape.events import EventBus, EventListener\nEventBus.add_event_listeners([EventListener(print)])\n```\n",
    ),
    (
        "recipes/talk-to-a-pdf.md",
        "# Talk to a PDF\n\nLoad a PDF and ask an agent about it.\n\n```python\nfrom griptape.loaders import PdfLoader\n```\n",
    ),
];

/// `(category slug, file stem, title, description)`, one node per category.
const NODES: &[(&str, &str, &str, &str)] = &[
    ("agents", "agent", "Agent", "Runs a Griptape agent with tools and rulesets."),
    ("audio", "transcribe_audio", "TranscribeAudio", "Turns speech audio into text."),
    ("config", "openai_config", "OpenAiConfig", "Holds OpenAI credentials and model settings."),
    ("convert", "to_text", "ToText", "Converts any value to a string."),
    ("dict", "key_value_pair", "KeyValuePair", "Builds a dictionary entry."),
    ("execution", "start_flow", "StartFlow", "Marks where a flow begins."),
    ("image", "load_image", "LoadImage", "Loads an image from disk into the flow."),
    ("json", "json_extract_value", "JsonExtractValue", "Reads a value out of a JSON document."),
    ("lists", "create_list", "CreateList", "Collects inputs into a list."),
    ("misc", "note", "Note", "Leaves a comment on the canvas."),
    ("number", "add_numbers", "AddNumbers", "Adds two numbers together."),
    ("rules", "ruleset", "Ruleset", "Groups rules that steer a prompt."),
    ("text", "text_input", "TextInput", "Provides a block of text to other nodes."),
    ("three_d", "mesh_viewer", "MeshViewer", "Displays a mesh in the viewport."),
    ("tools", "calculator_tool", "CalculatorTool", "Gives an agent a calculator."),
    ("video", "save_video", "SaveVideo", "Writes a video file to disk."),
    (
        "advanced_media_library",
        "flux_image_generation",
        "FluxImageGeneration",
        "Generates an image with Flux models.",
    ),
];

struct Fixture {
    _dir: TempDir,
    db_path: PathBuf,
    stats: BuildStats,
}

fn write_tree(root: &Path, files: &[(String, String)]) {
    for (rel, body) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
}

/// Writes both markdown trees and builds a store from them.
fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let framework_dir = dir.path().join("framework");
    let nodes_dir = dir.path().join("nodes-docs");

    let framework: Vec<(String, String)> = FRAMEWORK_DOCS
        .iter()
        .map(|(p, b)| ((*p).to_string(), (*b).to_string()))
        .collect();
    write_tree(&framework_dir, &framework);

    let mut nodes = vec![
        (
            "index.md".to_string(),
            "# Griptape Nodes\n\nGriptape Nodes is a visual editor for AI workflows.\n".to_string(),
        ),
        (
            "nodes/overview/index.md".to_string(),
            "# Node Reference\n\nEvery node, grouped by category.\n".to_string(),
        ),
    ];
    for (slug, stem, title, description) in NODES {
        let mut body = format!(
            "# {title}\n\n{description}\n\n## Parameters\n\nvalue: the input of {title}.\n"
        );
        if *slug == "agents" {
            body.push_str(
                "\n## Example\n\n```python\nagent_node = Agent(prompt=\"Summarize this\")\n```\n",
            );
        }
        nodes.push((format!("nodes/{slug}/{stem}.md"), body));
    }
    write_tree(&nodes_dir, &nodes);

    let db_path = dir.path().join("griptape.db");
    let stats = build_store(&BuildOptions {
        framework_dir: Some(framework_dir),
        nodes_dir: Some(nodes_dir),
        output: db_path.clone(),
    })
    .unwrap();

    Fixture {
        _dir: dir,
        db_path,
        stats,
    }
}

fn service(fx: &Fixture) -> QueryService {
    let store = DocStore::open(&fx.db_path).unwrap();
    QueryService::new(Arc::new(store), SearchConfig::default())
}

/// Build counts: framework + nodes trees, one node per category file.
#[test]
fn test_build_stats() {
    let fx = fixture();
    assert_eq!(fx.stats.pages, FRAMEWORK_DOCS.len() + NODES.len() + 2);
    assert_eq!(fx.stats.nodes, NODES.len());
    assert_eq!(fx.stats.skipped, 0);
    assert!(fx.stats.code_examples >= 7);
}

/// all-scope results come from the per-source results; scores never increase.
#[test]
fn test_search_docs_scope_subset_and_order() {
    let fx = fixture();
    let svc = service(&fx);

    for q in ["agent", "image", "python framework", "drivers", "tasks data"] {
        let all = svc.search_docs(q, Scope::All, Some(50)).unwrap();
        let framework = svc.search_docs(q, Scope::Framework, Some(50)).unwrap();
        let nodes = svc.search_docs(q, Scope::Nodes, Some(50)).unwrap();

        let union: HashSet<i64> = framework.iter().chain(nodes.iter()).map(|h| h.id).collect();
        for hit in &all {
            assert!(union.contains(&hit.id), "{q}: {} not in per-scope results", hit.url);
        }
        for pair in all.windows(2) {
            assert!(pair[0].score >= pair[1].score, "{q}: scores out of order");
        }
        assert!(framework.iter().all(|h| h.url.starts_with("https://docs.griptape.ai/")));
        assert!(
            nodes
                .iter()
                .all(|h| h.url.starts_with("https://docs.griptapenodes.com/"))
        );
    }
}

#[test]
fn test_search_docs_snippet_and_limit() {
    let fx = fixture();
    let svc = service(&fx);

    let hits = svc.search_docs("agent", Scope::Framework, Some(2)).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|h| h.snippet.as_deref().unwrap_or("").contains(">>>")));
}

#[test]
fn test_empty_queries_are_invalid() {
    let fx = fixture();
    let svc = service(&fx);

    for q in ["", "   "] {
        assert!(matches!(
            svc.search_docs(q, Scope::All, None),
            Err(QueryError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.search_nodes(q, None, None),
            Err(QueryError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.get_code_examples(q, None),
            Err(QueryError::InvalidInput(_))
        ));
        assert!(matches!(svc.get_page(q), Err(QueryError::InvalidInput(_))));
        assert!(matches!(
            svc.get_node_details(q),
            Err(QueryError::InvalidInput(_))
        ));
    }
    assert!(Scope::parse("everything").is_err());
}

#[test]
fn test_no_alphanumeric_terms_is_empty_not_error() {
    let fx = fixture();
    let svc = service(&fx);
    assert!(svc.search_docs("?! --", Scope::All, None).unwrap().is_empty());
}

#[test]
fn test_get_page_sections_in_order() {
    let fx = fixture();
    let svc = service(&fx);

    let page = svc.get_page(AGENTS_URL).unwrap();
    assert_eq!(page.title, "Agents");
    assert_eq!(page.breadcrumbs, vec!["Griptape Framework", "Structures"]);
    let headings: Vec<&str> = page.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Creating an Agent", "Agent Memory", "Streaming"]);
    let positions: Vec<i64> = page.sections.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(page.sections[0].anchor.as_deref(), Some("creating-an-agent"));
    assert_eq!(page.sections[0].code_examples.len(), 1);
    assert!(page.last_modified.is_some());
}

#[test]
fn test_get_page_locators() {
    let fx = fixture();
    let svc = service(&fx);
    let id = svc.get_page(AGENTS_URL).unwrap().id;

    // Trailing slash toggled.
    assert_eq!(svc.get_page(AGENTS_URL.trim_end_matches('/')).unwrap().id, id);
    // Exact title, any case.
    assert_eq!(svc.get_page("agents").unwrap().id, id);
    // Substring of a title.
    assert_eq!(svc.get_page("prompt driver").unwrap().title, "Prompt Drivers");
    // Misspelled title.
    assert_eq!(svc.get_page("Pipelnes").unwrap().title, "Pipelines");

    // Code before any heading stays on the page.
    let recipe = svc.get_page("Talk to a PDF").unwrap();
    assert!(recipe.sections.is_empty());
    assert_eq!(recipe.code_examples.len(), 1);
}

#[test]
fn test_get_page_not_found() {
    let fx = fixture();
    let svc = service(&fx);
    assert!(matches!(
        svc.get_page("does-not-exist"),
        Err(QueryError::NotFound(_))
    ));
    assert!(matches!(
        svc.get_page("https://docs.griptape.ai/stable/nope/"),
        Err(QueryError::NotFound(_))
    ));
}

#[test]
fn test_list_categories_counts() {
    let fx = fixture();
    let svc = service(&fx);
    let cats = svc.list_categories().unwrap();
    let stats = DocStore::open(&fx.db_path).unwrap().stats().unwrap();

    assert_eq!(cats.framework_sections.len(), 8);
    assert_eq!(cats.node_categories.len(), 17);
    assert_eq!(
        cats.framework_sections.iter().map(|c| c.count).sum::<u64>(),
        stats.framework_pages
    );
    assert_eq!(
        cats.node_categories.iter().map(|c| c.count).sum::<u64>(),
        stats.nodes
    );
    assert_eq!(cats.framework_sections[0].category, "Structures");
    assert_eq!(cats.framework_sections[0].count, 2);

    let names: HashSet<&str> = cats.node_categories.iter().map(|c| c.category.as_str()).collect();
    for category in NodeCategory::ALL {
        assert!(names.contains(category.display_name()), "missing {category}");
    }
}

#[test]
fn test_read_operations_are_idempotent() {
    let fx = fixture();
    let svc = service(&fx);

    let twice = |f: &dyn Fn() -> String| assert_eq!(f(), f());
    twice(&|| serde_json::to_string(&svc.search_docs("agent", Scope::All, None).unwrap()).unwrap());
    twice(&|| serde_json::to_string(&svc.get_page(AGENTS_URL).unwrap()).unwrap());
    twice(&|| serde_json::to_string(&svc.search_nodes("image", None, None).unwrap()).unwrap());
    twice(&|| serde_json::to_string(&svc.get_node_details("Agent").unwrap()).unwrap());
    twice(&|| serde_json::to_string(&svc.list_categories().unwrap()).unwrap());
    twice(&|| serde_json::to_string(&svc.get_code_examples("agent", None).unwrap()).unwrap());
}

#[test]
fn test_agent_node_details() {
    let fx = fixture();
    let svc = service(&fx);

    let node = svc.get_node_details("Agent").unwrap();
    assert_eq!(node.name, "Agent");
    assert_eq!(node.category, "Agents");
    assert!(!node.description.as_deref().unwrap_or("").is_empty());
    assert!(node.documentation.is_some());
    assert_eq!(node.code_examples.len(), 1);
    assert!(
        node.url
            .as_deref()
            .unwrap()
            .ends_with("/nodes/agents/agent/")
    );

    let cats = svc.list_categories().unwrap();
    let agents = cats
        .node_categories
        .iter()
        .find(|c| c.category == "Agents")
        .unwrap();
    assert_eq!(agents.count, 1);

    // By id.
    assert_eq!(svc.get_node_details(&node.id.to_string()).unwrap().name, "Agent");
}

#[test]
fn test_node_name_resolution() {
    let fx = fixture();
    let svc = service(&fx);

    assert_eq!(svc.get_node_details("Load Image").unwrap().name, "LoadImage");
    assert_eq!(svc.get_node_details("loadimage").unwrap().name, "LoadImage");
    assert_eq!(svc.get_node_details("MeshVeiwer").unwrap().name, "MeshViewer");
    assert!(matches!(
        svc.get_node_details("QuantumEntangler"),
        Err(QueryError::NotFound(_))
    ));
}

#[test]
fn test_search_nodes_category_filter() {
    let fx = fixture();
    let svc = service(&fx);

    let hits = svc.search_nodes("Load Image", None, None).unwrap();
    assert_eq!(hits[0].name, "LoadImage");

    let hits = svc
        .search_nodes("image", Some("advanced media library"), None)
        .unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["FluxImageGeneration"]);

    let hits = svc.search_nodes("mesh", Some("3D"), None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "3D");

    assert!(matches!(
        svc.search_nodes("image", Some("Sculpture"), None),
        Err(QueryError::InvalidInput(_))
    ));
}

#[test]
fn test_search_nodes_by_category_name() {
    let fx = fixture();
    let svc = service(&fx);

    let hits = svc.search_nodes("misc", None, None).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Note"]);

    let hits = svc.search_nodes("3d", None, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "MeshViewer");
}

#[test]
fn test_out_of_range_limits_are_invalid() {
    let fx = fixture();
    let svc = service(&fx);

    for limit in [-1, 0, 51] {
        assert!(matches!(
            svc.search_nodes("image", None, Some(limit)),
            Err(QueryError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.get_code_examples("agent", Some(limit)),
            Err(QueryError::InvalidInput(_))
        ));
    }
}

#[test]
fn test_typo_tolerant_search() {
    let fx = fixture();
    let svc = service(&fx);

    let hits = svc.search_docs("agnet", Scope::Framework, None).unwrap();
    assert!(hits.iter().any(|h| h.title == "Agents"), "got {hits:?}");

    // An uncorrectable term still has to match.
    let hits = svc.search_docs("agnet qqqqqqq", Scope::All, None).unwrap();
    assert!(hits.is_empty(), "got {hits:?}");
}

#[test]
fn test_code_examples_round_trip() {
    let fx = fixture();
    let svc = service(&fx);

    for topic in ["agent", "prompt driver", "event listeners", "pipeline"] {
        let examples = svc.get_code_examples(topic, None).unwrap();
        assert!(!examples.is_empty(), "no examples for {topic}");

        let ids: HashSet<i64> = examples.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), examples.len(), "{topic}: duplicate examples");

        for example in &examples {
            let page = svc.get_page(&example.url).unwrap();
            assert_eq!(page.id, example.page_id);
            assert!(
                page.all_code_examples().any(|c| c.code == example.code),
                "{topic}: code not on its page"
            );
            if let Some(node) = &example.node {
                let details = svc.get_node_details(&node.id.to_string()).unwrap();
                assert!(details.code_examples.iter().any(|c| c.code == example.code));
            }
        }
    }

    let capped = svc.get_code_examples("python", Some(2)).unwrap();
    assert!(capped.len() <= 2);
}

#[test]
fn test_validate_built_store() {
    let fx = fixture();
    let report = validate_store(&fx.db_path, &Thresholds::non_empty());
    assert!(report.passed(), "{report}");

    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty.db");
    fs::write(&empty, b"").unwrap();
    assert!(!validate_store(&empty, &Thresholds::non_empty()).passed());
}

#[test]
fn test_rebuild_replaces_store() {
    let fx = fixture();
    let dir = tempdir().unwrap();
    let docs = dir.path().join("docs");
    write_tree(
        &docs,
        &[("only.md".to_string(), "# Only Page\n\nJust one.\n".to_string())],
    );

    let stats = build_store(&BuildOptions {
        framework_dir: Some(docs),
        nodes_dir: None,
        output: fx.db_path.clone(),
    })
    .unwrap();
    assert_eq!(stats.pages, 1);

    let store = DocStore::open(&fx.db_path).unwrap();
    assert_eq!(store.stats().unwrap().pages(), 1);
}
