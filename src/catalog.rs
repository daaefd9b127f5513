/// Fixed vocabularies of the corpus: page sources, search scopes, the node
/// category set and the framework section grouping.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueryError;

/// Which documentation site a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Framework,
    Nodes,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Framework => "framework",
            Self::Nodes => "nodes",
        }
    }

    /// Parse the stored column value. Unknown values are treated as framework
    /// pages so that a newer store never breaks reads.
    #[must_use]
    pub fn from_column(value: &str) -> Self {
        if value.eq_ignore_ascii_case("nodes") {
            Self::Nodes
        } else {
            Self::Framework
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corpus filter for `search_docs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    Framework,
    Nodes,
    #[default]
    All,
}

impl Scope {
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "framework" => Ok(Self::Framework),
            "nodes" => Ok(Self::Nodes),
            "all" | "" => Ok(Self::All),
            other => Err(QueryError::invalid(format!(
                "scope must be 'framework', 'nodes', or 'all', got '{other}'"
            ))),
        }
    }

    /// The page source this scope restricts to, if any.
    #[must_use]
    pub fn source(self) -> Option<Source> {
        match self {
            Self::Framework => Some(Source::Framework),
            Self::Nodes => Some(Source::Nodes),
            Self::All => None,
        }
    }
}

/// The 17 node categories of the Griptape Nodes catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Agents,
    Audio,
    Config,
    Convert,
    Dict,
    Execution,
    Image,
    Json,
    Lists,
    Misc,
    Number,
    Rules,
    Text,
    ThreeD,
    Tools,
    Video,
    AdvancedMediaLibrary,
}

impl NodeCategory {
    pub const ALL: [Self; 17] = [
        Self::Agents,
        Self::Audio,
        Self::Config,
        Self::Convert,
        Self::Dict,
        Self::Execution,
        Self::Image,
        Self::Json,
        Self::Lists,
        Self::Misc,
        Self::Number,
        Self::Rules,
        Self::Text,
        Self::ThreeD,
        Self::Tools,
        Self::Video,
        Self::AdvancedMediaLibrary,
    ];

    /// Name as stored in `nodes.category` and shown to clients.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Agents => "Agents",
            Self::Audio => "Audio",
            Self::Config => "Config",
            Self::Convert => "Convert",
            Self::Dict => "Dict",
            Self::Execution => "Execution",
            Self::Image => "Image",
            Self::Json => "JSON",
            Self::Lists => "Lists",
            Self::Misc => "Misc",
            Self::Number => "Number",
            Self::Rules => "Rules",
            Self::Text => "Text",
            Self::ThreeD => "3D",
            Self::Tools => "Tools",
            Self::Video => "Video",
            Self::AdvancedMediaLibrary => "Advanced Media Library",
        }
    }

    /// Directory / URL path segment used by the nodes docs site.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Audio => "audio",
            Self::Config => "config",
            Self::Convert => "convert",
            Self::Dict => "dict",
            Self::Execution => "execution",
            Self::Image => "image",
            Self::Json => "json",
            Self::Lists => "lists",
            Self::Misc => "misc",
            Self::Number => "number",
            Self::Rules => "rules",
            Self::Text => "text",
            Self::ThreeD => "three_d",
            Self::Tools => "tools",
            Self::Video => "video",
            Self::AdvancedMediaLibrary => "advanced_media_library",
        }
    }

    /// Look up a category by display name or slug, case-insensitively.
    #[must_use]
    pub fn lookup(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|c| {
            c.display_name().eq_ignore_ascii_case(value) || c.slug().eq_ignore_ascii_case(value)
        })
    }

    pub fn parse(value: &str) -> Result<Self, QueryError> {
        Self::lookup(value).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|c| c.display_name()).collect();
            QueryError::invalid(format!(
                "unknown node category '{}' (expected one of: {})",
                value.trim(),
                known.join(", ")
            ))
        })
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Grouping of framework pages, derived from the page URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkSection {
    Structures,
    Tools,
    Drivers,
    Engines,
    Data,
    Misc,
    Recipes,
    Other,
}

impl FrameworkSection {
    /// URL segment per section, checked in order; first match wins.
    const URL_SEGMENTS: [(&'static str, Self); 7] = [
        ("/structures/", Self::Structures),
        ("/tools/", Self::Tools),
        ("/drivers/", Self::Drivers),
        ("/engines/", Self::Engines),
        ("/data/", Self::Data),
        ("/misc/", Self::Misc),
        ("/recipes/", Self::Recipes),
    ];

    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self::URL_SEGMENTS
            .iter()
            .find(|(segment, _)| url.contains(segment))
            .map_or(Self::Other, |(_, section)| *section)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Structures => "Structures",
            Self::Tools => "Tools",
            Self::Drivers => "Drivers",
            Self::Engines => "Engines",
            Self::Data => "Data",
            Self::Misc => "Misc",
            Self::Recipes => "Recipes",
            Self::Other => "Other",
        }
    }
}
