use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

/// Deepest heading level that starts a new section; deeper headings are
/// kept as section text.
const MAX_SECTION_LEVEL: u8 = 4;

/// Fence language used when a fenced block names none.
const DEFAULT_FENCE_LANGUAGE: &str = "python";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub heading: String,
    pub level: u8,
    pub content: String,
    pub anchor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCodeBlock {
    /// Index into [`ParsedDoc::sections`] of the enclosing section.
    pub section: Option<usize>,
    pub language: String,
    pub code: String,
    /// Heading of the enclosing section.
    pub context: Option<String>,
}

/// A markdown document split into a title, heading-delimited sections and
/// fenced code blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    /// The full markdown source.
    pub content: String,
    /// First paragraph of prose, used as a summary.
    pub summary: Option<String>,
    pub sections: Vec<ParsedSection>,
    pub code_blocks: Vec<ParsedCodeBlock>,
}

/// Which text sink the parser is currently filling.
enum Capture {
    Heading(u8, String),
    Code(String, String),
    None,
}

/// Parses markdown source into a [`ParsedDoc`].
pub fn parse_markdown(source: &str) -> ParsedDoc {
    let mut doc = ParsedDoc {
        content: source.to_string(),
        ..ParsedDoc::default()
    };
    let mut capture = Capture::None;
    let mut body = String::new();
    let mut paragraph: Option<String> = None;

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let level = heading_level_to_u8(level);
                if level <= MAX_SECTION_LEVEL {
                    capture = Capture::Heading(level, String::new());
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Capture::Heading(level, text) = std::mem::replace(&mut capture, Capture::None)
                {
                    let text = text.trim().to_string();
                    if level == 1 && doc.title.is_none() {
                        doc.title = Some(text);
                        continue;
                    }
                    close_section(&mut doc, &mut body);
                    doc.sections.push(ParsedSection {
                        anchor: slugify(&text),
                        heading: text,
                        level,
                        content: String::new(),
                    });
                } else {
                    body.push('\n');
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|l| l.trim_matches(|c| c == '{' || c == '}' || c == '.'))
                        .filter(|l| !l.is_empty())
                        .unwrap_or(DEFAULT_FENCE_LANGUAGE)
                        .to_string(),
                    CodeBlockKind::Indented => "text".to_string(),
                };
                capture = Capture::Code(language, String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Capture::Code(language, code) = std::mem::replace(&mut capture, Capture::None)
                {
                    let code = code.trim_end_matches('\n').to_string();
                    if !code.trim().is_empty() {
                        let section = doc.sections.len().checked_sub(1);
                        let context = doc.sections.last().map(|s| s.heading.clone());
                        doc.code_blocks.push(ParsedCodeBlock {
                            section,
                            context,
                            language,
                            code,
                        });
                    }
                }
            }
            Event::Start(Tag::Paragraph) => {
                if doc.summary.is_none() {
                    paragraph = Some(String::new());
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if let Some(text) = paragraph.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        doc.summary = Some(text.to_string());
                    }
                }
                body.push('\n');
            }
            Event::End(TagEnd::Item | TagEnd::TableRow | TagEnd::BlockQuote(_)) => {
                body.push('\n');
            }
            Event::Text(text) | Event::Code(text) => match &mut capture {
                Capture::Heading(_, buf) | Capture::Code(_, buf) => buf.push_str(&text),
                Capture::None => {
                    body.push_str(&text);
                    if let Some(p) = paragraph.as_mut() {
                        p.push_str(&text);
                    }
                }
            },
            Event::SoftBreak | Event::HardBreak => match &mut capture {
                Capture::Heading(_, buf) => buf.push(' '),
                Capture::Code(_, buf) => buf.push('\n'),
                Capture::None => {
                    body.push('\n');
                    if let Some(p) = paragraph.as_mut() {
                        p.push(' ');
                    }
                }
            },
            _ => {}
        }
    }
    close_section(&mut doc, &mut body);
    doc
}

/// Moves accumulated prose into the last open section.
fn close_section(doc: &mut ParsedDoc, body: &mut String) {
    let text = normalize_blank_lines(body);
    body.clear();
    if let Some(section) = doc.sections.last_mut() {
        section.content = text;
    }
}

fn normalize_blank_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// URL fragment for a heading: lower-cased, punctuation dropped, spaces as `-`.
pub fn slugify(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Converts a pulldown_cmark HeadingLevel to a u8 (1-6).
fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT_DOC: &str = r#"# Agents

An Agent is the quickest way to get started.

## Creating an Agent

Pass tools to the constructor.

```python
from griptape.structures import Agent
agent = Agent()
```

### Memory

Agents keep a *conversation* memory.

##### Fine print

Not a section.

```
print("no language")
```
"#;

    #[test]
    fn test_title_and_sections() {
        let doc = parse_markdown(AGENT_DOC);
        assert_eq!(doc.title.as_deref(), Some("Agents"));
        assert_eq!(
            doc.summary.as_deref(),
            Some("An Agent is the quickest way to get started.")
        );
        let headings: Vec<(&str, u8)> = doc
            .sections
            .iter()
            .map(|s| (s.heading.as_str(), s.level))
            .collect();
        assert_eq!(headings, vec![("Creating an Agent", 2), ("Memory", 3)]);
        assert_eq!(doc.sections[0].anchor, "creating-an-agent");
        assert_eq!(doc.sections[0].content, "Pass tools to the constructor.");
        assert!(doc.sections[1].content.contains("conversation memory"));
        assert!(doc.sections[1].content.contains("Fine print"));
    }

    #[test]
    fn test_code_blocks_attach_to_sections() {
        let doc = parse_markdown(AGENT_DOC);
        assert_eq!(doc.code_blocks.len(), 2);

        let first = &doc.code_blocks[0];
        assert_eq!(first.language, "python");
        assert_eq!(first.section, Some(0));
        assert_eq!(first.context.as_deref(), Some("Creating an Agent"));
        assert_eq!(
            first.code,
            "from griptape.structures import Agent\nagent = Agent()"
        );

        let second = &doc.code_blocks[1];
        assert_eq!(second.language, DEFAULT_FENCE_LANGUAGE);
        assert_eq!(second.section, Some(1));
    }

    #[test]
    fn test_code_before_any_section() {
        let doc = parse_markdown("```bash\npip install griptape\n```\n");
        assert!(doc.title.is_none());
        assert!(doc.sections.is_empty());
        assert_eq!(doc.code_blocks[0].section, None);
        assert_eq!(doc.code_blocks[0].language, "bash");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Prompt Drivers"), "prompt-drivers");
        assert_eq!(slugify("What's new? (v1.2)"), "whats-new-v12");
        assert_eq!(slugify("  snake_case  heading "), "snake_case-heading");
    }
}
