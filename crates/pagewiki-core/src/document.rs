//! Editor integration seam
//!
//! The store never interprets a page's document. It consumes a
//! [`DocumentProjection`] derived by the editor integration: the serialized
//! document plus the plain-text and markdown projections and the ids of the
//! image attachments the document embeds.
//!
//! [`JsonDocument`] is a small node tree that implements [`Document`] so the
//! command line and the tests have a real document to work with.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::page::PageId;

/// Maximum number of characters kept when deriving a title
pub const MAX_TITLE_CHARS: usize = 100;

/// Everything the store derives from a document on save
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentProjection {
    pub serialized: String,
    pub plain_text: String,
    pub markdown: String,
    pub image_ids: BTreeSet<i64>,
}

impl DocumentProjection {
    /// Title derived from the first line of the plain text
    pub fn title(&self) -> Option<String> {
        derive_title(&self.plain_text)
    }
}

/// Implemented by the editor integration for its document type
pub trait Document {
    fn project(&self) -> Result<DocumentProjection>;
}

impl Document for DocumentProjection {
    fn project(&self) -> Result<DocumentProjection> {
        Ok(self.clone())
    }
}

/// First line of `plain_text`, trimmed and truncated to [`MAX_TITLE_CHARS`]
/// characters. A blank first line means no title.
pub fn derive_title(plain_text: &str) -> Option<String> {
    let first = plain_text.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.chars().take(MAX_TITLE_CHARS).collect())
}

static INVALID_FILENAME_CHARS: OnceLock<Regex> = OnceLock::new();

/// Replace path separators, colons, quotes and spaces with underscores
pub fn sanitize_filename(name: &str) -> String {
    let re = INVALID_FILENAME_CHARS
        .get_or_init(|| Regex::new(r#"[/\\:" ]"#).expect("static filename regex"));
    re.replace_all(name, "_").into_owned()
}

/// Export slug for a page: `"{id}_{sanitized-title}.md"`
pub fn page_filename(id: PageId, title: Option<&str>) -> String {
    format!("{}_{}.md", id, sanitize_filename(title.unwrap_or("")))
}

/// A node of a [`JsonDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Paragraph {
        #[serde(default)]
        children: Vec<Node>,
    },
    Heading {
        #[serde(default = "default_heading_level")]
        level: u8,
        #[serde(default)]
        children: Vec<Node>,
    },
    Quote {
        #[serde(default)]
        children: Vec<Node>,
    },
    #[serde(rename = "listitem")]
    ListItem {
        #[serde(default)]
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
    #[serde(rename = "linebreak")]
    LineBreak,
    Image {
        id: i64,
        #[serde(default)]
        alt: String,
    },
    #[serde(rename = "pagelink")]
    PageLink {
        #[serde(rename = "pageId")]
        page_id: PageId,
        text: String,
    },
}

fn default_heading_level() -> u8 {
    1
}

impl Node {
    fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::Quote { children }
            | Node::ListItem { children } => children,
            _ => &[],
        }
    }

    fn inline_text(&self) -> String {
        match self {
            Node::Text { text } => text.clone(),
            Node::LineBreak => "\n".to_string(),
            Node::PageLink { text, .. } => text.clone(),
            Node::Image { .. } => String::new(),
            _ => self.children().iter().map(Node::inline_text).collect(),
        }
    }

    fn inline_markdown(&self) -> String {
        match self {
            Node::Text { text } => text.clone(),
            Node::LineBreak => "\n".to_string(),
            Node::PageLink { page_id, text } => format!("[{}](page:{})", text, page_id),
            Node::Image { id, alt } => format!("![{}](image:{})", alt, id),
            _ => self.children().iter().map(Node::inline_markdown).collect(),
        }
    }

    fn block_markdown(&self) -> String {
        let inner: String = self.children().iter().map(Node::inline_markdown).collect();
        match self {
            Node::Heading { level, .. } => {
                format!("{} {}", "#".repeat((*level).clamp(1, 6) as usize), inner)
            }
            Node::Quote { .. } => format!("> {}", inner),
            Node::ListItem { .. } => format!("- {}", inner),
            Node::Paragraph { .. } => inner,
            inline => inline.inline_markdown(),
        }
    }

    fn collect_image_ids(&self, ids: &mut BTreeSet<i64>) {
        if let Node::Image { id, .. } = self {
            ids.insert(*id);
        }
        for child in self.children() {
            child.collect_image_ids(ids);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct Root {
    #[serde(default)]
    children: Vec<Node>,
}

/// Minimal rich document: a root holding block nodes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JsonDocument {
    root: Root,
}

impl JsonDocument {
    pub fn new(blocks: Vec<Node>) -> Self {
        JsonDocument {
            root: Root { children: blocks },
        }
    }

    /// One paragraph per input line
    pub fn from_plain_text(text: &str) -> Self {
        let blocks = text
            .lines()
            .map(|line| Node::Paragraph {
                children: if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::Text {
                        text: line.to_string(),
                    }]
                },
            })
            .collect();
        Self::new(blocks)
    }

    /// Parse a serialized document as stored in a page row
    pub fn parse(serialized: &str) -> Result<Self> {
        Ok(serde_json::from_str(serialized)?)
    }

    pub fn blocks(&self) -> &[Node] {
        &self.root.children
    }

    /// Append a block, e.g. an image node after an upload
    pub fn push(&mut self, block: Node) {
        self.root.children.push(block);
    }

    pub fn plain_text(&self) -> String {
        self.blocks()
            .iter()
            .map(Node::inline_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn markdown(&self) -> String {
        self.blocks()
            .iter()
            .map(Node::block_markdown)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Ids of every image node, found by walking the whole tree
    pub fn image_ids(&self) -> BTreeSet<i64> {
        let mut ids = BTreeSet::new();
        for block in self.blocks() {
            block.collect_image_ids(&mut ids);
        }
        ids
    }
}

impl Document for JsonDocument {
    fn project(&self) -> Result<DocumentProjection> {
        Ok(DocumentProjection {
            serialized: serde_json::to_string(self)?,
            plain_text: self.plain_text(),
            markdown: self.markdown(),
            image_ids: self.image_ids(),
        })
    }
}
