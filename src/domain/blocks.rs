//! The content-node model: the wire shape of a pre-fetched block tree.
//!
//! Trees arrive fully materialized from the upstream content service; this
//! module only describes their shape. Kinds the renderer does not know about
//! deserialize into [`BlockPayload::Unknown`] so a single exotic block never
//! poisons the surrounding tree.

use serde::{Deserialize, Serialize};

/// One node of the content tree. Children are owned, so the tree is acyclic
/// by construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentNode {
    pub id: String,
    #[serde(flatten)]
    pub payload: BlockPayload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    /// Rich-text runs of this node's primary text slot, if the kind has one.
    pub fn rich_text(&self) -> &[RichTextRun] {
        match &self.payload {
            BlockPayload::Heading1 { rich_text }
            | BlockPayload::Heading2 { rich_text }
            | BlockPayload::Heading3 { rich_text }
            | BlockPayload::Paragraph { rich_text }
            | BlockPayload::BulletedListItem { rich_text }
            | BlockPayload::NumberedListItem { rich_text }
            | BlockPayload::Toggle { rich_text }
            | BlockPayload::Quote { rich_text }
            | BlockPayload::Code { rich_text, .. }
            | BlockPayload::Callout { rich_text, .. } => rich_text,
            _ => &[],
        }
    }

    /// Concatenated plain text of the primary text slot.
    pub fn plain_text(&self) -> String {
        self.rich_text()
            .iter()
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Stable kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.payload {
            BlockPayload::Heading1 { .. } => "heading_1",
            BlockPayload::Heading2 { .. } => "heading_2",
            BlockPayload::Heading3 { .. } => "heading_3",
            BlockPayload::Paragraph { .. } => "paragraph",
            BlockPayload::BulletedListItem { .. } => "bulleted_list_item",
            BlockPayload::NumberedListItem { .. } => "numbered_list_item",
            BlockPayload::Image { .. } => "image",
            BlockPayload::Video { .. } => "video",
            BlockPayload::Embed { .. } => "embed",
            BlockPayload::Bookmark { .. } => "bookmark",
            BlockPayload::Toggle { .. } => "toggle",
            BlockPayload::Divider => "divider",
            BlockPayload::Quote { .. } => "quote",
            BlockPayload::Code { .. } => "code",
            BlockPayload::Callout { .. } => "callout",
            BlockPayload::ColumnList => "column_list",
            BlockPayload::Column => "column",
            BlockPayload::SyncedBlock { .. } => "synced_block",
            BlockPayload::Unknown => "unknown",
        }
    }
}

/// Kind-specific payload. Internally tagged on `type` to match the wire
/// format the fetch layer emits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPayload {
    #[serde(rename = "heading_1")]
    Heading1 {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    Paragraph {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    BulletedListItem {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    NumberedListItem {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    Image {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        caption: Vec<RichTextRun>,
    },
    Video {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        caption: Vec<RichTextRun>,
    },
    Embed {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        caption: Vec<RichTextRun>,
    },
    Bookmark {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        caption: Vec<RichTextRun>,
    },
    Toggle {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    Divider,
    Quote {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
    },
    Code {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
        #[serde(default)]
        language: String,
    },
    Callout {
        #[serde(default)]
        rich_text: Vec<RichTextRun>,
        #[serde(default)]
        icon: Option<String>,
    },
    ColumnList,
    Column,
    SyncedBlock {
        #[serde(default)]
        synced_from: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// A single annotated span of inline text.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RichTextRun {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl RichTextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations::default(),
            href: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_deserializes_without_failing_tree() {
        let raw = serde_json::json!([
            { "id": "a", "type": "paragraph", "rich_text": [{ "text": "hi" }] },
            { "id": "b", "type": "table_of_contents" },
            { "id": "c", "type": "divider" }
        ]);
        let nodes: Vec<ContentNode> = serde_json::from_value(raw).expect("tree parses");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1].payload, BlockPayload::Unknown));
        assert!(matches!(nodes[2].payload, BlockPayload::Divider));
    }

    #[test]
    fn plain_text_concatenates_runs() {
        let node: ContentNode = serde_json::from_value(serde_json::json!({
            "id": "a",
            "type": "heading_2",
            "rich_text": [
                { "text": "Design " },
                { "text": "Principles", "annotations": { "bold": true } }
            ]
        }))
        .expect("node parses");
        assert_eq!(node.plain_text(), "Design Principles");
    }

    #[test]
    fn children_nest_recursively() {
        let node: ContentNode = serde_json::from_value(serde_json::json!({
            "id": "outer",
            "type": "toggle",
            "rich_text": [{ "text": "More" }],
            "children": [
                { "id": "inner", "type": "paragraph", "rich_text": [{ "text": "Detail" }] }
            ]
        }))
        .expect("node parses");
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].plain_text(), "Detail");
    }
}
