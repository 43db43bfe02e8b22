//! The typed view tree produced by a render pass.
//!
//! View nodes are plain serializable data. Presentation concerns that need a
//! live runtime (viewport observation, rotation timers) are carried as
//! declarative specs ([`RevealMode`], [`RotationSpec`]) for the host surface
//! to execute.

use serde::Serialize;

use super::embed::EmbedTarget;
use super::media::ResolvedAsset;
use super::schedule::{RevealMode, RotationSpec};

/// Result of rendering one content tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub nodes: Vec<ViewNode>,
    /// Author-provided style text hoisted from leading plain/css code blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoisted_styles: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewNode {
    Heading {
        level: u8,
        html: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
    },
    Paragraph {
        html: String,
    },
    ListItem {
        ordered: bool,
        html: String,
        children: Vec<ViewNode>,
    },
    Figure {
        asset: ResolvedAsset,
        caption_html: String,
    },
    VideoPlayer {
        asset: ResolvedAsset,
        caption_html: String,
    },
    EmbedFrame {
        target: EmbedTarget,
        caption_html: String,
    },
    LinkCard {
        url: String,
        title_html: String,
    },
    Toggle {
        summary_html: String,
        children: Vec<ViewNode>,
    },
    Divider {
        full_bleed: bool,
    },
    Quote {
        html: String,
    },
    CodeBlock {
        language: String,
        text: String,
    },
    Callout {
        icon: String,
        html: String,
        children: Vec<ViewNode>,
    },
    Columns {
        tracks: Vec<ColumnTrack>,
    },
    Synced {
        children: Vec<ViewNode>,
    },
    SyncedRef {
        source_id: String,
    },
    Visibility {
        surface: Surface,
        html: String,
        children: Vec<ViewNode>,
    },
    SizeCapped {
        cap: WidthCap,
        html: String,
        children: Vec<ViewNode>,
    },
    ComparisonCard {
        role: ComparisonRole,
        html: String,
        children: Vec<ViewNode>,
    },
    GradientOverlay {
        reveal: RevealMode,
        html: String,
    },
    DownloadCard {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        title_html: String,
        detail: String,
    },
    LinkBlock {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        html: String,
    },
    Carousel {
        slides: Vec<Slide>,
        rotation: RotationSpec,
        reveal: RevealMode,
    },
    Rotator {
        faces: Vec<RotatorFace>,
        rotation: RotationSpec,
        reveal: RevealMode,
    },
    RotationStage {
        slides: Vec<Slide>,
        html: String,
        reveal: RevealMode,
    },
    StepArrow {
        html: String,
    },
    ScrollAnchor {
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
    },
    PrototypeFrame {
        variant: PrototypeVariant,
        #[serde(skip_serializing_if = "Option::is_none")]
        embed: Option<EmbedTarget>,
        html: String,
        reveal: RevealMode,
        children: Vec<ViewNode>,
    },
    Showcase {
        title: String,
        desc: String,
        slides: Vec<Slide>,
        reveal: RevealMode,
    },
}

/// One weighted column of a [`ViewNode::Columns`] layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTrack {
    pub weight: f64,
    pub children: Vec<ViewNode>,
}

/// A captioned media slot used by figures, carousels and showcases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub asset: ResolvedAsset,
    pub caption_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "face", rename_all = "snake_case")]
pub enum RotatorFace {
    Image { slide: Slide },
    Text { title: String, desc: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthCap {
    Narrow,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonRole {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeVariant {
    Web,
    Breakpoint,
    DesktopFix,
    DesktopScroll,
}
