//! Recursive tree walker: content nodes in, view nodes out.
//!
//! Every node kind has exactly one renderer. Unrenderable nodes (unknown
//! kind, missing payload) yield nothing and never abort their siblings.
//! Callouts take a second dispatch step through the directive handler
//! registry; children go through the same path as top-level nodes.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::domain::blocks::{BlockPayload, ContentNode, RichTextRun};

use super::RenderContext;
use super::directive::{self, Directive, DirectiveConfig};
use super::embed::{self, EmbedTarget};
use super::schedule::{MIN_ROTATION_SLOTS, RevealMode, RotationSpec, extend_round_robin};
use super::text::format_runs;
use super::view::{
    ColumnTrack, ComparisonRole, PrototypeVariant, RenderOutput, RotatorFace, Slide, Surface,
    ViewNode, WidthCap,
};

/// Code-block languages whose leading blocks hoist into page styles.
const STYLE_LANGUAGES: &[&str] = &["", "plain text", "plaintext", "css", "scss", "less"];

const DEFAULT_CALLOUT_ICON: &str = "💡";

/// Render one content tree with the given pass context.
pub fn render_tree(nodes: &[ContentNode], ctx: &mut RenderContext) -> RenderOutput {
    let (hoisted_styles, rest) = hoist_leading_styles(nodes);
    let mut walker = Walker { ctx };
    let rendered = walker.render_nodes(rest);
    RenderOutput {
        nodes: rendered,
        hoisted_styles,
    }
}

/// Concatenate consecutive style-bearing code blocks at the top of the pass.
/// The scan stops at the first node that is not one.
fn hoist_leading_styles(nodes: &[ContentNode]) -> (Option<String>, &[ContentNode]) {
    let mut buffer = String::new();
    let mut consumed = 0usize;
    for node in nodes {
        let BlockPayload::Code { language, .. } = &node.payload else {
            break;
        };
        if !STYLE_LANGUAGES.contains(&language.to_ascii_lowercase().as_str()) {
            break;
        }
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&node.plain_text());
        consumed += 1;
    }
    if consumed == 0 {
        (None, nodes)
    } else {
        (Some(buffer), &nodes[consumed..])
    }
}

pub(crate) struct Walker<'a> {
    ctx: &'a mut RenderContext,
}

struct DirectiveScope<'a> {
    directive: Directive,
    node: &'a ContentNode,
    body: &'a [RichTextRun],
    config: &'a DirectiveConfig,
    prev_id: Option<&'a str>,
}

type Handler = fn(&mut Walker<'_>, &DirectiveScope<'_>) -> Option<ViewNode>;

static HANDLERS: Lazy<HashMap<Directive, Handler>> = Lazy::new(|| {
    let mut map: HashMap<Directive, Handler> = HashMap::new();
    map.insert(Directive::DesktopOnly, visibility_section);
    map.insert(Directive::MobileOnly, visibility_section);
    map.insert(Directive::Narrow, size_capped_section);
    map.insert(Directive::Medium, size_capped_section);
    map.insert(Directive::BeforeCard, comparison_card);
    map.insert(Directive::AfterCard, comparison_card);
    map.insert(Directive::Gradient, gradient_overlay);
    map.insert(Directive::GradientSync, gradient_overlay);
    map.insert(Directive::FullBleed, full_bleed_divider);
    map.insert(Directive::Download, download_card);
    map.insert(Directive::Link, link_block);
    map.insert(Directive::Slide, slide_carousel);
    map.insert(Directive::Circle, circle_rotator);
    map.insert(Directive::Rotation, rotation_stage);
    map.insert(Directive::Arrow, step_arrow);
    map.insert(Directive::Anchor, scroll_anchor);
    map.insert(Directive::PrototypeWeb, prototype_frame);
    map.insert(Directive::PrototypeBreakpoint, prototype_frame);
    map.insert(Directive::PrototypeDesktopFix, prototype_frame);
    map.insert(Directive::PrototypeDesktopScroll, prototype_frame);
    map.insert(Directive::Showcase, showcase_section);
    map
});

impl Walker<'_> {
    fn render_nodes(&mut self, nodes: &[ContentNode]) -> Vec<ViewNode> {
        let mut rendered = Vec::with_capacity(nodes.len());
        let mut prev_id: Option<&str> = None;
        for node in nodes {
            if let Some(view) = self.render_node(node, prev_id) {
                rendered.push(view);
            }
            prev_id = Some(node.id.as_str());
        }
        rendered
    }

    fn render_node(&mut self, node: &ContentNode, prev_id: Option<&str>) -> Option<ViewNode> {
        match &node.payload {
            BlockPayload::Heading1 { rich_text } => self.heading(node, 1, rich_text),
            BlockPayload::Heading2 { rich_text } => self.heading(node, 2, rich_text),
            BlockPayload::Heading3 { rich_text } => self.heading(node, 3, rich_text),
            BlockPayload::Paragraph { rich_text } => Some(ViewNode::Paragraph {
                html: format_runs(rich_text),
            }),
            BlockPayload::BulletedListItem { rich_text } => Some(ViewNode::ListItem {
                ordered: false,
                html: format_runs(rich_text),
                children: self.render_nodes(&node.children),
            }),
            BlockPayload::NumberedListItem { rich_text } => Some(ViewNode::ListItem {
                ordered: true,
                html: format_runs(rich_text),
                children: self.render_nodes(&node.children),
            }),
            BlockPayload::Image { url, caption } => {
                let url = url.as_deref().filter(|u| !u.is_empty())?;
                Some(ViewNode::Figure {
                    asset: self.ctx.resolver().resolve(url, &node.id),
                    caption_html: format_runs(caption),
                })
            }
            BlockPayload::Video { url, caption } => {
                let url = url.as_deref().filter(|u| !u.is_empty())?;
                Some(ViewNode::VideoPlayer {
                    asset: self.ctx.resolver().resolve(url, &node.id),
                    caption_html: format_runs(caption),
                })
            }
            BlockPayload::Embed { url, caption } => {
                let url = url.as_deref().filter(|u| !u.is_empty())?;
                Some(ViewNode::EmbedFrame {
                    target: embed::normalize(url),
                    caption_html: format_runs(caption),
                })
            }
            BlockPayload::Bookmark { url, caption } => {
                let url = url.as_deref().filter(|u| !u.is_empty())?;
                let title_html = if caption.is_empty() {
                    format_runs(&[RichTextRun::plain(url)])
                } else {
                    format_runs(caption)
                };
                Some(ViewNode::LinkCard {
                    url: url.to_string(),
                    title_html,
                })
            }
            BlockPayload::Toggle { rich_text } => Some(ViewNode::Toggle {
                summary_html: format_runs(rich_text),
                children: self.render_nodes(&node.children),
            }),
            BlockPayload::Divider => Some(ViewNode::Divider { full_bleed: false }),
            BlockPayload::Quote { rich_text } => Some(ViewNode::Quote {
                html: format_runs(rich_text),
            }),
            BlockPayload::Code { language, .. } => Some(ViewNode::CodeBlock {
                language: language.clone(),
                text: node.plain_text(),
            }),
            BlockPayload::Callout { rich_text, icon } => {
                self.render_callout(node, rich_text, icon.as_deref(), prev_id)
            }
            BlockPayload::ColumnList => self.render_columns(node),
            BlockPayload::Column => {
                // Columns are only meaningful under a column_list.
                debug!(
                    target = "vitrine::render",
                    id = %node.id,
                    "skipping stray column node"
                );
                None
            }
            BlockPayload::SyncedBlock { synced_from } => match synced_from {
                Some(source_id) => Some(ViewNode::SyncedRef {
                    source_id: source_id.clone(),
                }),
                None => Some(ViewNode::Synced {
                    children: self.render_nodes(&node.children),
                }),
            },
            BlockPayload::Unknown => {
                debug!(
                    target = "vitrine::render",
                    id = %node.id,
                    "skipping node of unknown kind"
                );
                None
            }
        }
    }

    fn heading(&mut self, node: &ContentNode, level: u8, runs: &[RichTextRun]) -> Option<ViewNode> {
        let text = node.plain_text();
        let anchor = self.ctx.anchors_mut().allocate(&text, &node.id);
        Some(ViewNode::Heading {
            level,
            html: format_runs(runs),
            anchor,
        })
    }

    fn render_callout(
        &mut self,
        node: &ContentNode,
        runs: &[RichTextRun],
        icon: Option<&str>,
        prev_id: Option<&str>,
    ) -> Option<ViewNode> {
        if let Some(parsed) = directive::parse(runs, icon) {
            let body = directive::strip_tag_run(runs, &parsed.matched_run);
            let scope = DirectiveScope {
                directive: parsed.directive,
                node,
                body: &body,
                config: &parsed.config,
                prev_id,
            };
            return match HANDLERS.get(&parsed.directive) {
                Some(handler) => handler(self, &scope),
                None => {
                    debug!(
                        target = "vitrine::render",
                        tag = parsed.directive.tag(),
                        "directive without handler"
                    );
                    None
                }
            };
        }

        Some(ViewNode::Callout {
            icon: icon.unwrap_or(DEFAULT_CALLOUT_ICON).to_string(),
            html: format_runs(runs),
            children: self.render_nodes(&node.children),
        })
    }

    fn render_columns(&mut self, node: &ContentNode) -> Option<ViewNode> {
        let columns: Vec<&ContentNode> = node
            .children
            .iter()
            .filter(|child| matches!(child.payload, BlockPayload::Column))
            .collect();
        if columns.is_empty() {
            return None;
        }
        let tracks = columns
            .into_iter()
            .map(|column| {
                let (weight, children) = split_column_weight(&column.children);
                ColumnTrack {
                    weight,
                    children: self.render_nodes(&children),
                }
            })
            .collect();
        Some(ViewNode::Columns { tracks })
    }

    fn image_slides(&mut self, children: &[ContentNode]) -> Vec<Slide> {
        children
            .iter()
            .filter_map(|child| match &child.payload {
                BlockPayload::Image {
                    url: Some(url),
                    caption,
                } if !url.is_empty() => Some(Slide {
                    asset: self.ctx.resolver().resolve(url, &child.id),
                    caption_html: format_runs(caption),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Extract an optional `#col-<number>` weight token from a column's first
/// child. The token is stripped; a child left with no text and no children
/// is dropped entirely. Weight defaults to 1 when absent, unparsable, or
/// non-positive.
fn split_column_weight(children: &[ContentNode]) -> (f64, Vec<ContentNode>) {
    let fallback = || (1.0, children.to_vec());

    let Some(first) = children.first() else {
        return fallback();
    };
    let Some(first_run) = first.rich_text().first() else {
        return fallback();
    };
    let trimmed = first_run.text.trim();
    let Some(token) = trimmed.split_whitespace().next() else {
        return fallback();
    };
    let lowered = token.to_ascii_lowercase();
    let Some(spec) = lowered.strip_prefix("#col-") else {
        return fallback();
    };

    let weight = spec
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(1.0);

    let mut rest = children.to_vec();
    let dropped = strip_leading_token(&mut rest[0], token);
    if dropped {
        rest.remove(0);
    }
    (weight, rest)
}

/// Remove `token` from the front of a node's first run. Returns true when
/// the node is left with nothing to render.
fn strip_leading_token(node: &mut ContentNode, token: &str) -> bool {
    let runs = match &mut node.payload {
        BlockPayload::Paragraph { rich_text }
        | BlockPayload::Heading1 { rich_text }
        | BlockPayload::Heading2 { rich_text }
        | BlockPayload::Heading3 { rich_text }
        | BlockPayload::Callout { rich_text, .. }
        | BlockPayload::Quote { rich_text }
        | BlockPayload::Toggle { rich_text }
        | BlockPayload::BulletedListItem { rich_text }
        | BlockPayload::NumberedListItem { rich_text } => rich_text,
        _ => return false,
    };
    if let Some(first_run) = runs.first_mut() {
        let remainder = first_run
            .text
            .trim_start()
            .strip_prefix(token)
            .map(|rest| rest.trim_start().to_string());
        if let Some(remainder) = remainder {
            if remainder.is_empty() {
                runs.remove(0);
            } else {
                first_run.text = remainder;
            }
        }
    }
    runs.iter().all(|run| run.text.trim().is_empty()) && node.children.is_empty()
}

fn visibility_section(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let surface = match scope.directive {
        Directive::DesktopOnly => Surface::Desktop,
        _ => Surface::Mobile,
    };
    Some(ViewNode::Visibility {
        surface,
        html: format_runs(scope.body),
        children: walker.render_nodes(&scope.node.children),
    })
}

fn size_capped_section(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let cap = match scope.directive {
        Directive::Narrow => WidthCap::Narrow,
        _ => WidthCap::Medium,
    };
    Some(ViewNode::SizeCapped {
        cap,
        html: format_runs(scope.body),
        children: walker.render_nodes(&scope.node.children),
    })
}

fn comparison_card(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let role = match scope.directive {
        Directive::BeforeCard => ComparisonRole::Before,
        _ => ComparisonRole::After,
    };
    Some(ViewNode::ComparisonCard {
        role,
        html: format_runs(scope.body),
        children: walker.render_nodes(&scope.node.children),
    })
}

fn gradient_overlay(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    if scope.directive == Directive::GradientSync
        && let Some(prev_id) = scope.prev_id
    {
        // Register interest within this pass so a broadcast for the
        // predecessor finds a live channel.
        let _ = walker.ctx.reveal_bus().subscribe(prev_id);
        return Some(ViewNode::GradientOverlay {
            reveal: RevealMode::Synced {
                key: prev_id.to_string(),
            },
            html: String::new(),
        });
    }
    // Sync without a predecessor degrades to ordinary observation.
    Some(ViewNode::GradientOverlay {
        reveal: walker.ctx.reveal_mode(),
        html: format_runs(scope.body),
    })
}

fn full_bleed_divider(_walker: &mut Walker<'_>, _scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    Some(ViewNode::Divider { full_bleed: true })
}

fn download_card(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let detail = scope
        .node
        .children
        .iter()
        .find_map(|child| match &child.payload {
            BlockPayload::Paragraph { .. } => {
                let text = child.plain_text();
                (!text.trim().is_empty()).then_some(text)
            }
            _ => None,
        })
        .unwrap_or_default();
    Some(ViewNode::DownloadCard {
        url: first_link(scope),
        title_html: format_runs(scope.body),
        detail,
    })
}

fn link_block(_walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    Some(ViewNode::LinkBlock {
        url: first_link(scope),
        html: format_runs(scope.body),
    })
}

fn slide_carousel(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let slides = walker.image_slides(&scope.node.children);
    if slides.is_empty() {
        // An empty carousel is authoring debt; surface the body as a callout.
        return Some(ViewNode::Callout {
            icon: DEFAULT_CALLOUT_ICON.to_string(),
            html: format_runs(scope.body),
            children: Vec::new(),
        });
    }
    let slides = extend_round_robin(&slides, MIN_ROTATION_SLOTS);
    Some(ViewNode::Carousel {
        rotation: RotationSpec::from_config(slides.len(), scope.config),
        slides,
        reveal: walker.ctx.reveal_mode(),
    })
}

fn circle_rotator(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let mut faces = Vec::new();
    for child in &scope.node.children {
        match &child.payload {
            BlockPayload::Image {
                url: Some(url),
                caption,
            } if !url.is_empty() => {
                faces.push(RotatorFace::Image {
                    slide: Slide {
                        asset: walker.ctx.resolver().resolve(url, &child.id),
                        caption_html: format_runs(caption),
                    },
                });
            }
            _ => {
                let runs = child.rich_text();
                if runs.iter().all(|run| run.text.trim().is_empty()) {
                    continue;
                }
                faces.push(text_face(runs));
            }
        }
    }
    if faces.is_empty() {
        return Some(ViewNode::Callout {
            icon: DEFAULT_CALLOUT_ICON.to_string(),
            html: format_runs(scope.body),
            children: Vec::new(),
        });
    }
    let faces = extend_round_robin(&faces, MIN_ROTATION_SLOTS);
    Some(ViewNode::Rotator {
        rotation: RotationSpec::from_config(faces.len(), scope.config),
        faces,
        reveal: walker.ctx.reveal_mode(),
    })
}

/// Bold runs carry the title; everything else becomes the description.
fn text_face(runs: &[RichTextRun]) -> RotatorFace {
    let mut title = String::new();
    let mut desc = String::new();
    for run in runs {
        if run.annotations.bold {
            title.push_str(run.text.trim());
        } else {
            desc.push_str(&run.text);
        }
    }
    let desc = desc.trim().to_string();
    if title.is_empty() {
        return RotatorFace::Text {
            title: desc,
            desc: String::new(),
        };
    }
    RotatorFace::Text { title, desc }
}

fn rotation_stage(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let slides = walker.image_slides(&scope.node.children);
    if slides.is_empty() {
        return Some(ViewNode::Callout {
            icon: DEFAULT_CALLOUT_ICON.to_string(),
            html: format_runs(scope.body),
            children: Vec::new(),
        });
    }
    Some(ViewNode::RotationStage {
        slides,
        html: format_runs(scope.body),
        reveal: walker.ctx.reveal_mode(),
    })
}

fn step_arrow(_walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    Some(ViewNode::StepArrow {
        html: format_runs(scope.body),
    })
}

fn scroll_anchor(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let text: String = scope
        .body
        .iter()
        .map(|run| run.text.as_str())
        .collect();
    let anchor = walker.ctx.anchors_mut().allocate(&text, &scope.node.id);
    Some(ViewNode::ScrollAnchor { anchor })
}

fn prototype_frame(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let variant = match scope.directive {
        Directive::PrototypeWeb => PrototypeVariant::Web,
        Directive::PrototypeBreakpoint => PrototypeVariant::Breakpoint,
        Directive::PrototypeDesktopFix => PrototypeVariant::DesktopFix,
        _ => PrototypeVariant::DesktopScroll,
    };

    let embed_index = scope
        .node
        .children
        .iter()
        .position(|child| embeddable_url(child).is_some());
    let embed: Option<EmbedTarget> = embed_index
        .and_then(|index| embeddable_url(&scope.node.children[index]))
        .map(embed::normalize);

    let remaining: Vec<ContentNode> = scope
        .node
        .children
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != embed_index)
        .map(|(_, child)| child.clone())
        .collect();

    Some(ViewNode::PrototypeFrame {
        variant,
        embed,
        html: format_runs(scope.body),
        reveal: walker.ctx.reveal_mode(),
        children: walker.render_nodes(&remaining),
    })
}

fn embeddable_url(node: &ContentNode) -> Option<&str> {
    match &node.payload {
        BlockPayload::Embed { url: Some(url), .. }
        | BlockPayload::Video { url: Some(url), .. }
        | BlockPayload::Bookmark { url: Some(url), .. }
            if !url.is_empty() =>
        {
            Some(url)
        }
        _ => None,
    }
}

fn showcase_section(walker: &mut Walker<'_>, scope: &DirectiveScope<'_>) -> Option<ViewNode> {
    let body_text: String = scope
        .body
        .iter()
        .map(|run| run.text.as_str())
        .collect();
    let (title, desc) = parse_showcase_sections(&body_text);
    Some(ViewNode::Showcase {
        title,
        desc,
        slides: walker.image_slides(&scope.node.children),
        reveal: walker.ctx.reveal_mode(),
    })
}

/// Showcase body mini-format: lines opening with `#title` or `#desc` select
/// a bucket; a `{…}` or `(…)` span on the line wins over the bare remainder.
fn parse_showcase_sections(text: &str) -> (String, String) {
    let mut title = String::new();
    let mut desc = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let (bucket, rest) = if lowered.starts_with("#title") {
            (&mut title, &trimmed["#title".len()..])
        } else if lowered.starts_with("#desc") {
            (&mut desc, &trimmed["#desc".len()..])
        } else {
            continue;
        };
        let value = extract_span(rest).unwrap_or_else(|| rest.trim());
        if value.is_empty() {
            continue;
        }
        if !bucket.is_empty() {
            bucket.push(' ');
        }
        bucket.push_str(value);
    }
    (title, desc)
}

fn extract_span(text: &str) -> Option<&str> {
    for (open, close) in [('{', '}'), ('(', ')')] {
        if let Some(start) = text.find(open)
            && let Some(length) = text[start + 1..].find(close)
        {
            let span = text[start + 1..start + 1 + length].trim();
            if !span.is_empty() {
                return Some(span);
            }
        }
    }
    None
}

fn first_link(scope: &DirectiveScope<'_>) -> Option<String> {
    if let Some(href) = scope
        .body
        .iter()
        .find_map(|run| run.href.as_ref().filter(|href| !href.is_empty()))
    {
        return Some(href.clone());
    }
    scope
        .node
        .children
        .iter()
        .find_map(|child| embeddable_url(child).map(str::to_string))
}
