//! End-to-end render passes over realistic documents, exercised through the
//! public [`RenderService`] facade.

use serde_json::json;

use vitrine::application::render::schedule::RevealMode;
use vitrine::application::render::view::ViewNode;
use vitrine::application::render::{RenderEnv, RenderService};
use vitrine::config::RenderSettings;
use vitrine::domain::blocks::ContentNode;

fn service() -> RenderService {
    RenderService::new(&RenderSettings {
        proxy_path: "/assets/proxy".to_string(),
    })
}

fn parse_blocks(value: serde_json::Value) -> Vec<ContentNode> {
    serde_json::from_value(value).expect("fixture parses")
}

fn portfolio_page() -> Vec<ContentNode> {
    parse_blocks(json!([
        { "id": "style", "type": "code", "language": "css",
          "rich_text": [{ "text": ".page { max-width: 72rem; }" }] },
        { "id": "h-intro", "type": "heading_1",
          "rich_text": [{ "text": "Checkout redesign" }] },
        { "id": "p-intro", "type": "paragraph", "rich_text": [
            { "text": "Shipped in " },
            { "text": "six weeks", "annotations": { "bold": true } },
            { "text": "." }
        ] },
        { "id": "hero", "type": "callout",
          "rich_text": [{ "text": "#gradient" }, { "text": "From 12 steps to 3" }] },
        { "id": "hero-echo", "type": "callout",
          "rich_text": [{ "text": "#gradient-sync" }] },
        { "id": "shots", "type": "callout",
          "rich_text": [{ "text": "#slide pause=1800" }],
          "children": [
            { "id": "s1", "type": "image",
              "url": "https://prod-files.s3.us-west-2.amazonaws.com/team/cart.png?X-Amz-Signature=expired&width=1440" },
            { "id": "s2", "type": "image",
              "url": "https://cdn.example.com/confirmation.png",
              "caption": [{ "text": "Confirmation" }] }
          ] },
        { "id": "cols", "type": "column_list", "children": [
            { "id": "col-a", "type": "column", "children": [
                { "id": "w", "type": "paragraph", "rich_text": [{ "text": "#col-2 Wide track" }] }
            ] },
            { "id": "col-b", "type": "column", "children": [
                { "id": "n", "type": "paragraph", "rich_text": [{ "text": "Narrow track" }] }
            ] }
        ] },
        { "id": "h-results", "type": "heading_2",
          "rich_text": [{ "text": "Results" }] },
        { "id": "jump", "type": "callout",
          "rich_text": [{ "text": "#anchor" }, { "text": "Results" }] }
    ]))
}

#[test]
fn portfolio_page_renders_every_section() {
    let output = service().render(&portfolio_page(), RenderEnv::default());

    assert_eq!(
        output.hoisted_styles.as_deref(),
        Some(".page { max-width: 72rem; }")
    );
    // Style block consumed; every remaining node rendered.
    assert_eq!(output.nodes.len(), 8);

    let ViewNode::Heading { level, anchor, .. } = &output.nodes[0] else {
        panic!("expected heading first");
    };
    assert_eq!(*level, 1);
    assert_eq!(anchor.as_deref(), Some("checkout-redesign"));

    let ViewNode::Paragraph { html } = &output.nodes[1] else {
        panic!("expected intro paragraph");
    };
    assert_eq!(html, "Shipped in <strong>six weeks</strong>.");

    let ViewNode::Carousel { slides, .. } = &output.nodes[4] else {
        panic!("expected carousel");
    };
    assert_eq!(slides.len(), 3);
    // Storage-host slide got the stable indirection and same-origin proxy.
    assert!(
        slides[0]
            .asset
            .stable_url
            .starts_with("https://www.notion.so/image/")
    );
    assert!(slides[0].asset.proxied_url.starts_with("/assets/proxy?src="));
    assert_eq!(slides[0].asset.width, Some(1440));
    // CDN slide passes through unstabilized but still proxied.
    assert_eq!(
        slides[1].asset.stable_url,
        "https://cdn.example.com/confirmation.png"
    );

    let ViewNode::Columns { tracks } = &output.nodes[5] else {
        panic!("expected columns");
    };
    assert_eq!(tracks[0].weight, 2.0);
    assert_eq!(tracks[1].weight, 1.0);

    // The anchor callout lost `results` to the heading just above it.
    let ViewNode::ScrollAnchor { anchor } = &output.nodes[7] else {
        panic!("expected scroll anchor");
    };
    assert_eq!(anchor.as_deref(), Some("results-2"));
}

#[test]
fn directive_tags_never_leak_into_output() {
    let output = service().render(&portfolio_page(), RenderEnv::default());
    let serialized = serde_json::to_string(&output).expect("serializes");
    for tag in ["#gradient", "#slide", "#anchor", "#col-2"] {
        assert!(!serialized.contains(tag), "tag leaked: {tag}");
    }
}

#[test]
fn static_pass_reveals_everything_immediately() {
    let output = service().render(&portfolio_page(), RenderEnv::default());

    let ViewNode::GradientOverlay { reveal, .. } = &output.nodes[2] else {
        panic!("expected gradient overlay");
    };
    assert_eq!(*reveal, RevealMode::Immediate);

    let ViewNode::Carousel { reveal, .. } = &output.nodes[4] else {
        panic!("expected carousel");
    };
    assert_eq!(*reveal, RevealMode::Immediate);
}

#[test]
fn interactive_pass_defers_reveals_and_syncs_gradients() {
    let env = RenderEnv {
        interactive: true,
        reduced_motion: false,
        observer_available: true,
    };
    let output = service().render(&portfolio_page(), env);

    let ViewNode::GradientOverlay { reveal, .. } = &output.nodes[2] else {
        panic!("expected gradient overlay");
    };
    assert_eq!(*reveal, RevealMode::observe());

    let ViewNode::GradientOverlay { reveal, .. } = &output.nodes[3] else {
        panic!("expected synced gradient overlay");
    };
    assert!(matches!(reveal, RevealMode::Synced { key } if key == "hero"));
}

#[test]
fn anchor_registry_resets_between_passes() {
    let svc = service();
    let blocks = parse_blocks(json!([
        { "id": "h", "type": "heading_2", "rich_text": [{ "text": "Overview" }] }
    ]));

    for _ in 0..2 {
        let output = svc.render(&blocks, RenderEnv::default());
        let ViewNode::Heading { anchor, .. } = &output.nodes[0] else {
            panic!("expected heading");
        };
        // A fresh pass never sees the previous pass's allocations.
        assert_eq!(anchor.as_deref(), Some("overview"));
    }
}
