//! The render pipeline: content-node trees in, view-node trees out.
//!
//! One render pass is one [`RenderContext`]: a fresh anchor registry, a
//! reveal bus scoped to the pass, and the environment the output will be
//! shown in. The pass itself is synchronous; see [`schedule`] for the
//! runtime side.

pub mod directive;
pub mod embed;
pub mod media;
pub mod schedule;
pub mod text;
pub mod view;
pub mod walker;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RenderSettings;
use crate::domain::anchor::AnchorRegistry;
use crate::domain::blocks::ContentNode;

use media::ResourceResolver;
use schedule::{RevealBus, RevealMode};
use view::RenderOutput;

/// Where and how the rendered output will be displayed. Drives reveal
/// scheduling decisions; the default describes a non-interactive pre-render
/// pass, which reveals everything immediately.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderEnv {
    /// Whether a live runtime will mount the output.
    pub interactive: bool,
    /// The viewer prefers reduced motion.
    pub reduced_motion: bool,
    /// The surface can observe viewport intersections.
    pub observer_available: bool,
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self {
            interactive: false,
            reduced_motion: false,
            observer_available: true,
        }
    }
}

/// State threaded through one render pass.
pub struct RenderContext {
    env: RenderEnv,
    resolver: ResourceResolver,
    anchors: AnchorRegistry,
    reveal: Arc<RevealBus>,
}

impl RenderContext {
    pub fn new(env: RenderEnv, resolver: ResourceResolver) -> Self {
        Self {
            env,
            resolver,
            anchors: AnchorRegistry::new(),
            reveal: Arc::new(RevealBus::new()),
        }
    }

    pub fn env(&self) -> RenderEnv {
        self.env
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    pub fn anchors_mut(&mut self) -> &mut AnchorRegistry {
        &mut self.anchors
    }

    /// The reveal bus for this pass. Handed to the host surface alongside
    /// the output so sync broadcasts stay scoped to one document.
    pub fn reveal_bus(&self) -> &Arc<RevealBus> {
        &self.reveal
    }

    /// Default reveal mode for observing blocks under this environment.
    pub fn reveal_mode(&self) -> RevealMode {
        if !self.env.interactive || self.env.reduced_motion || !self.env.observer_available {
            RevealMode::Immediate
        } else {
            RevealMode::observe()
        }
    }
}

/// Long-lived render facade. Owns the pieces that survive across passes;
/// everything per-pass lives in [`RenderContext`].
#[derive(Debug, Clone)]
pub struct RenderService {
    resolver: ResourceResolver,
}

impl RenderService {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            resolver: ResourceResolver::new(settings.proxy_path.clone()),
        }
    }

    pub fn render(&self, nodes: &[ContentNode], env: RenderEnv) -> RenderOutput {
        let mut ctx = RenderContext::new(env, self.resolver.clone());
        let output = walker::render_tree(nodes, &mut ctx);
        info!(
            target = "vitrine::render",
            input_nodes = nodes.len(),
            output_nodes = output.nodes.len(),
            hoisted_styles = output.hoisted_styles.is_some(),
            "render pass complete"
        );
        output
    }
}
