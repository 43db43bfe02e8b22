//! Deterministic anchor ids for in-page navigation.
//!
//! One [`AnchorRegistry`] lives for exactly one render pass over a tree, so
//! ids are unique within a rendered document and reproducible across renders
//! of the same input.

use std::collections::HashSet;

use slug::slugify;

const FALLBACK_PREFIX: &str = "section-";

/// Normalize heading text into an anchor id candidate: lowercase, reduce to
/// `[a-z0-9]` and hyphens, collapse separator runs, trim. Non-ASCII letters
/// transliterate rather than drop ("café" keeps its `e`), so accented
/// headings still yield readable ids. Ids must start with a letter;
/// numeric-leading results get a fixed prefix so they remain valid fragment
/// targets.
fn normalize(text: &str) -> String {
    let base = slugify(text);
    if base.is_empty() {
        return base;
    }
    if base.starts_with(|c: char| c.is_ascii_alphabetic()) {
        base
    } else {
        format!("{FALLBACK_PREFIX}{base}")
    }
}

/// Issues unique anchor ids for one render pass.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    issued: HashSet<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id from heading text, falling back to the node id when the
    /// text normalizes to nothing. Returns `None` only when both sources are
    /// unrepresentable. Duplicate text gets monotonic `-2`, `-3`, … suffixes.
    pub fn allocate(&mut self, raw_text: &str, fallback_id: &str) -> Option<String> {
        let mut base = normalize(raw_text);
        if base.is_empty() {
            base = normalize(fallback_id);
        }
        if base.is_empty() {
            return None;
        }

        let mut candidate = base.clone();
        let mut attempt = 2usize;
        while self.issued.contains(&candidate) {
            candidate = format!("{base}-{attempt}");
            attempt += 1;
        }
        self.issued.insert(candidate.clone());
        Some(candidate)
    }
}
