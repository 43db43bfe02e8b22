//! Callout directive vocabulary and parsing.
//!
//! A callout whose first run opens with a recognized `#tag` token is not a
//! callout at all: it is an instruction selecting a specialized renderer.
//! Tags are matched case-insensitively through a registry; the matched run is
//! stripped from the body so the tag never leaks into output.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::blocks::RichTextRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    DesktopOnly,
    MobileOnly,
    Narrow,
    Medium,
    BeforeCard,
    AfterCard,
    Gradient,
    GradientSync,
    FullBleed,
    Download,
    Link,
    Slide,
    Circle,
    Rotation,
    Arrow,
    Anchor,
    PrototypeWeb,
    PrototypeBreakpoint,
    PrototypeDesktopFix,
    PrototypeDesktopScroll,
    Showcase,
}

impl Directive {
    pub const ALL: [Directive; 21] = [
        Directive::DesktopOnly,
        Directive::MobileOnly,
        Directive::Narrow,
        Directive::Medium,
        Directive::BeforeCard,
        Directive::AfterCard,
        Directive::Gradient,
        Directive::GradientSync,
        Directive::FullBleed,
        Directive::Download,
        Directive::Link,
        Directive::Slide,
        Directive::Circle,
        Directive::Rotation,
        Directive::Arrow,
        Directive::Anchor,
        Directive::PrototypeWeb,
        Directive::PrototypeBreakpoint,
        Directive::PrototypeDesktopFix,
        Directive::PrototypeDesktopScroll,
        Directive::Showcase,
    ];

    /// Canonical (lowercase) tag for this directive.
    pub fn tag(self) -> &'static str {
        match self {
            Directive::DesktopOnly => "#desktop",
            Directive::MobileOnly => "#mobile",
            Directive::Narrow => "#small",
            Directive::Medium => "#medium",
            Directive::BeforeCard => "#as-is",
            Directive::AfterCard => "#to-be",
            Directive::Gradient => "#gradient",
            Directive::GradientSync => "#gradient-sync",
            Directive::FullBleed => "#full-bleed",
            Directive::Download => "#download",
            Directive::Link => "#link",
            Directive::Slide => "#slide",
            Directive::Circle => "#circle",
            Directive::Rotation => "#rotation",
            Directive::Arrow => "#arrow",
            Directive::Anchor => "#anchor",
            Directive::PrototypeWeb => "#prototype-web",
            Directive::PrototypeBreakpoint => "#prototype-breakpoint",
            Directive::PrototypeDesktopFix => "#prototype-desktop-fix",
            Directive::PrototypeDesktopScroll => "#prototype-desktop-scroll",
            Directive::Showcase => "#showcase",
        }
    }
}

static REGISTRY: Lazy<HashMap<&'static str, Directive>> = Lazy::new(|| {
    Directive::ALL
        .iter()
        .map(|directive| (directive.tag(), *directive))
        .collect()
});

/// Resolve a single tag token against the vocabulary, case-insensitively.
pub fn resolve_tag(token: &str) -> Option<Directive> {
    let lowered = token.trim().to_ascii_lowercase();
    REGISTRY.get(lowered.as_str()).copied()
}

/// Config keys that coerce to numbers. Everything else is ignored.
const NUMERIC_KEYS: &[&str] = &["duration", "pause", "slots", "width", "height"];

/// Inline `key=value` configuration following a directive tag. Parsing never
/// fails; malformed tokens are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveConfig {
    numbers: HashMap<String, f64>,
}

impl DirectiveConfig {
    fn parse<'a>(tokens: impl Iterator<Item = &'a str>) -> Self {
        let mut numbers = HashMap::new();
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let key = key.to_ascii_lowercase();
            if !NUMERIC_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Ok(number) = value.parse::<f64>() {
                numbers.insert(key, number);
            }
        }
        Self { numbers }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.numbers.get(key).copied()
    }
}

/// A directive recognized on a specific callout.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDirective {
    pub directive: Directive,
    /// Exact text of the run that carried the tag, used for stripping.
    /// Empty when the tag came from the icon glyph.
    pub matched_run: String,
    pub config: DirectiveConfig,
}

/// Recognize a directive on a callout. The first run's leading token is the
/// primary signal; the icon glyph is a weaker fallback for callouts whose
/// body is entirely content.
pub fn parse(runs: &[RichTextRun], icon: Option<&str>) -> Option<ParsedDirective> {
    if let Some(first) = runs.first() {
        let mut tokens = first.text.split_whitespace();
        if let Some(head) = tokens.next()
            && let Some(directive) = resolve_tag(head)
        {
            return Some(ParsedDirective {
                directive,
                matched_run: first.text.clone(),
                config: DirectiveConfig::parse(tokens),
            });
        }
    }

    let icon = icon?;
    let directive = resolve_tag(icon)?;
    Some(ParsedDirective {
        directive,
        matched_run: String::new(),
        config: DirectiveConfig::default(),
    })
}

/// Remove the run that carried the tag. Matching is by exact string identity,
/// so stripping twice is a no-op.
pub fn strip_tag_run(runs: &[RichTextRun], matched_run: &str) -> Vec<RichTextRun> {
    if matched_run.is_empty() {
        return runs.to_vec();
    }
    runs.iter()
        .filter(|run| run.text != matched_run)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        assert_eq!(resolve_tag("#Desktop"), Some(Directive::DesktopOnly));
        assert_eq!(resolve_tag("#SMALL"), Some(Directive::Narrow));
        assert_eq!(resolve_tag("#As-Is"), Some(Directive::BeforeCard));
        assert_eq!(resolve_tag("#nonsense"), None);
    }

    #[test]
    fn parses_tag_with_config_tokens() {
        let runs = [RichTextRun::plain("#slide duration=1200 pause=oops junk")];
        let parsed = parse(&runs, None).expect("directive recognized");
        assert_eq!(parsed.directive, Directive::Slide);
        assert_eq!(parsed.config.number("duration"), Some(1200.0));
        assert_eq!(parsed.config.number("pause"), None);
    }

    #[test]
    fn unrecognized_config_keys_are_ignored() {
        let runs = [RichTextRun::plain("#circle speed=9 pause=1800")];
        let parsed = parse(&runs, None).expect("directive recognized");
        assert_eq!(parsed.config.number("speed"), None);
        assert_eq!(parsed.config.number("pause"), Some(1800.0));
    }

    #[test]
    fn icon_glyph_is_weaker_signal() {
        let runs = [RichTextRun::plain("Just a note")];
        let parsed = parse(&runs, Some("#mobile")).expect("icon recognized");
        assert_eq!(parsed.directive, Directive::MobileOnly);
        assert!(parsed.matched_run.is_empty());
    }

    #[test]
    fn stripping_twice_is_noop() {
        let runs = vec![
            RichTextRun::plain("#Small extra=1"),
            RichTextRun::plain("Caption text"),
        ];
        let parsed = parse(&runs, None).expect("directive recognized");
        let once = strip_tag_run(&runs, &parsed.matched_run);
        let twice = strip_tag_run(&once, &parsed.matched_run);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].text, "Caption text");
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn every_tag_resolves_to_itself() {
        for directive in Directive::ALL {
            assert_eq!(resolve_tag(directive.tag()), Some(directive));
        }
    }
}
