//! Inline rich-text formatting.
//!
//! Runs are formatted independently and concatenated. Wrapping order is
//! fixed: code innermost, then bold, italic, underline, strikethrough, with
//! the hyperlink outermost so every decoration stays clickable.

use crate::domain::blocks::RichTextRun;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    escape_html(value)
}

fn format_run(run: &RichTextRun) -> String {
    let mut html = escape_html(&run.text);
    let a = run.annotations;
    if a.code {
        html = format!("<code>{html}</code>");
    }
    if a.bold {
        html = format!("<strong>{html}</strong>");
    }
    if a.italic {
        html = format!("<em>{html}</em>");
    }
    if a.underline {
        html = format!("<u>{html}</u>");
    }
    if a.strikethrough {
        html = format!("<s>{html}</s>");
    }
    if let Some(href) = &run.href {
        html = format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">{html}</a>",
            escape_attribute(href)
        );
    }
    html
}

/// Format a slice of runs into an HTML fragment. Empty input yields an empty
/// string rather than an empty wrapper element.
pub fn format_runs(runs: &[RichTextRun]) -> String {
    runs.iter().map(format_run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::blocks::{Annotations, RichTextRun};

    fn run(text: &str, annotations: Annotations, href: Option<&str>) -> RichTextRun {
        RichTextRun {
            text: text.to_string(),
            annotations,
            href: href.map(str::to_string),
        }
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(format_runs(&[]), "");
    }

    #[test]
    fn plain_run_is_escaped_only() {
        let runs = [RichTextRun::plain("a < b & c")];
        assert_eq!(format_runs(&runs), "a &lt; b &amp; c");
    }

    #[test]
    fn wrap_order_is_fixed() {
        let all = Annotations {
            bold: true,
            italic: true,
            underline: true,
            strikethrough: true,
            code: true,
        };
        let runs = [run("x", all, Some("https://example.com"))];
        assert_eq!(
            format_runs(&runs),
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noreferrer\">\
             <s><u><em><strong><code>x</code></strong></em></u></s></a>"
        );
    }

    #[test]
    fn hyperlink_target_is_attribute_escaped() {
        let runs = [run(
            "link",
            Annotations::default(),
            Some("https://example.com/?a=\"1\""),
        )];
        let html = format_runs(&runs);
        assert!(html.contains("href=\"https://example.com/?a=&quot;1&quot;\""));
    }

    #[test]
    fn runs_concatenate_in_order() {
        let bold = Annotations {
            bold: true,
            ..Annotations::default()
        };
        let runs = [
            RichTextRun::plain("Design "),
            run("Systems", bold, None),
        ];
        assert_eq!(format_runs(&runs), "Design <strong>Systems</strong>");
    }
}
