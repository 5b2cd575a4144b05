//! HTML extraction from free-form model replies.
//!
//! Strategies run in priority order and the first hit wins. Extraction never
//! fails: a reply with no recognisable document is passed through as-is.

use regex::Regex;
use std::sync::LazyLock;

// Compile regexes once using LazyLock
static FENCED_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```html\s*(.*?)```").unwrap());

static FENCED_ANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap());

const DOCTYPE: &str = "<!doctype";
const HTML_OPEN: &str = "<html";
const HTML_CLOSE: &str = "</html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// ```` ```html ... ``` ````
    FencedHtml,
    /// Any fenced block whose body is a document.
    FencedDocument,
    /// The whole reply is already a document.
    BareDocument,
    /// A document embedded in prose: first marker to last `</html>`.
    EmbeddedDocument,
    Passthrough,
}

pub const STRATEGIES: [Strategy; 5] = [
    Strategy::FencedHtml,
    Strategy::FencedDocument,
    Strategy::BareDocument,
    Strategy::EmbeddedDocument,
    Strategy::Passthrough,
];

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FencedHtml => "fenced-html",
            Self::FencedDocument => "fenced-document",
            Self::BareDocument => "bare-document",
            Self::EmbeddedDocument => "embedded-document",
            Self::Passthrough => "passthrough",
        }
    }

    pub fn apply(&self, reply: &str) -> Option<String> {
        match self {
            Self::FencedHtml => FENCED_HTML
                .captures(reply)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string()),
            Self::FencedDocument => FENCED_ANY
                .captures_iter(reply)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .find(|body| starts_with_document(body))
                .map(str::to_string),
            Self::BareDocument => {
                let trimmed = reply.trim();
                starts_with_document(trimmed).then(|| trimmed.to_string())
            }
            Self::EmbeddedDocument => embedded_document(reply),
            Self::Passthrough => Some(reply.to_string()),
        }
    }
}

/// Extract the HTML document from a model reply.
pub fn extract_html(reply: &str) -> String {
    extract_with_strategy(reply).0
}

/// Like [`extract_html`], also reporting which strategy matched.
pub fn extract_with_strategy(reply: &str) -> (String, Strategy) {
    for strategy in STRATEGIES {
        if let Some(found) = strategy.apply(reply) {
            return (found, strategy);
        }
    }
    (reply.to_string(), Strategy::Passthrough)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn starts_with_document(s: &str) -> bool {
    starts_with_ignore_case(s, DOCTYPE) || starts_with_ignore_case(s, HTML_OPEN)
}

fn embedded_document(reply: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `reply`.
    let lower = reply.to_ascii_lowercase();
    let start = [lower.find(DOCTYPE), lower.find(HTML_OPEN)]
        .into_iter()
        .flatten()
        .min()?;
    let doc = match lower.rfind(HTML_CLOSE) {
        Some(end) if end > start => &reply[start..end + HTML_CLOSE.len()],
        _ => &reply[start..],
    };
    Some(doc.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!DOCTYPE html>\n<html><head><title>t</title></head><body><button>+</button></body></html>";

    #[test]
    fn test_bare_document_is_unchanged() {
        assert_eq!(extract_html(DOC), DOC);
        assert_eq!(extract_html(&extract_html(DOC)), DOC);
    }

    #[test]
    fn test_fenced_html_block() {
        let reply = format!("```html\n{}\n```", DOC);
        let (out, strategy) = extract_with_strategy(&reply);
        assert_eq!(out, DOC);
        assert_eq!(strategy, Strategy::FencedHtml);
    }

    #[test]
    fn test_fenced_html_tag_is_case_insensitive() {
        let reply = format!("Here you go:\n```HTML\n{}\n```\nEnjoy!", DOC);
        assert_eq!(extract_html(&reply), DOC);
    }

    #[test]
    fn test_untagged_fence_with_document() {
        let reply = format!("Sure.\n```\n{}\n```", DOC);
        let (out, strategy) = extract_with_strategy(&reply);
        assert_eq!(out, DOC);
        assert_eq!(strategy, Strategy::FencedDocument);
    }

    #[test]
    fn test_fence_skips_non_document_blocks() {
        let reply = format!("```js\nconsole.log(1)\n```\nand\n```xml\n{}\n```", DOC);
        let (out, strategy) = extract_with_strategy(&reply);
        assert_eq!(out, DOC);
        assert_eq!(strategy, Strategy::FencedDocument);
    }

    #[test]
    fn test_bare_document_lowercase_doctype_with_whitespace() {
        let reply = "\n\n  <!doctype html><html></html>  \n";
        let (out, strategy) = extract_with_strategy(reply);
        assert_eq!(out, "<!doctype html><html></html>");
        assert_eq!(strategy, Strategy::BareDocument);
    }

    #[test]
    fn test_embedded_document_in_prose() {
        let reply = format!("Here is your app: {} Hope you like it!", DOC);
        let (out, strategy) = extract_with_strategy(&reply);
        assert_eq!(out, DOC);
        assert_eq!(strategy, Strategy::EmbeddedDocument);
    }

    #[test]
    fn test_embedded_document_without_close_runs_to_end() {
        let reply = "Preamble <html><body>cut off";
        assert_eq!(extract_html(reply), "<html><body>cut off");
    }

    #[test]
    fn test_embedded_prefers_earliest_marker() {
        let reply = "text <html lang=\"en\"><body><!DOCTYPE oops></body></html> trailing";
        assert_eq!(
            extract_html(reply),
            "<html lang=\"en\"><body><!DOCTYPE oops></body></html>"
        );
    }

    #[test]
    fn test_no_markers_passthrough() {
        let reply = "  I cannot build that, sorry.  ";
        let (out, strategy) = extract_with_strategy(reply);
        assert_eq!(out, reply);
        assert_eq!(strategy, Strategy::Passthrough);
    }

    #[test]
    fn test_empty_reply_passthrough() {
        assert_eq!(extract_html(""), "");
    }

    #[test]
    fn test_header_tag_is_not_a_document() {
        let reply = "<header>hi</header>";
        assert_eq!(extract_with_strategy(reply).1, Strategy::Passthrough);
    }

    #[test]
    fn test_strategy_order_is_fixed() {
        let names: Vec<_> = STRATEGIES.iter().map(Strategy::name).collect();
        assert_eq!(
            names,
            [
                "fenced-html",
                "fenced-document",
                "bare-document",
                "embedded-document",
                "passthrough"
            ]
        );
    }
}
