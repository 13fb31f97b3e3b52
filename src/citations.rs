//! Source documents attached to the most recent answer.
//!
//! Labels and bodies are parallel arrays; the set is only ever built through
//! `CitationSet::new`, which keeps them the same length, and it is replaced
//! wholesale on every successful exchange. Bodies are HTML fragments from the
//! answering service and stay wrapped in `ExternalMarkup` until a renderer
//! picks how to present them.

use std::sync::LazyLock;

use regex::Regex;

use crate::conversation::Message;

// ── ExternalMarkup ────────────────────────────────────────────────────────────

/// An HTML fragment supplied by the answering service. Never trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMarkup(String);

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|ul|ol|table)\s*>").unwrap());
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

impl ExternalMarkup {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The fragment exactly as received. Callers that render HTML must apply
    /// their own sanitization policy.
    pub fn as_untrusted_html(&self) -> &str {
        &self.0
    }

    /// Text-only view: scripts and styles dropped, tags removed, block
    /// elements turned into line breaks, common entities decoded.
    pub fn to_plain_text(&self) -> String {
        let s = SCRIPT_OR_STYLE.replace_all(self.as_untrusted_html(), "");
        let s = LIST_ITEM.replace_all(&s, "• ");
        let s = LINE_BREAK.replace_all(&s, "\n");
        let s = ANY_TAG.replace_all(&s, "");
        let s = decode_entities(&s);

        let lines: Vec<&str> = s.lines().map(str::trim).collect();
        let joined = lines.join("\n");
        BLANK_RUN.replace_all(joined.trim(), "\n\n").into_owned()
    }
}

fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(s, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    // &amp; last so "&amp;lt;" stays "&lt;"
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ── CitationSet ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationSet {
    labels: Vec<String>,
    bodies: Vec<ExternalMarkup>,
    cursor: usize,
}

impl CitationSet {
    /// Pair labels with bodies by position. Entries past the shorter of the
    /// two lists have no partner and are dropped.
    pub fn new(mut labels: Vec<String>, mut bodies: Vec<ExternalMarkup>) -> Self {
        let paired = labels.len().min(bodies.len());
        labels.truncate(paired);
        bodies.truncate(paired);
        Self { labels, bodies, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label and body under the cursor; `None` when empty.
    pub fn current(&self) -> Option<(&str, &ExternalMarkup)> {
        let label = self.labels.get(self.cursor)?;
        let body = self.bodies.get(self.cursor)?;
        Some((label.as_str(), body))
    }

    /// No-op on an empty set.
    pub fn next(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor + 1) % len;
    }

    /// No-op on an empty set.
    pub fn previous(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor + len - 1) % len;
    }
}

// ── CitationBrowser ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationBrowser {
    set: CitationSet,
    visible: bool,
}

impl CitationBrowser {
    pub fn set(&self) -> &CitationSet {
        &self.set
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Swap in a new answer's citations, cursor back at the first entry.
    pub fn replace(&mut self, set: CitationSet) {
        self.set = set;
        self.set.cursor = 0;
    }

    /// Show the browser for `trigger`. Refused when there is nothing to show
    /// or the trigger is not an answer from a real dispatch.
    pub fn open(&mut self, trigger: Option<&Message>) -> bool {
        let permitted = !self.set.is_empty() && trigger.is_some_and(Message::is_answer);
        if permitted {
            self.visible = true;
        }
        permitted
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn next(&mut self) {
        self.set.next();
    }

    pub fn previous(&mut self) {
        self.set.previous();
    }
}
