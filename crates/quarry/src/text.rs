//! Human readable text of a subtree
//!
//! Block-level elements become line breaks, inline elements run together
//! with their surroundings.

use std::sync::LazyLock;

use quarry_dom::{DomTree, NodeId};
use regex::Regex;

/// Elements rendered inline
pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdo", "big", "br", "button", "cite", "code", "dfn", "em", "i",
    "img", "input", "kbd", "label", "map", "object", "q", "samp", "script", "select", "small",
    "span", "strong", "sub", "sup", "textarea", "time", "tt", "var",
];

/// Elements that always break the line
pub const SEPARATOR_TAGS: &[&str] = &["br"];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{20}\u{09}\u{0C}\u{200B}\u{0A}\u{0D}]+").expect("whitespace pattern"));

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    /// Line break implied by a block element
    Block,
    /// Line break from a separator element
    Separator,
}

impl Part {
    fn is_text(&self) -> bool {
        matches!(self, Part::Text(_))
    }
}

/// Collapse whitespace runs the way HTML rendering does
pub fn squash_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// How structure shows up in extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Written where a block element starts or ends
    pub block_symbol: String,
    /// Written for every separator element
    pub separator_symbol: String,
    /// Squash whitespace runs and trim the result
    pub squash_space: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            block_symbol: "\n".to_string(),
            separator_symbol: "\n".to_string(),
            squash_space: true,
        }
    }
}

impl TextOptions {
    /// Line breaks only, whitespace left alone
    pub fn raw() -> Self {
        Self {
            squash_space: false,
            ..Self::default()
        }
    }

    pub fn block_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.block_symbol = symbol.into();
        self
    }

    pub fn separator_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.separator_symbol = symbol.into();
        self
    }

    pub fn squash_space(mut self, squash: bool) -> Self {
        self.squash_space = squash;
        self
    }
}

/// Text of `id`, whitespace squashed and trimmed
pub fn extract_text(tree: &DomTree, id: NodeId) -> String {
    extract_text_with(tree, id, &TextOptions::default())
}

/// Text of `id` with only the structural line breaks added
pub fn extract_raw_text(tree: &DomTree, id: NodeId) -> String {
    extract_text_with(tree, id, &TextOptions::raw())
}

pub fn extract_text_with(tree: &DomTree, id: NodeId, options: &TextOptions) -> String {
    let squash = options.squash_space;
    let mut parts = Vec::new();
    collect(tree, id, &mut parts);
    if squash {
        parts = collapse_blocks(parts);
    }
    parts = strip_markers(parts);
    if squash {
        parts = strip_markers(collapse_blocks(merge_text(parts)));
    }

    let mut out = String::new();
    for part in &parts {
        match part {
            Part::Text(t) => out.push_str(t),
            Part::Block => out.push_str(&options.block_symbol),
            Part::Separator => out.push_str(&options.separator_symbol),
        }
    }
    if squash {
        out.trim().to_string()
    } else {
        out
    }
}

fn collect(tree: &DomTree, id: NodeId, parts: &mut Vec<Part>) {
    let Some(el) = tree.element(id) else {
        return;
    };
    let tag = el.tag_name.as_str();
    let separator = SEPARATOR_TAGS.contains(&tag);
    let block = !separator && !INLINE_TAGS.contains(&tag);

    if separator {
        parts.push(Part::Separator);
    } else if block {
        parts.push(Part::Block);
    }
    if let Some(text) = tree.text(id) {
        parts.push(Part::Text(text.to_string()));
    }
    for &child in tree.children(id) {
        collect(tree, child, parts);
        if let Some(tail) = tree.tail(child) {
            parts.push(Part::Text(tail.to_string()));
        }
    }
    if block {
        parts.push(Part::Block);
    }
}

/// Fold consecutive block markers into one
fn collapse_blocks(parts: Vec<Part>) -> Vec<Part> {
    let mut out: Vec<Part> = Vec::with_capacity(parts.len());
    for part in parts {
        if part == Part::Block && out.last() == Some(&Part::Block) {
            continue;
        }
        out.push(part);
    }
    out
}

/// Drop markers before the first and after the last text; with no text at
/// all only the final marker survives
fn strip_markers(parts: Vec<Part>) -> Vec<Part> {
    let first = parts.iter().position(Part::is_text);
    let last = parts.iter().rposition(Part::is_text);
    match (first, last) {
        (Some(first), Some(last)) => parts[first..=last].to_vec(),
        _ => parts.last().cloned().into_iter().collect(),
    }
}

/// Join adjacent text parts, squash their whitespace and drop blank runs
fn merge_text(parts: Vec<Part>) -> Vec<Part> {
    let mut out = Vec::with_capacity(parts.len());
    let mut buffer = String::new();

    fn flush(buffer: &mut String, out: &mut Vec<Part>) {
        if !buffer.is_empty() {
            let squashed = squash_whitespace(buffer);
            let trimmed = squashed.trim();
            if !trimmed.is_empty() {
                out.push(Part::Text(trimmed.to_string()));
            }
            buffer.clear();
        }
    }

    for part in parts {
        match part {
            Part::Text(t) => buffer.push_str(&t),
            marker => {
                flush(&mut buffer, &mut out);
                out.push(marker);
            }
        }
    }
    flush(&mut buffer, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_html::{HtmlParser, ParserMode};

    fn text_of(markup: &str) -> (String, String) {
        let tree = HtmlParser::new(ParserMode::Html).parse(markup).unwrap();
        let root = tree.roots()[0];
        (extract_text(&tree, root), extract_raw_text(&tree, root))
    }

    #[test]
    fn test_inline_runs_together() {
        let (text, _) = text_of("<div><span>toto</span><span>tata</span></div>");
        assert_eq!(text, "tototata");
    }

    #[test]
    fn test_blocks_break_lines() {
        let (text, raw) = text_of("<div><p>toto</p><p>tata</p></div>");
        assert_eq!(text, "toto\ntata");
        assert_eq!(raw, "toto\n\ntata");
    }

    #[test]
    fn test_whitespace_is_squashed() {
        let (text, raw) = text_of("<div>  Hello \n\t <b>big</b>   world  </div>");
        assert_eq!(text, "Hello big world");
        assert_eq!(raw, "  Hello \n\t big   world  ");
    }

    #[test]
    fn test_br_is_a_separator() {
        let (text, _) = text_of("<p>one<br>two<br><br>three</p>");
        assert_eq!(text, "one\ntwo\n\nthree");
    }

    #[test]
    fn test_blank_blocks_collapse() {
        let (text, _) = text_of("<div><p>a</p>  <p> </p>\n<div><p>b</p></div></div>");
        assert_eq!(text, "a\nb");
    }

    #[test]
    fn test_comments_contribute_tail_only() {
        let (text, _) = text_of("<div>a<!-- hidden -->b</div>");
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_no_text() {
        let (text, raw) = text_of("<div><p></p></div>");
        assert_eq!(text, "");
        assert_eq!(raw, "\n");
    }

    #[test]
    fn test_custom_symbols() {
        let tree = HtmlParser::new(ParserMode::Html)
            .parse("<div><p>one<br>two</p><p> three  </p></div>")
            .unwrap();
        let root = tree.roots()[0];
        let options = TextOptions::default().block_symbol(" | ").separator_symbol("/");
        assert_eq!(extract_text_with(&tree, root, &options), "one/two | three");

        let raw = TextOptions::raw().block_symbol("#").separator_symbol("/");
        assert_eq!(extract_text_with(&tree, root, &raw), "one/two## three  ");
        assert_eq!(extract_text_with(&tree, root, &TextOptions::default()), extract_text(&tree, root));
    }

    #[test]
    fn test_zero_width_space_counts_as_whitespace() {
        assert_eq!(squash_whitespace("a\u{200B}\u{200B}b  c"), "a b c");
    }
}
