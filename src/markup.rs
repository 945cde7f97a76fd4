//! Line-oriented parser for the constrained relationship markup.
//!
//! The grammar is deliberately narrow: a line is accepted only when it
//! contains exactly two node expressions (`ID[..]`, `ID{..}` or `ID(..)`),
//! with the arrow label extracted from the text between them. Everything the
//! parser cannot recognize is skipped, never raised.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Edge, Person};

/// Gender markers reserved by the content grammar.
pub const GENDER_MARKERS: [char; 3] = ['M', 'F', 'U'];

static NODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // An id token followed by a *matching* bracket pair with lazy interior.
    Regex::new(r"(?s)([A-Z0-9]+)(?:\[(.*?)\]|\{(.*?)\}|\((.*?)\))").expect("valid regex")
});

static ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+\s*(.*?)\s*-+>").expect("valid regex"));

static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*?)([MFU])([-:])(.*)$").expect("valid regex"));

/// Outcome of parsing one markup line.
///
/// Skipping is a policy, not a failure; keeping it a tagged variant makes the
/// drop rules explicit and testable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineParse {
    Edge(Edge),
    Skipped,
}

impl LineParse {
    pub fn into_edge(self) -> Option<Edge> {
        match self {
            LineParse::Edge(edge) => Some(edge),
            LineParse::Skipped => None,
        }
    }
}

/// Split a node's bracket interior into `(name, title)`.
///
/// The first occurrence of a gender marker (`M`/`F`/`U`, case-insensitive)
/// immediately followed by `-` or `:` wins; text before it is the name, text
/// after the separator is the title. A name that legitimately contains a
/// marker+separator substring will misfire here. That is a known grammar
/// ambiguity inherited from the markup convention, left as-is on purpose.
pub fn split_node_content(content: &str) -> (String, String) {
    if let Some(caps) = CONTENT_RE.captures(content) {
        let name = caps[1].trim().to_string();
        let title = caps[4].trim().to_string();
        return (name, title);
    }
    (content.trim().to_string(), String::new())
}

/// Parse one line into an [`Edge`] or [`LineParse::Skipped`].
pub fn parse_line(line: &str) -> LineParse {
    let line = line.trim();
    if line.is_empty()
        || line.starts_with("style")
        || line.starts_with("%%")
        || line.starts_with("graph")
        || line.starts_with("```")
    {
        return LineParse::Skipped;
    }

    let mut nodes = Vec::new();
    for caps in NODE_RE.captures_iter(line) {
        let whole = caps.get(0).expect("capture 0 always present");
        let id = caps[1].to_string();
        let content = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        nodes.push((whole.start(), whole.end(), id, content));
        if nodes.len() > 2 {
            // Three or more node expressions never form an edge.
            return LineParse::Skipped;
        }
    }

    let [(_, left_end, left_id, left_content), (right_start, _, right_id, right_content)] =
        match <[_; 2]>::try_from(nodes) {
            Ok(pair) => pair,
            Err(_) => return LineParse::Skipped,
        };

    let relation_raw = &line[left_end..right_start];
    let relation = ARROW_RE
        .captures(relation_raw)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default();

    let (left_name, left_title) = split_node_content(&left_content);
    let (right_name, right_title) = split_node_content(&right_content);

    LineParse::Edge(Edge {
        left: Person {
            id: left_id,
            name: left_name,
            title: left_title,
        },
        right: Person {
            id: right_id,
            name: right_name,
            title: right_title,
        },
        relation,
    })
}

/// Parse the full markup text into the ordered edge sequence.
///
/// Edge order is source line order; malformed lines degrade to "no edge
/// produced for this line" and are never fatal.
pub fn parse_markup(text: &str) -> Vec<Edge> {
    text.lines()
        .filter_map(|line| parse_line(line).into_edge())
        .collect()
}
