//! Script-state layout: the page hydrates from a JSON blob assigned to a
//! global, e.g. `window.__TIMES_STATE__ = {...};</script>`.
//!
//! The puzzles sit at a fixed depth in that blob:
//! `body[*].children[0].children[name == sentinel].children[0]`, each
//! carrying `url` and `headline`. The shape belongs to the publisher and
//! may change without notice; a changed shape shows up as an empty list.

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExtractError, PageExtractor};
use crate::models::PuzzleEntry;

#[derive(Debug, Deserialize)]
struct StateBlob {
    #[serde(default)]
    body: Vec<StateNode>,
}

#[derive(Debug, Deserialize)]
struct StateNode {
    name: Option<String>,
    #[serde(default)]
    children: Vec<StateNode>,
    url: Option<String>,
    headline: Option<String>,
}

/// Reads puzzles from the embedded page state.
#[derive(Debug, Clone)]
pub struct EmbeddedStateExtractor {
    global: String,
    sentinel: String,
    assignment: Regex,
    pattern: Regex,
}

impl EmbeddedStateExtractor {
    /// `global` is the variable name after `window.`; `sentinel` is the
    /// `name` marking puzzle containers.
    pub fn new(global: &str, sentinel: &str) -> Result<Self, ExtractError> {
        let assignment = Regex::new(&format!(r"window\.{}\s*=", regex::escape(global)))?;
        // `.` stops at newlines: the blob is expected on a single line.
        let pattern = Regex::new(&format!(
            r"window\.{}\s*=\s*(\{{.*?\}});?\s*</script>",
            regex::escape(global)
        ))?;

        Ok(Self {
            global: global.to_string(),
            sentinel: sentinel.to_string(),
            assignment,
            pattern,
        })
    }

    /// Whether the page assigns the state global at all, readable or not.
    pub fn has_state(&self, page: &str) -> bool {
        self.assignment.is_match(page)
    }

    fn capture_state<'a>(&self, page: &'a str) -> Result<&'a str, ExtractError> {
        self.pattern
            .captures(page)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ExtractError::StateNotFound(self.global.clone()))
    }

    fn puzzle_nodes<'a>(&self, blob: &'a StateBlob) -> impl Iterator<Item = &'a StateNode> + 'a {
        let sentinel = self.sentinel.clone();
        blob.body
            .iter()
            .filter_map(|section| section.children.first())
            .flat_map(|column| column.children.iter())
            .filter(move |card| card.name.as_deref() == Some(sentinel.as_str()))
            .filter_map(|card| card.children.first())
    }
}

impl PageExtractor for EmbeddedStateExtractor {
    fn name(&self) -> &'static str {
        "embedded-json"
    }

    fn extract(&self, page: &str) -> Result<Vec<PuzzleEntry>, ExtractError> {
        let raw = self.capture_state(page)?;
        debug!("Captured {} bytes of embedded state", raw.len());

        let blob: StateBlob = serde_json::from_str(raw)?;

        let mut entries = Vec::new();
        for node in self.puzzle_nodes(&blob) {
            match (&node.url, &node.headline) {
                (Some(url), Some(headline)) => {
                    entries.push(PuzzleEntry::new(url.clone(), headline.trim()));
                }
                _ => warn!("Skipping puzzle node without url/headline: {:?}", node.name),
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> EmbeddedStateExtractor {
        EmbeddedStateExtractor::new("__TIMES_STATE__", "Puzzle").unwrap()
    }

    fn page_with_state(state: &str) -> String {
        format!(
            "<html><head><script src=\"/app.js\"></script>\n<script>window.__TIMES_STATE__ = {};</script>\n</head><body><div id=\"root\"></div></body></html>",
            state
        )
    }

    #[test]
    fn test_single_puzzle_node() {
        let state = r#"{"body":[{"children":[{"children":[{"name":"Puzzle","children":[{"url":"https://cdn.example.com/crossword-1.pdf","headline":"1 January 2024"}]}]}]}]}"#;
        let entries = extractor().extract(&page_with_state(state)).unwrap();

        assert_eq!(
            entries,
            vec![PuzzleEntry::new(
                "https://cdn.example.com/crossword-1.pdf",
                "1 January 2024"
            )]
        );
    }

    #[test]
    fn test_only_sentinel_children_kept() {
        let state = r#"{"body":[
            {"children":[{"children":[
                {"name":"Advert","children":[{"url":"https://ads.example.com","headline":"Buy now"}]},
                {"name":"Puzzle","children":[{"url":"https://cdn.example.com/a.pdf","headline":"1 January 2024"}]},
                {"name":"Puzzle","children":[{"url":"https://cdn.example.com/b.pdf","headline":" 2 January 2024 "}]}
            ]}]},
            {"children":[{"children":[
                {"name":"Puzzle","children":[{"url":"https://cdn.example.com/c.pdf","headline":"3 January 2024"}]}
            ]}, {"children":[
                {"name":"Puzzle","children":[{"url":"https://cdn.example.com/ignored.pdf","headline":"4 January 2024"}]}
            ]}]}
        ]}"#
        .replace('\n', "");
        let entries = extractor().extract(&page_with_state(&state)).unwrap();

        let urls: Vec<&str> = entries.iter().map(|e| e.download_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/a.pdf",
                "https://cdn.example.com/b.pdf",
                "https://cdn.example.com/c.pdf",
            ]
        );
        assert_eq!(entries[1].raw_date_text, "2 January 2024");
    }

    #[test]
    fn test_changed_shape_is_empty() {
        let state = r#"{"page":{"sections":[]},"body":[{"items":[]}]}"#;
        let entries = extractor().extract(&page_with_state(state)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_node_missing_headline_skipped() {
        let state = r#"{"body":[{"children":[{"children":[{"name":"Puzzle","children":[{"url":"https://cdn.example.com/a.pdf"}]}]}]}]}"#;
        let entries = extractor().extract(&page_with_state(state)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_assignment() {
        let result = extractor().extract("<html><script>window.__OTHER__ = {};</script></html>");
        assert!(matches!(result, Err(ExtractError::StateNotFound(g)) if g == "__TIMES_STATE__"));
    }

    #[test]
    fn test_has_state() {
        let extractor = extractor();

        assert!(extractor.has_state(&page_with_state(r#"{"body":[]}"#)));
        assert!(extractor.has_state("<script>window.__TIMES_STATE__ = {\n};</script>"));
        assert!(!extractor.has_state("<script>window.__OTHER__ = {};</script>"));
        assert!(!extractor.has_state("<table><tr><th>Date</th></tr></table>"));
    }

    #[test]
    fn test_multiline_state_not_captured() {
        let page = "<script>window.__TIMES_STATE__ = {\n\"body\": []\n};</script>";
        assert!(matches!(
            extractor().extract(page),
            Err(ExtractError::StateNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let page = page_with_state("{body: [undefined]}");
        assert!(matches!(extractor().extract(&page), Err(ExtractError::Json(_))));
    }

    #[test]
    fn test_global_name_is_escaped() {
        let extractor = EmbeddedStateExtractor::new("app.state", "Puzzle").unwrap();
        let page = "<script>window.appXstate = {\"body\":[]};</script>";
        assert!(matches!(
            extractor.extract(page),
            Err(ExtractError::StateNotFound(_))
        ));
    }
}
