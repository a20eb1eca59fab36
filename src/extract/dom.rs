//! Table layout: every puzzle is a link inside a table cell.

use scraper::{Html, Selector};

use super::{ExtractError, PageExtractor};
use crate::models::PuzzleEntry;

/// Reads `table tr td a` anchors; the link text carries the date.
#[derive(Debug, Clone, Default)]
pub struct DomExtractor;

impl DomExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for DomExtractor {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn extract(&self, page: &str) -> Result<Vec<PuzzleEntry>, ExtractError> {
        let document = Html::parse_document(page);
        let link_sel = Selector::parse("table tr td a").unwrap();

        let entries = document
            .select(&link_sel)
            .filter_map(|link_el| {
                let href = link_el.value().attr("href")?;
                let text = link_el.text().collect::<String>().trim().to_string();
                Some(PuzzleEntry::new(href, text))
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_html() -> &'static str {
        r#"
        <html>
        <body>
        <h1>Printable puzzles</h1>
        <a href="/puzzles/archive">Archive</a>
        <table class="puzzles">
            <tr>
                <th>Date</th>
            </tr>
            <tr>
                <td>
                    <a href="https://www.example.com/puzzles/crossword-20240101.pdf">
                        1 January 2024
                    </a>
                </td>
            </tr>
            <tr>
                <td><a href="/puzzles/crossword-20240102.pdf">2 January 2024</a></td>
            </tr>
            <tr>
                <td><a name="anchor-only">3 January 2024</a></td>
            </tr>
        </table>
        </body>
        </html>
        "#
    }

    #[test]
    fn test_extract_table_links() {
        let entries = DomExtractor::new().extract(sample_html()).unwrap();

        assert_eq!(
            entries,
            vec![
                PuzzleEntry::new(
                    "https://www.example.com/puzzles/crossword-20240101.pdf",
                    "1 January 2024"
                ),
                PuzzleEntry::new("/puzzles/crossword-20240102.pdf", "2 January 2024"),
            ]
        );
    }

    #[test]
    fn test_links_outside_table_ignored() {
        let html = r#"<html><body><a href="/a.pdf">1 January 2024</a></body></html>"#;
        assert!(DomExtractor::new().extract(html).unwrap().is_empty());
    }

    #[test]
    fn test_extract_empty_html() {
        let entries = DomExtractor::new()
            .extract("<html><body></body></html>")
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_nested_markup_in_link_text() {
        let html = r#"<table><tr><td><a href="/x.pdf"><span>Friday</span> 5 January 2024</a></td></tr></table>"#;
        let entries = DomExtractor::new().extract(html).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].raw_date_text, "Friday 5 January 2024");
    }
}
