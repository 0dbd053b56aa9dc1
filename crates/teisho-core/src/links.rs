//! Episode link extraction from the listing page.

use regex::Regex;

use crate::episode::Link;

/// Matches `<a href="...mp3" ...>title</a>`. The leading `.*` is greedy so a
/// line carrying several anchors yields its last one.
const LINK_PATTERN: &str = r#".*<a href="([^"]+\.mp3)"[^>]*>([^<]*)</a>"#;

pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LINK_PATTERN).expect("link pattern is valid"),
        }
    }

    /// Match a single line, returning `(url, title)`.
    pub fn match_line(&self, line: &str) -> Option<(String, String)> {
        let caps = self.pattern.captures(line)?;
        Some((caps[1].to_string(), caps[2].to_string()))
    }

    /// Lazily scan `lines`, numbering matches from 1 in page order.
    pub fn extract<'a, I>(&'a self, lines: I) -> impl Iterator<Item = Link> + 'a
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: 'a,
    {
        lines
            .into_iter()
            .filter_map(move |line| self.match_line(line))
            .enumerate()
            .map(|(i, (url, title))| Link {
                url,
                title,
                discovery_index: i + 1,
            })
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}
