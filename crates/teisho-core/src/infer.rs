//! Filename date heuristics.
//!
//! Episode filenames were typed by hand over several decades. Most start
//! with `YYYY-M-` or `YYYY-MM_`, a couple of known outliers are listed
//! explicitly, and anything else is rejected.

use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::episode::{album_for_year, Episode, Link};
use crate::error::BatchError;

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2015;

const DATE_PATTERN: &str = r"^([0-9]{4})-([0-9]{1,2})[-_]";

/// Filenames that carry their date in a one-off format.
const EXACT_NAMES: &[(&str, i32, u32)] = &[("1973 Oct 6.7.mp3", 1973, 10)];

const NAME_PREFIXES: &[(&str, i32, u32)] = &[("07_10", 2007, 10)];

/// Mistyped years seen in the listing.
const YEAR_TYPOS: &[(i32, i32)] = &[(3009, 2009)];

pub struct Inferencer {
    date_pattern: Regex,
}

impl Inferencer {
    pub fn new() -> Self {
        Self {
            date_pattern: Regex::new(DATE_PATTERN).expect("date pattern is valid"),
        }
    }

    /// Raw `(year, month)` guess for a filename, `(0, 0)` when nothing
    /// matches. No typo correction or range check happens here.
    pub fn guess_date(&self, name: &str) -> (i32, u32) {
        if let Some(caps) = self.date_pattern.captures(name) {
            // Both groups are bounded runs of ASCII digits.
            let year = caps[1].parse().unwrap_or(0);
            let month = caps[2].parse().unwrap_or(0);
            return (year, month);
        }

        if let Some(&(_, year, month)) = EXACT_NAMES.iter().find(|(n, _, _)| *n == name) {
            return (year, month);
        }

        if let Some(&(_, year, month)) = NAME_PREFIXES.iter().find(|(p, _, _)| name.starts_with(p)) {
            return (year, month);
        }

        warn!("Unmatched: {}", name);
        (0, 0)
    }

    /// Build an [`Episode`] for `link`, destined for
    /// `<target_root>/<year>/<name>`.
    ///
    /// Fails with [`BatchError::BadDate`] when the year ends up outside
    /// `[MIN_YEAR, MAX_YEAR]`; that only happens for filenames none of the
    /// heuristics recognize.
    pub fn infer(&self, link: Link, target_root: &Path) -> Result<Episode, BatchError> {
        let derived_name = derived_name(&link.url).to_string();
        let (year, month) = self.guess_date(&derived_name);
        let year = correct_year(year);

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BatchError::BadDate {
                name: derived_name,
                discovery_index: link.discovery_index,
                year,
            });
        }

        let destination = target_root.join(year.to_string()).join(&derived_name);

        Ok(Episode {
            source_url: link.url,
            title: link.title,
            discovery_index: link.discovery_index,
            derived_name,
            year,
            month,
            album: album_for_year(year),
            track: 0,
            destination,
        })
    }
}

impl Default for Inferencer {
    fn default() -> Self {
        Self::new()
    }
}

/// Filename portion of a URL: everything after the last `/`.
pub fn derived_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn correct_year(year: i32) -> i32 {
    YEAR_TYPOS
        .iter()
        .find(|(typo, _)| *typo == year)
        .map(|&(_, fixed)| fixed)
        .unwrap_or(year)
}
