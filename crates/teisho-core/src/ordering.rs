//! Chronological ordering and per-year track numbering.

use std::cmp::{Ordering, Reverse};

use crate::episode::Episode;

/// Oldest first. Within one month the listing runs newest-first, so a
/// higher discovery index means an earlier talk and sorts first.
pub fn chronological(a: &Episode, b: &Episode) -> Ordering {
    (a.year, a.month, Reverse(a.discovery_index)).cmp(&(b.year, b.month, Reverse(b.discovery_index)))
}

/// Sort `episodes` and number them 1.. within each year.
pub fn assign_tracks(episodes: &mut [Episode]) {
    episodes.sort_by(chronological);

    let mut current_year = None;
    let mut track = 0;
    for episode in episodes.iter_mut() {
        if current_year != Some(episode.year) {
            current_year = Some(episode.year);
            track = 1;
        }
        episode.track = track;
        track += 1;
    }
}
