use std::fmt;
use std::path::PathBuf;

/// Album bucket shared by every episode recorded before 2007.
pub const PRE_MILLENNIAL_ALBUM: i32 = 1970;

/// First year with its own album.
pub const FIRST_YEARLY_ALBUM: i32 = 2007;

/// Anchor found in the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: String,
    /// 1-based position among the matched links, in page order.
    pub discovery_index: usize,
}

/// One downloadable episode with its inferred metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub source_url: String,
    pub title: String,
    pub discovery_index: usize,
    /// Last path segment of `source_url`, e.g. `2005-3-talk.mp3`.
    pub derived_name: String,
    pub year: i32,
    pub month: u32,
    pub album: i32,
    /// Assigned by [`crate::ordering::assign_tracks`]; 0 until then.
    pub track: u32,
    pub destination: PathBuf,
}

impl Episode {
    pub fn is_pre_millennial(&self) -> bool {
        self.album == PRE_MILLENNIAL_ALBUM
    }

    /// Album name written to the tag: `"Teishos (2009)"` or
    /// `"Teishos (pre-millennial)"`.
    pub fn album_name(&self, prefix: &str) -> String {
        if self.is_pre_millennial() {
            format!("{} (pre-millennial)", prefix)
        } else {
            format!("{} ({})", prefix, self.year)
        }
    }
}

/// Collapse years before 2007 into the shared pre-millennial bucket.
pub fn album_for_year(year: i32) -> i32 {
    if year < FIRST_YEARLY_ALBUM {
        PRE_MILLENNIAL_ALBUM
    } else {
        year
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Episode [idx={}, name={}, title={}, year={}, month={}, track={}]",
            self.discovery_index, self.derived_name, self.title, self.year, self.month, self.track
        )
    }
}

#[cfg(test)]
pub(crate) fn sample(discovery_index: usize, year: i32, month: u32) -> Episode {
    let derived_name = format!("{}-{}-talk-{}.mp3", year, month, discovery_index);
    Episode {
        source_url: format!("http://example.com/{}", derived_name),
        title: format!("Talk {}", discovery_index),
        discovery_index,
        destination: PathBuf::from("/tmp").join(year.to_string()).join(&derived_name),
        derived_name,
        year,
        month,
        album: album_for_year(year),
        track: 0,
    }
}
