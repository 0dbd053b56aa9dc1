//! ID3v2.3 tagging using lofty

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use std::path::Path;
use tracing::info;

use crate::config::TagsConfig;
use crate::episode::Episode;

/// Replace the ID3v2 tag of a downloaded episode.
///
/// Writes album artist, title, album, year and track. Returns `Ok(false)`
/// without touching anything when the file is not on disk.
pub async fn write_tags(episode: &Episode, tags: &TagsConfig) -> Result<bool> {
    if !episode.destination.exists() {
        return Ok(false);
    }

    info!("Tagging: {} with title: {}", episode.derived_name, episode.title);

    // Use blocking task for file I/O
    let path = episode.destination.clone();
    let tag = build_tag(episode, tags);

    tokio::task::spawn_blocking(move || write_tag_blocking(&path, tag))
        .await
        .context("Tag writing task failed")??;

    info!("Tagging: {} complete.", episode.derived_name);
    Ok(true)
}

/// Fresh tag for `episode`; nothing is carried over from the file.
pub fn build_tag(episode: &Episode, tags: &TagsConfig) -> Tag {
    let mut tag = Tag::new(TagType::Id3v2);
    tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
    tag.insert_text(ItemKey::TrackTitle, episode.title.clone());
    tag.insert_text(ItemKey::AlbumTitle, episode.album_name(&tags.album_prefix));
    // Lands in TYER once saved as ID3v2.3.
    tag.insert_text(ItemKey::Year, episode.year.to_string());
    tag.insert_text(ItemKey::TrackNumber, episode.track.to_string());
    tag
}

fn write_tag_blocking(file_path: &Path, tag: Tag) -> Result<()> {
    // Refuse anything that doesn't parse as audio, e.g. an HTML error page
    // served with a 200.
    let tagged_file = Probe::open(file_path)?
        .read()
        .with_context(|| format!("Failed to read audio file {}", file_path.display()))?;

    if !tagged_file.supports_tag_type(TagType::Id3v2) {
        anyhow::bail!(
            "{} ({:?}) does not support ID3v2 tags",
            file_path.display(),
            tagged_file.file_type()
        );
    }

    tag.save_to_path(file_path, WriteOptions::default().use_id3v23(true))
        .with_context(|| format!("Failed to save tags to {}", file_path.display()))?;

    Ok(())
}

/// Read back the ID3v2 fields this module writes.
///
/// Verification helper for tests and manual checks; the batch itself never
/// reads tags.
pub fn read_tags(file_path: &Path) -> Result<ReadTags> {
    let tagged_file = Probe::open(file_path)?
        .read()
        .context("Failed to read audio file")?;

    let tag = tagged_file
        .tag(TagType::Id3v2)
        .context("No ID3v2 tag found")?;

    let get_text = |key: &ItemKey| -> Option<String> { tag.get_string(key).map(|s| s.to_string()) };

    Ok(ReadTags {
        album_artist: get_text(&ItemKey::AlbumArtist),
        title: get_text(&ItemKey::TrackTitle),
        album: get_text(&ItemKey::AlbumTitle),
        // Readers may surface TYER as a recording date.
        year: get_text(&ItemKey::Year)
            .or_else(|| get_text(&ItemKey::RecordingDate))
            .and_then(|d| d.get(..4)?.parse().ok()),
        track: tag.track(),
    })
}

/// Fields returned by [`read_tags`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadTags {
    pub album_artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub track: Option<u32>,
}
