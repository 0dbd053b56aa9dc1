//! Scrape the teisho podcast listing, download each episode and tag it.
//!
//! The pipeline is strictly sequential: [`links`] finds episodes in the
//! listing page, [`infer`] turns filenames into dates, [`ordering`] numbers
//! the tracks, [`download`] fetches the audio and [`tagger`] writes ID3v2
//! frames. [`batch`] wires them together.

pub mod batch;
pub mod config;
pub mod download;
pub mod episode;
pub mod error;
pub mod infer;
pub mod links;
pub mod ordering;
pub mod platform;
pub mod tagger;

pub use batch::{Batch, BatchReport, EpisodeReport};
pub use config::Config;
pub use episode::{Episode, Link};
pub use error::BatchError;
