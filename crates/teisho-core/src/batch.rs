//! Batch orchestration: list, infer, order, then download and tag each
//! episode in turn.

use std::fmt;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::download::{DownloadOutcome, Downloader};
use crate::episode::{Episode, Link};
use crate::error::BatchError;
use crate::infer::Inferencer;
use crate::links::LinkExtractor;
use crate::ordering::assign_tracks;
use crate::tagger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Listing,
    Inferring,
    Ordering,
    Processing,
    Reporting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Listing => "listing",
            Phase::Inferring => "inferring",
            Phase::Ordering => "ordering",
            Phase::Processing => "processing",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Final state of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeReport {
    pub episode: Episode,
    pub outcome: DownloadOutcome,
    pub tagged: bool,
    /// Download or tagging failure, for manual follow-up.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub episodes: Vec<EpisodeReport>,
}

impl BatchReport {
    pub fn found(&self) -> usize {
        self.episodes.len()
    }

    pub fn downloaded(&self) -> usize {
        self.episodes
            .iter()
            .filter(|r| matches!(r.outcome, DownloadOutcome::Downloaded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.episodes
            .iter()
            .filter(|r| r.outcome == DownloadOutcome::AlreadyPresent)
            .count()
    }

    pub fn tagged(&self) -> usize {
        self.episodes.iter().filter(|r| r.tagged).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EpisodeReport> {
        self.episodes.iter().filter(|r| r.error.is_some())
    }
}

pub struct Batch {
    config: Config,
    listing_client: Client,
    extractor: LinkExtractor,
    inferencer: Inferencer,
    downloader: Downloader,
}

impl Batch {
    pub fn new(config: Config) -> Result<Self, BatchError> {
        let listing_client = Client::builder().build().map_err(BatchError::Client)?;
        let downloader = Downloader::new(&config.source)?;

        Ok(Self {
            config,
            listing_client,
            extractor: LinkExtractor::new(),
            inferencer: Inferencer::new(),
            downloader,
        })
    }

    /// Fetch the listing page and process every episode on it.
    pub async fn run(&self) -> Result<BatchReport, BatchError> {
        enter(Phase::Listing);
        let page = self.fetch_listing().await?;
        self.run_page(&page).await
    }

    /// Process the episodes linked from an already fetched listing page.
    pub async fn run_page(&self, page: &str) -> Result<BatchReport, BatchError> {
        let links: Vec<Link> = self.extractor.extract(page.lines()).collect();
        info!("{} podcasts found. Processing.", links.len());

        enter(Phase::Inferring);
        let mut episodes = self.infer_all(links).await?;

        enter(Phase::Ordering);
        assign_tracks(&mut episodes);

        enter(Phase::Processing);
        let mut report = BatchReport::default();
        for (i, episode) in episodes.into_iter().enumerate() {
            info!("{}. Processing: {}", i + 1, episode);
            report.episodes.push(self.process(episode).await?);
        }

        enter(Phase::Reporting);
        for failed in report.failures() {
            warn!(
                "Podcast in error: {} | {}",
                failed.episode,
                failed.error.as_deref().unwrap_or_default()
            );
        }
        info!(
            "{} found, {} downloaded, {} skipped, {} tagged, {} in error",
            report.found(),
            report.downloaded(),
            report.skipped(),
            report.tagged(),
            report.failures().count()
        );

        enter(Phase::Done);
        Ok(report)
    }

    async fn fetch_listing(&self) -> Result<String, BatchError> {
        let url = &self.config.source.listing_url;
        info!("Fetching listing {}", url);

        let response = self
            .listing_client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|source| BatchError::Listing {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(BatchError::ListingStatus {
                url: url.clone(),
                status: response.status(),
            });
        }

        response.text().await.map_err(|source| BatchError::Listing {
            url: url.clone(),
            source,
        })
    }

    /// Infer every episode and create its year directory. The first
    /// unrecognized filename aborts the batch.
    async fn infer_all(&self, links: Vec<Link>) -> Result<Vec<Episode>, BatchError> {
        let target_root = &self.config.paths.target_dir;
        let mut episodes = Vec::with_capacity(links.len());

        for link in links {
            let episode = self.inferencer.infer(link, target_root)?;
            if let Some(parent) = episode.destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BatchError::io(parent, e))?;
            }
            debug!("Inferred {}", episode);
            episodes.push(episode);
        }

        Ok(episodes)
    }

    /// Download then tag one episode. Only freshly downloaded files are
    /// tagged; files already on disk are left untouched.
    pub async fn process(&self, episode: Episode) -> Result<EpisodeReport, BatchError> {
        let outcome = self.downloader.download(&episode).await?;

        let mut error = outcome.error().map(str::to_string);
        let mut tagged = false;

        if matches!(outcome, DownloadOutcome::Downloaded { .. }) {
            match tagger::write_tags(&episode, &self.config.tags).await {
                Ok(wrote) => tagged = wrote,
                Err(e) => {
                    let msg = format!("Failed to tag {}: {:#}", episode.derived_name, e);
                    warn!("{}", msg);
                    error = Some(msg);
                }
            }
        }

        Ok(EpisodeReport {
            episode,
            outcome,
            tagged,
            error,
        })
    }
}

fn enter(phase: Phase) {
    debug!("Batch phase: {}", phase);
}
