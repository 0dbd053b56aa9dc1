#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use teisho_core::config::Config;
use teisho_core::{Episode, Link};

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, joint stereo, no padding.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const FRAME_LEN: usize = 417;

/// A short run of silent MPEG frames that lofty reads as an mp3.
pub fn silent_mp3() -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);
    frame.repeat(24)
}

#[derive(Clone)]
struct ServerState {
    base: String,
    listing: Arc<String>,
    audio_hits: Arc<AtomicUsize>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub audio_hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base(), path)
    }

    pub fn hits(&self) -> usize {
        self.audio_hits.load(Ordering::SeqCst)
    }
}

/// Serve a listing page plus audio, redirect, 403 and 500 endpoints.
///
/// `{base}` in `listing` is replaced with the server's own base URL.
pub async fn start_server(listing: &str) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{}", addr);
    let audio_hits = Arc::new(AtomicUsize::new(0));

    let state = ServerState {
        listing: Arc::new(listing.replace("{base}", &base)),
        base,
        audio_hits: audio_hits.clone(),
    };

    let app = Router::new()
        .route("/listing", get(serve_listing))
        .route("/audio/:name", get(serve_audio))
        .route("/hop1/:name", get(hop1))
        .route("/hop2/:name", get(hop2))
        .route("/loop", get(redirect_loop))
        .route("/temporary/:name", get(temporary))
        .route("/no-location/:name", get(no_location))
        .route("/forbidden/:name", get(forbidden))
        .route("/broken/:name", get(broken))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, audio_hits }
}

async fn serve_listing(State(state): State<ServerState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        state.listing.as_str().to_owned(),
    )
}

async fn serve_audio(State(state): State<ServerState>, UrlPath(_name): UrlPath<String>) -> Response {
    state.audio_hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "audio/mpeg")], silent_mp3()).into_response()
}

/// Relative redirect to the second hop.
async fn hop1(UrlPath(name): UrlPath<String>) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, format!("/hop2/{}", name))],
    )
        .into_response()
}

/// Absolute redirect to the audio.
async fn hop2(State(state): State<ServerState>, UrlPath(name): UrlPath<String>) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, format!("{}/audio/{}", state.base, name))],
    )
        .into_response()
}

async fn redirect_loop() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/loop")]).into_response()
}

async fn temporary(UrlPath(name): UrlPath<String>) -> Response {
    (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, format!("/audio/{}", name))],
    )
        .into_response()
}

async fn no_location(UrlPath(_name): UrlPath<String>) -> StatusCode {
    StatusCode::SEE_OTHER
}

async fn forbidden(UrlPath(_name): UrlPath<String>) -> StatusCode {
    StatusCode::FORBIDDEN
}

async fn broken(UrlPath(_name): UrlPath<String>) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// A local address nothing listens on, so connecting is refused.
pub fn dead_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn config_for(target_dir: &Path, listing_url: &str, mirror_base: &str) -> Config {
    let mut config = Config::default();
    config.paths.target_dir = target_dir.to_path_buf();
    config.source.listing_url = listing_url.to_string();
    config.source.mirror_base = mirror_base.to_string();
    config.source.max_redirects = 5;
    config
}

/// Infer an episode for `url` under `target_dir`, creating its year dir.
pub fn episode_for(url: &str, target_dir: &Path) -> Episode {
    let link = Link {
        url: url.to_string(),
        title: "Test talk".to_string(),
        discovery_index: 1,
    };
    let episode = teisho_core::infer::Inferencer::new()
        .infer(link, target_dir)
        .unwrap();
    std::fs::create_dir_all(episode.destination.parent().unwrap()).unwrap();
    episode
}
