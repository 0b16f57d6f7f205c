#![forbid(unsafe_code)]

//! Axum backend for TutorTube.
//!
//! The only API surface is `/api/search`, which runs the discovery pipeline
//! against the external video search provider; everything else served here is
//! the static frontend bundle. No state survives a request: there is no
//! cache, no session affinity and no persistence.

use std::{
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use mime_guess::MimeGuess;
use serde::Deserialize;
use tokio::{fs::File, signal};
use tokio_util::io::ReaderStream;
use tutortube_tools::config::{RuntimeOverrides, resolve_runtime_settings};
use tutortube_tools::discovery::{DiscoveryResponse, Mode, discover};
use tutortube_tools::security::ensure_not_root;
use tutortube_tools::youtube::{SearchProvider, YoutubeSearchClient};

#[derive(Debug, Clone)]
struct BackendArgs {
    www_root: PathBuf,
    tutortube_port: u16,
    listen_host: IpAddr,
}

impl BackendArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(std::env::args().skip(1))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut www_root_override: Option<PathBuf> = None;
        let mut port_override: Option<u16> = None;
        let mut host_override: Option<IpAddr> = None;
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            if let Some(value) = arg.strip_prefix("--www-root=") {
                www_root_override = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = arg.strip_prefix("--port=") {
                port_override = Some(parse_port_arg(value)?);
                continue;
            }
            if let Some(value) = arg.strip_prefix("--host=") {
                host_override = Some(parse_host_arg(value)?);
                continue;
            }

            match arg.as_str() {
                "--www-root" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--www-root requires a value"))?;
                    www_root_override = Some(PathBuf::from(value));
                }
                "--port" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--port requires a value"))?;
                    port_override = Some(parse_port_arg(&value)?);
                }
                "--host" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--host requires a value"))?;
                    host_override = Some(parse_host_arg(&value)?);
                }
                _ => return Err(anyhow!("unknown argument: {arg}")),
            }
        }

        let settings = resolve_runtime_settings(RuntimeOverrides {
            www_root: www_root_override.clone(),
            ..RuntimeOverrides::default()
        })?;
        let runtime_host = parse_host_arg(&settings.tutortube_host)?;
        let www_root = www_root_override.unwrap_or(settings.www_root);
        let tutortube_port = port_override.unwrap_or(settings.tutortube_port);
        let listen_host = host_override.unwrap_or(runtime_host);

        Ok(Self {
            www_root,
            tutortube_port,
            listen_host,
        })
    }
}

fn parse_port_arg(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .context("expected a numeric port between 0 and 65535")
}

fn parse_host_arg(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .context("expected a valid IPv4 or IPv6 address for --host/TUTORTUBE_HOST")
}

/// Shared state injected into every Axum handler.
///
/// The provider is behind a trait object so tests can swap the real scraping
/// client for a stub.
#[derive(Clone)]
struct AppState {
    provider: Arc<dyn SearchProvider>,
    www_root: Arc<PathBuf>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a 400 error with the provided message.
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Creates a 404 error with the provided message.
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Creates a 500 error with the provided message.
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, headers, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The resolved listen address. `BackendArgs` already applied the full
/// precedence chain (CLI flag > process env > `.env` file > default), so
/// nothing is consulted again here.
fn listen_addr(args: &BackendArgs) -> SocketAddr {
    SocketAddr::new(args.listen_host, args.tutortube_port)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = BackendArgs::parse()?;

    ensure_not_root("backend")?;

    let provider = YoutubeSearchClient::new().context("initializing search client")?;

    let state = AppState {
        provider: Arc::new(provider),
        www_root: Arc::new(args.www_root.clone()),
    };

    let app = Router::new()
        .route("/api/search", get(search))
        .fallback(static_fallback)
        .with_state(state);

    let addr = listen_addr(&args);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    println!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    // We do not propagate this error up because it only affects graceful
    // shutdown; the process still terminates when Ctrl+C fires.
    if let Err(err) = signal::ctrl_c().await {
        eprintln!("Failed to install Ctrl+C handler: {}", err);
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    result_type: Option<String>,
}

/// `GET /api/search?q=...&type=...`
///
/// Validates the query at the boundary so the pipeline only ever sees
/// trimmed, non-empty input, then runs one discovery pass. Provider failures
/// surface as a 500 with the underlying message; the provider call is never
/// made for an invalid query.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<DiscoveryResponse>> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Missing search query"));
    }

    let mode = Mode::from_param(params.result_type.as_deref());
    let response = discover(state.provider.as_ref(), query, mode)
        .await
        .map_err(|err| {
            eprintln!("Search request failed: {err}");
            ApiError::internal(err.to_string())
        })?;

    Ok(Json(response))
}

async fn static_fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    let path = req.uri().path();
    if path == "/api" || path.starts_with("/api/") {
        return ApiError::not_found("endpoint not found").into_response();
    }

    match serve_www_path(&state.www_root, path).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn serve_www_path(root: &Path, request_path: &str) -> ApiResult<Response> {
    let target = resolve_www_path(root, request_path)?;
    let metadata = tokio::fs::metadata(&target).await;

    match metadata {
        Ok(meta) if meta.is_dir() => {
            let index = root.join("index.html");
            stream_file(index).await
        }
        Ok(_) => stream_file(target).await,
        Err(_) => {
            if should_fallback_to_index(request_path) {
                let index = root.join("index.html");
                stream_file(index).await
            } else {
                Err(ApiError::not_found("file not found"))
            }
        }
    }
}

fn resolve_www_path(root: &Path, request_path: &str) -> ApiResult<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(root.join("index.html"));
    }
    let candidate = Path::new(trimmed);
    if candidate
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(root.join(candidate))
}

fn should_fallback_to_index(request_path: &str) -> bool {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return true;
    }
    let candidate = Path::new(trimmed);
    let has_extension = candidate.extension().is_some();
    !has_extension
}

async fn stream_file(path: PathBuf) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;

    let guessed = MimeGuess::from_path(&path).first();
    let stream = ReaderStream::new(file);
    let mut response = Body::from_stream(stream).into_response();
    if let Some(mime) = guessed
        && let Ok(value) = mime.to_string().parse()
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }

    Ok(response)
}
