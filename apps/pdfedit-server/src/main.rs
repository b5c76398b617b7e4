//! pdfedit Server
//!
//! A small web application for page-level PDF editing. A user uploads a
//! PDF, sees its pages as a list and can:
//!
//! - Rotate a page 90° clockwise
//! - Delete a page (the last remaining page cannot be deleted)
//! - Move a page up or down
//! - Download the result, which removes the session from the server
//!
//! Sessions live on disk under the data directory; every edit is
//! persisted before the next page is rendered.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use pdfedit_core::Editor;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod download;
mod error;
mod html;

const DEFAULT_LOG_DIRECTIVES: &str = "pdfedit_server=info,pdfedit_core=info,tower_http=debug";

/// Command-line arguments for the pdfedit server
#[derive(Parser, Debug)]
#[command(name = "pdfedit-server")]
#[command(about = "Upload a PDF, rotate, delete and reorder its pages, download the result")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5001")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFEDIT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory holding session files
    #[arg(long, env = "PDFEDIT_DATA_DIR", default_value = "./uploads")]
    data_dir: String,

    /// Maximum upload size in megabytes
    #[arg(long, env = "PDFEDIT_MAX_UPLOAD_MB", default_value = "20")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub editor: Arc<Editor>,
    /// Request body limit for uploads, in bytes
    pub max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    let filter = if args.verbose {
        filter.add_directive(Level::DEBUG.into())
    } else {
        filter
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfedit server on {}:{}", args.host, args.port);

    let editor = Editor::open(&args.data_dir)?;
    let state = AppState {
        editor: Arc::new(editor),
        max_upload_bytes: args.max_upload_mb * 1024 * 1024,
    };

    let app = api::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Session data directory: {}", args.data_dir);
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
