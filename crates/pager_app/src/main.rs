mod config;
mod input;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use futures_util::StreamExt;
use log::LevelFilter;
use pager_engine::{paginated_search, GitHubFetcher, Repository};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::load_config;
use crate::input::{forward_lines, gated_trigger, wait_until_settled};
use crate::render::Renderer;

/// Search GitHub repositories page by page.
///
/// Type a query to start a new search, an empty line or `:more` to load the
/// next page, `:quit` to exit.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Initial search text.
    query: Option<String>,

    /// RON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    engine_logging::initialize(config.log_destination(), level);

    let fetcher =
        GitHubFetcher::new(config.fetch_settings()).context("failed to build HTTP client")?;

    let (query_tx, query_rx) = mpsc::unbounded_channel();
    let (more_tx, more_rx) = mpsc::unbounded_channel();
    if let Some(query) = &args.query {
        query_tx.send(query.clone()).context("query channel closed")?;
    }

    let system = paginated_search::<Repository>(
        UnboundedReceiverStream::new(query_rx).boxed(),
        gated_trigger(more_rx),
        Arc::new(fetcher),
    );

    let mut states = system.subscribe();
    let printer = tokio::spawn(async move {
        let mut renderer = Renderer::new();
        while let Some(state) = states.next().await {
            for line in renderer.render(&state) {
                println!("{line}");
            }
        }
    });

    let typed = forward_lines(BufReader::new(tokio::io::stdin()), query_tx, more_tx)
        .await
        .context("failed to read input")?;

    // Let the page requested last arrive before exiting, so piped input
    // still prints its results.
    if let Some(query) = typed.or(args.query) {
        let limit = config.fetch_settings().request_timeout;
        if wait_until_settled(system.subscribe(), &query, limit).await.is_none() {
            engine_warn!("Gave up waiting for the pending page after {:?}", limit);
        }
    }

    engine_info!("Input closed, shutting down");
    system.shutdown();
    drop(system);
    if printer.await.is_err() {
        engine_warn!("Output task ended abnormally");
    }
    Ok(())
}
