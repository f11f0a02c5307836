//! `dehug` - command line front end of the DeHug SDK

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dehug_sdk::{
    ContentKind, ContentUploadRequest, DeHugClient, DeHugConfig, DownloadSource, TrackerClient,
};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dehug", version, about = "Register and retrieve DeHug datasets and models")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "DEHUG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register content on the registry contract
    Upload {
        /// `dataset` or `model`
        #[arg(long)]
        kind: ContentKind,
        /// IPFS CID of the content
        #[arg(long)]
        content: String,
        /// IPFS CID of the metadata document
        #[arg(long)]
        metadata: String,
        /// IPFS CID of the cover image
        #[arg(long)]
        image: Option<String>,
        /// Display title
        #[arg(long)]
        title: String,
        /// Longer free-text description
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Run against an in-memory registry instead of the configured chain
        #[arg(long)]
        simulate: bool,
    },
    /// Show download counters
    Stats {
        /// Restrict to one item
        item: Option<String>,
    },
    /// Track a download and print its gateway URL
    Url {
        /// Dataset or model name
        item: String,
        /// IPFS CID of the content
        cid: String,
        /// Where the download came from, `sdk` or `ui`
        #[arg(long, default_value = "sdk")]
        source: DownloadSource,
    },
}

fn tracker_client(config: &DeHugConfig) -> Result<TrackerClient> {
    TrackerClient::new(
        config.tracker.url.clone(),
        config.gateway.url.clone(),
        Duration::from_secs(config.tracker.timeout_secs),
    )
    .context("building tracker client")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DeHugConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Upload {
            kind,
            content,
            metadata,
            image,
            title,
            description,
            tags,
            simulate,
        } => {
            let client = if simulate {
                DeHugClient::simulated(&config)
            } else {
                DeHugClient::from_config(&config)
            }
            .context("building DeHug client")?;

            let mut request = ContentUploadRequest::new(kind, content, metadata, title)
                .with_description(description)
                .with_tags(tags);
            if let Some(image) = image {
                request = request.with_image(image);
            }

            let result = client.upload(&request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Stats { item } => {
            let tracker = tracker_client(&config)?;
            match item {
                Some(item) => match tracker.item_stats(&item).await {
                    Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                    None => println!("null"),
                },
                None => {
                    let table = tracker.download_stats().await;
                    println!("{}", serde_json::to_string_pretty(&table)?);
                }
            }
        }
        Command::Url { item, cid, source } => {
            let tracker = tracker_client(&config)?;
            println!("{}", tracker.download_url(&item, &cid, source).await);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_argument_has_help() {
        let cli = Cli::command();
        cli.clone().debug_assert();
        for sub in cli.get_subcommands() {
            for arg in sub.get_arguments() {
                if matches!(arg.get_id().as_str(), "help" | "version") {
                    continue;
                }
                assert!(
                    arg.get_help().is_some(),
                    "{} --{} has no help text",
                    sub.get_name(),
                    arg.get_id()
                );
            }
        }
    }
}
