use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jf_core::logging::init_logging;
use jf_core::{ArticleStorage, Config};
use jf_ingest::Ingestor;
use jf_publish::Publisher;
use jf_storage::SQLiteStorage;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Journal feed ingestion and Telegram publishing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch every configured feed and store unseen articles
    Ingest,
    /// Push every pending article to the Telegram channel
    Publish,
}

async fn ingest(config: &Config, storage: Arc<SQLiteStorage>) -> anyhow::Result<()> {
    let ingestor = Ingestor::from_config(storage as Arc<dyn ArticleStorage>, config)?;
    let report = ingestor.run(&config.feeds).await;
    info!(
        "📥 Stored {} new articles from {} feeds ({} failed)",
        report.new_articles(),
        report.sources.len(),
        report.failed_sources.len()
    );
    Ok(())
}

async fn publish(config: &Config, storage: Arc<SQLiteStorage>) -> anyhow::Result<()> {
    let publisher = Publisher::from_config(storage as Arc<dyn ArticleStorage>, config)?;
    let report = publisher.run().await?;
    info!(
        "📤 Pushed {} articles to {} ({} without translation)",
        report.delivered, config.chat_id, report.untranslated
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    init_logging();

    let storage = Arc::new(
        SQLiteStorage::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );
    info!("💾 Using article store at {}", storage.get_db_path().display());

    let result = match cli.command {
        Commands::Ingest => ingest(&config, storage.clone()).await,
        Commands::Publish => publish(&config, storage.clone()).await,
    };

    storage.close().await;
    result
}
