use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use nw_core::{NewsItem, Result};
use nw_inference::{ModelConfig, ModelRegistry};
use nw_web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage backend. Available backends: memory (default), postgres
    #[arg(long, default_value = "memory")]
    storage: String,
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Sentiment model variant. Available variants: bayes (default), attention, lexicon
    #[arg(long, default_value = "bayes")]
    model: String,
    #[arg(long, env = "MODEL_DIR", default_value = "./models")]
    model_dir: PathBuf,
    #[arg(long, env = "SENTIMENT_MODEL", default_value = "sentiment-bayes.json")]
    model_file: String,
    #[arg(long, env = "SENTIMENT_TOKENIZER", default_value = "tokenizer.json")]
    tokenizer_file: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: SocketAddr,
    },
    /// Load news items from a JSON file into storage
    Seed {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store = nw_storage::create_store(&cli.storage, cli.database_url.as_deref()).await?;
    info!("💾 Storage backend initialized (using {})", cli.storage);

    match cli.command {
        Commands::Serve { listen } => {
            let model_config = ModelConfig {
                variant: cli.model.clone(),
                model_dir: cli.model_dir.clone(),
                model_file: cli.model_file.clone(),
                tokenizer_file: cli.tokenizer_file.clone(),
            };
            // Lazy by design: the artifact is only read on the first
            // classification request.
            let registry = Arc::new(ModelRegistry::new(model_config));
            info!("🧠 Sentiment backend configured (variant {})", cli.model);

            nw_web::serve(listen, AppState { store, registry }).await?;
        }
        Commands::Seed { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let items: Vec<NewsItem> = serde_json::from_str(&raw)?;
            let total = items.len();
            for item in &items {
                store.insert(item).await?;
            }
            info!("📰 Seeded {} news items from {}", total, file.display());
        }
    }

    Ok(())
}
