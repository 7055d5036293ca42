use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mindmatch::config::AppConfig;
use mindmatch::game::records::RecordsStore;
use mindmatch::provider::{ContentProvider, Provider, ProviderConfig, ProviderKind, ProviderSettings};
use mindmatch::storage::FileStore;
use mindmatch::ui::app::{self, PlayOptions};
use mindmatch::ui::records::render_records;
use mindmatch::GameMode;

#[derive(Parser)]
#[command(name = "mindmatch")]
#[command(about = "Memory matching game with generated themes")]
struct Cli {
    /// Directory for records and provider settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// How long a mismatched pair stays face up, in milliseconds
    #[arg(long, global = true)]
    mismatch_delay_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play in the terminal (default)
    Play {
        /// casual or level
        #[arg(long, default_value = "casual", value_parser = parse_mode)]
        mode: GameMode,

        /// Casual difficulty: easy, normal, hard or master
        #[arg(long)]
        difficulty: Option<String>,

        /// Built-in theme name
        #[arg(long)]
        theme: Option<String>,

        /// Generate a theme from this prompt before the first round
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Show best casual results and level history
    Records,
    /// List, choose and edit provider configurations
    Providers {
        /// Make this configuration the active one
        #[arg(long)]
        select: Option<String>,

        #[command(subcommand)]
        action: Option<ProviderAction>,
    },
    /// Ask the active provider for theme items and print them
    Generate {
        prompt: String,

        #[arg(long, default_value_t = 18)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum ProviderAction {
    /// Add a configuration (OpenAI-compatible unless --kind says otherwise)
    Add {
        /// Defaults to the current time in milliseconds
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        fields: ProviderFields,
    },
    /// Change fields of an existing configuration
    Set {
        id: String,

        #[command(flatten)]
        fields: ProviderFields,
    },
    /// Delete a configuration; the last one is kept
    Remove { id: String },
}

#[derive(Args)]
struct ProviderFields {
    #[arg(long)]
    name: Option<String>,

    /// google, openai or ollama
    #[arg(long, value_parser = parse_kind)]
    kind: Option<ProviderKind>,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    model: Option<String>,
}

impl ProviderFields {
    fn apply(self, config: &mut ProviderConfig) {
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(kind) = self.kind {
            config.kind = kind;
        }
        if let Some(key) = self.api_key {
            config.api_key = key;
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(model) = self.model {
            config.model_name = model;
        }
    }
}

fn parse_kind(value: &str) -> Result<ProviderKind, String> {
    ProviderKind::from_code(value)
        .ok_or_else(|| format!("unknown provider {value:?}, expected google, openai or ollama"))
}

fn parse_mode(value: &str) -> Result<GameMode, String> {
    GameMode::from_code(value).ok_or_else(|| format!("unknown mode {value:?}, expected casual or level"))
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn edit_providers(settings: &mut ProviderSettings, action: ProviderAction) -> Result<()> {
    match action {
        ProviderAction::Add { id, fields } => {
            let id = id.unwrap_or_else(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis().to_string())
                    .unwrap_or_else(|_| "custom".to_string())
            });
            if settings.config(&id).is_some() {
                bail!("provider configuration {id} already exists, use `providers set`");
            }
            let mut provider = ProviderConfig::blank(&id);
            fields.apply(&mut provider);
            settings.upsert(provider).context("saving provider configurations")?;
            info!(id = %id, "provider configuration added");
        }
        ProviderAction::Set { id, fields } => {
            let Some(existing) = settings.config(&id) else {
                bail!("no provider configuration with id {id}");
            };
            let mut provider = existing.clone();
            fields.apply(&mut provider);
            settings.upsert(provider).context("saving provider configurations")?;
            info!(id = %id, "provider configuration updated");
        }
        ProviderAction::Remove { id } => {
            if !settings.remove(&id).context("saving provider configurations")? {
                bail!("cannot remove {id}: unknown id or the last configuration");
            }
            info!(id = %id, "provider configuration removed");
        }
    }
    Ok(())
}

fn providers(config: &AppConfig, select: Option<String>, action: Option<ProviderAction>) -> Result<()> {
    let mut settings = ProviderSettings::load(Box::new(FileStore::new(&config.data_dir)));
    if let Some(action) = action {
        edit_providers(&mut settings, action)?;
    }
    if let Some(id) = select {
        if !settings.select(&id).context("saving provider selection")? {
            bail!("no provider configuration with id {id}");
        }
        info!(id = %id, "active provider changed");
    }
    let active = settings.active().id.clone();
    for provider in settings.configs() {
        let marker = if provider.id == active { '*' } else { ' ' };
        let model = if provider.model_name.is_empty() {
            "default model"
        } else {
            provider.model_name.as_str()
        };
        let key = if provider.api_key.trim().is_empty() { "no key" } else { "key set" };
        println!(
            "{marker} {:<16} {:<20} {:<7} {:<8} {model}",
            provider.id,
            provider.name,
            provider.kind.code(),
            key
        );
    }
    Ok(())
}

async fn generate(config: &AppConfig, prompt: &str, count: usize) -> Result<()> {
    let settings = ProviderSettings::load(Box::new(FileStore::new(&config.data_dir)));
    let active = settings.active();
    info!(provider = %active.name, count, "generating theme items");
    let provider = Provider::from_config(active)?;
    let items = provider.generate(prompt, count).await?;
    println!("{}", items.join(" "));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(ms) = cli.mismatch_delay_ms {
        config.timings.mismatch_delay = Duration::from_millis(ms);
    }
    info!(data_dir = %config.data_dir.display(), "starting");

    match cli.command {
        None => app::run(config, PlayOptions::default()).await,
        Some(Command::Play {
            mode,
            difficulty,
            theme,
            prompt,
        }) => {
            let options = PlayOptions {
                mode,
                difficulty,
                theme,
                prompt,
            };
            app::run(config, options).await
        }
        Some(Command::Records) => {
            let records = RecordsStore::load(Box::new(FileStore::new(&config.data_dir)));
            print!("{}", render_records(records.records()));
            Ok(())
        }
        Some(Command::Providers { select, action }) => providers(&config, select, action),
        Some(Command::Generate { prompt, count }) => generate(&config, &prompt, count).await,
    }
}
