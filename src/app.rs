use crate::application::TestGenerationUseCase;
use crate::domain::client_context::ClientContext;
use crate::domain::error::{AppError, Result};
use crate::domain::generation::{GenerationOptions, GenerationProgress};
use crate::domain::requirement::Requirement;
use crate::infrastructure::config::{AppSettings, ConfigService};
use crate::infrastructure::llm_clients::{LLMClient, LlmService};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "smartest", version, about = "Generate test artifacts from requirement documents")]
struct Cli {
    /// Settings file (defaults to ./smartest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a test suite from a plain-text requirement document
    Generate(GenerateArgs),
    /// List models offered by the active provider
    Models,
    /// Check whether the active provider is reachable
    Check,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    requirement: PathBuf,

    /// Client context as JSON
    #[arg(long)]
    client_context: Option<PathBuf>,

    /// Also generate Gherkin feature files
    #[arg(long)]
    bdd: bool,

    #[arg(long)]
    selenium: bool,

    #[arg(long)]
    playwright: bool,

    #[arg(long)]
    no_edge_cases: bool,

    #[arg(long)]
    no_negative: bool,

    #[arg(long)]
    no_boundary: bool,

    /// Write the suite JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl GenerateArgs {
    fn options(&self, defaults: GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            generate_gherkin: defaults.generate_gherkin || self.bdd,
            generate_selenium: defaults.generate_selenium || self.selenium,
            generate_playwright: defaults.generate_playwright || self.playwright,
            include_edge_cases: defaults.include_edge_cases && !self.no_edge_cases,
            include_negative: defaults.include_negative && !self.no_negative,
            include_boundary: defaults.include_boundary && !self.no_boundary,
        }
    }
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let settings = ConfigService::new(cli.config.clone()).load()?;

    match cli.command {
        Command::Generate(args) => generate(settings, args).await,
        Command::Models => list_models(settings).await,
        Command::Check => check(settings).await,
    }
}

async fn generate(settings: AppSettings, args: GenerateArgs) -> Result<()> {
    let requirement = read_requirement(&args.requirement).await?;
    let client_context = match &args.client_context {
        Some(path) => Some(read_client_context(path).await?),
        None => None,
    };
    let options = args.options(settings.generation);

    let use_case = TestGenerationUseCase::from_config(&settings.llm).await;
    let suite = use_case
        .generate_test_suite(&requirement, client_context.as_ref(), &options, print_progress)
        .await?;

    let json = serde_json::to_string_pretty(&suite)
        .map_err(|err| AppError::Internal(format!("Failed to serialize test suite: {}", err)))?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), total = suite.total_count(), "Test suite written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_progress(event: GenerationProgress) {
    let percent = (event.progress * 100.0).round();
    match event.error {
        Some(error) => eprintln!("[{:>3}%] {}: {}", percent, event.message, error),
        None => eprintln!("[{:>3}%] {:<10} {}", percent, event.stage.as_str(), event.message),
    }
}

async fn read_requirement(path: &Path) -> Result<Requirement> {
    let content = tokio::fs::read_to_string(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Requirement::new(filename, content))
}

async fn read_client_context(path: &Path) -> Result<ClientContext> {
    let raw = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&raw).map_err(|err| {
        AppError::ValidationError(format!(
            "Invalid client context {}: {}",
            path.display(),
            err
        ))
    })
}

async fn list_models(settings: AppSettings) -> Result<()> {
    let service = LlmService::new(settings.llm);
    let models = service.get_models().await;
    if models.is_empty() {
        println!("No models reported by {}", service.provider_name());
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

async fn check(settings: AppSettings) -> Result<()> {
    let service = LlmService::new(settings.llm);
    let available = service.is_available().await;
    println!(
        "{} ({}): {}",
        service.provider_name(),
        service.model_name(),
        if available { "available" } else { "unavailable" }
    );
    if available {
        Ok(())
    } else {
        Err(AppError::ConnectionFailure(format!(
            "{} is not reachable",
            service.provider_name()
        )))
    }
}
