use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use console::style;
use stagehand::{
    BuildEngine, CommandEngine, ManifestProvider, Mode, Orchestrator, PayloadProvider, Settings,
    StaticPayload,
};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum CliMode {
    Production,
    Development,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Production => Mode::Production,
            CliMode::Development => Mode::Development,
        }
    }
}

/// Clean stale output, assemble the bundle configuration and run the build
/// engine once.
#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about)]
struct Args {
    /// Project root, scanned for generated top-level files
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,

    /// Output directory, wiped before every build
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Entry point handed to the engine
    #[arg(long)]
    entry: Option<Utf8PathBuf>,

    /// Public base path of built assets (overrides ASSET_PATH)
    #[arg(long)]
    public_path: Option<String>,

    /// JSON manifest with the plugin payload
    #[arg(long)]
    payload: Option<Utf8PathBuf>,

    /// Build engine program
    #[arg(long, env = "STAGEHAND_ENGINE", default_value = "bundle-engine")]
    engine: String,

    /// Extra argument for the build engine, may be repeated
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    #[arg(long, value_enum)]
    mode: Option<CliMode>,

    /// Print the assembled configuration instead of building
    #[arg(long)]
    print_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        settings.root = self.root.clone();

        if let Some(out_dir) = &self.out_dir {
            settings.out_dir = out_dir.clone();
        }
        if let Some(entry) = &self.entry {
            settings.entry = entry.clone();
        }
        if let Some(public_path) = &self.public_path {
            settings.public_path = public_path.clone();
        }
        if let Some(mode) = self.mode {
            settings.mode = mode.into();
        }

        settings
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("stagehand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let settings = args.settings();
    let engine = CommandEngine::new(&args.engine)
        .args(args.engine_args.iter().cloned())
        .current_dir(settings.root.clone());

    let result = match &args.payload {
        Some(path) => {
            let provider = ManifestProvider::new(path.clone());
            execute(settings, provider, engine, args.print_config).await
        }
        None => execute(settings, StaticPayload::default(), engine, args.print_config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:?}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn execute<P, E>(
    settings: Settings,
    provider: P,
    engine: E,
    print_config: bool,
) -> anyhow::Result<()>
where
    P: PayloadProvider,
    E: BuildEngine,
{
    let orchestrator = Orchestrator::new(settings, provider, engine);

    if print_config {
        let config = orchestrator.prepare().await?;
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    orchestrator.run().await?;
    Ok(())
}
