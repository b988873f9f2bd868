use clap::{Parser, Subcommand};
use codeshield::config::{load_config, ConfigOverrides};
use codeshield::errors::ShieldError;
use codeshield::language::SupportedLanguage;
use codeshield::logger;
use codeshield::metrics::{self, Metrics};
use codeshield::pipeline::LocalPipeline;
use codeshield::settings::{Intensity, ObfuscationSettings};
use codeshield::strategy::Transformer;
use prometheus::Registry;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "codeshield", version)]
#[command(about = "Obfuscate source code locally or through a rewriting service")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a source file (or stdin)
    Obfuscate(ObfuscateArgs),
    /// List supported languages and what the local pipeline does for each
    Languages,
}

#[derive(clap::Args)]
struct ObfuscateArgs {
    /// Input file; stdin when omitted or "-"
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file; stdout when omitted. Left untouched on failure.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (YAML or JSON, camelCase keys)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Language; inferred from the input extension when omitted
    #[arg(short, long)]
    language: Option<SupportedLanguage>,

    #[arg(long)]
    intensity: Option<Intensity>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    rename: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    strings: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    dead_code: Option<bool>,

    /// Only honoured by the rewriting service
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    flatten: Option<bool>,

    #[arg(long)]
    target: Option<String>,

    /// Comma-separated identifiers to keep
    #[arg(long)]
    exclude: Option<String>,

    /// Seed for reproducible rename tokens
    #[arg(long)]
    seed: Option<u64>,

    /// Service config file (toml, yaml or json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(short = 'k', long)]
    api_key: Option<String>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Ignore any configured credential and run the local pipeline
    #[arg(long, conflicts_with = "delegated")]
    offline: bool,

    /// Require the rewriting service; fails without a credential
    #[arg(long)]
    delegated: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Emit the result (strategy, header, body, pass report) as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), ShieldError> {
    let cli = Cli::parse();
    logger::init_logging(cli.log_json);

    match cli.command {
        Commands::Obfuscate(args) => obfuscate_command(args).await,
        Commands::Languages => {
            languages_command();
            Ok(())
        }
    }
}

fn read_input(input: Option<&Path>) -> Result<String, ShieldError> {
    match input {
        Some(path) if path != Path::new("-") => {
            info!("Reading source from {}", path.display());
            Ok(std::fs::read_to_string(path)?)
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn build_settings(args: &ObfuscateArgs) -> Result<ObfuscationSettings, ShieldError> {
    let mut settings = match &args.settings {
        Some(path) => ObfuscationSettings::from_file(path)?,
        None => ObfuscationSettings::default(),
    };

    let inferred = args.input.as_deref().and_then(SupportedLanguage::from_path);
    if let Some(language) = args.language.or(inferred) {
        settings.language = language;
    }
    if let Some(intensity) = args.intensity {
        settings.intensity = intensity;
    }
    if let Some(flag) = args.rename {
        settings.rename_variables = flag;
    }
    if let Some(flag) = args.strings {
        settings.string_encryption = flag;
    }
    if let Some(flag) = args.dead_code {
        settings.dead_code_injection = flag;
    }
    if let Some(flag) = args.flatten {
        settings.control_flow_flattening = flag;
    }
    if let Some(target) = &args.target {
        settings.target_environment = target.clone();
    }
    if let Some(exclude) = &args.exclude {
        settings.exclusions = exclude.clone();
    }
    Ok(settings)
}

async fn obfuscate_command(args: ObfuscateArgs) -> Result<(), ShieldError> {
    let code = read_input(args.input.as_deref())?;
    if code.trim().is_empty() {
        return Err(ShieldError::Other("nothing to obfuscate: input is empty".into()));
    }

    let settings = build_settings(&args)?;
    let overrides = ConfigOverrides {
        endpoint: args.endpoint.clone(),
        model: args.model.clone(),
        api_key: args.api_key.clone(),
        timeout_secs: args.timeout_secs,
    };
    let service = load_config(args.config.as_deref(), &overrides)?;

    let registry = Registry::new();
    let pipeline = match args.seed {
        Some(seed) => LocalPipeline::with_seed(seed),
        None => LocalPipeline::new(),
    };
    let transformer = Transformer::new(&service)?
        .with_pipeline(pipeline)
        .with_metrics(Metrics::new(&registry)?);

    let credential = if args.offline { None } else { service.credential() };
    if credential.is_none() && !args.delegated {
        warn!("No API key detected; using the offline obfuscation pipeline");
    }

    let result = if args.delegated {
        transformer.transform_delegated(&code, &settings, credential).await?
    } else {
        transformer.transform(&code, &settings, credential).await?
    };

    let output = if args.json {
        serde_json::to_string_pretty(&result)?
    } else {
        result.output()
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &output)?;
            info!("Wrote {} output to {}", result.strategy, path.display());
        }
        None => println!("{output}"),
    }

    if args.metrics {
        eprintln!("{}", metrics::render(&registry)?);
    }
    Ok(())
}

fn languages_command() {
    println!("{:<12} {:<10} {:<10} {:<8} decode", "language", "renaming", "whitespace", "comment");
    for language in SupportedLanguage::all() {
        let profile = language.profile();
        println!(
            "{:<12} {:<10} {:<10} {:<8} {}",
            language.to_string(),
            if profile.supports_renaming { "yes" } else { "no" },
            if profile.whitespace_sensitive { "sensitive" } else { "free" },
            profile.comments.line,
            profile.decode_expression("<payload>"),
        );
    }
}
