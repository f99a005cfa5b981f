use augmentflow::config::{AugmentConfig, ConfigLoader};
use augmentflow::hooks::builtin::{default_registry, BuiltinOptions};
use augmentflow::hooks::registry::{global_registry, install_global};
use augmentflow::output::JsonFileSink;
use augmentflow::service::{AugmentRequest, AugmentService, SessionSummary};
use augmentflow::services::{ImageRef, MetadataOnlyEngine};
use augmentflow::transform::TransformPipelineSpec;
use augmentflow::AugmentError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Compile prompts into image augmentation pipelines and run them
#[derive(Parser)]
#[command(name = "augmentflow")]
#[command(about = "Prompt-driven image augmentation pipelines", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a prompt and print the validated pipeline without running it
    Parse {
        /// Free-text instructions, e.g. "add blur and rotate 15 degrees"
        prompt: String,

        /// Print the pipeline as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the full staged pipeline on an image
    Run {
        /// Image identifier or path
        #[arg(long)]
        image: String,

        /// Free-text instructions
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        prompt: Option<String>,

        /// Named preset to use instead of a prompt
        #[arg(long)]
        preset: Option<String>,

        /// Seed for reproducible runs (overrides any seed in the prompt)
        #[arg(long)]
        seed: Option<u32>,

        /// Image width in pixels
        #[arg(long, default_value = "512")]
        width: u32,

        /// Image height in pixels
        #[arg(long, default_value = "512")]
        height: u32,

        /// Directory receiving the session record (default: config output_dir)
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,

        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the transforms prompts can select
    Transforms,
    /// List the built-in presets
    Presets,
    /// Show registered hooks, limits and timeouts
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await;

    let log_level = match cli.verbose {
        0 => config
            .as_ref()
            .map(|c| c.log_level.clone())
            .unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,tokio=debug".to_string(), // -vvv shows everything including dependencies
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("augmentflow started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match config {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        let exit_code = match e.downcast_ref::<AugmentError>() {
            Some(err) => {
                eprintln!("Error: {}", err.user_message());
                err.exit_code()
            }
            None => {
                eprintln!("Error: {e}");
                1
            }
        };
        std::process::exit(exit_code);
    }
}

async fn run(command: Commands, config: AugmentConfig) -> anyhow::Result<()> {
    match command {
        Commands::Parse { prompt, json } => {
            let service = build_service(&config, None)?;
            let spec = service.preview(&prompt)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&spec)?);
            } else {
                print_pipeline(&spec);
            }
        }
        Commands::Run {
            image,
            prompt,
            preset,
            seed,
            width,
            height,
            output_dir,
            json,
        } => {
            let output_dir = output_dir.or_else(|| config.output_dir.clone());
            let service = build_service(&config, output_dir.clone())?;

            let request = AugmentRequest {
                prompt,
                preset,
                image: ImageRef::new(image, width, height),
                seed,
                session_id: None,
            };

            let summary = service.augment(request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary, output_dir.as_ref());
            }
            if let Some(err) = summary.error() {
                return Err(err.into());
            }
        }
        Commands::Transforms => {
            let service = build_service(&config, None)?;
            for transform in service.available_transforms() {
                println!("{:<26} {}", transform.name, transform.description);
                println!("{:<26} phrases: {}", "", transform.phrases.join(", "));
            }
        }
        Commands::Presets => {
            let service = build_service(&config, None)?;
            for preset in service.presets() {
                let names: Vec<_> = preset
                    .transforms
                    .iter()
                    .map(|t| t.transform_id.as_str())
                    .collect();
                println!("{} - {}", preset.name, preset.description);
                println!("  use cases:  {}", preset.use_cases.join(", "));
                println!("  transforms: {}", names.join(" -> "));
            }
        }
        Commands::Status => {
            let service = build_service(&config, config.output_dir.clone())?;
            let status = service.pipeline_status();
            println!("Engine: {}", status.engine);
            println!("Output: {}", status.sink.as_deref().unwrap_or("none"));
            match status.default_seed {
                Some(seed) => println!("Default seed: {}", seed),
                None => println!("Default seed: random"),
            }
            println!(
                "Limits: prompt {} chars, image {} px, {} transforms",
                status.limits.max_prompt_length,
                status.limits.max_image_dimension,
                status.limits.max_transforms
            );
            println!(
                "Timeouts: run {}, engine {}, hook {}, optional stage {}",
                humantime_serde::re::humantime::format_duration(status.timeouts.run_timeout),
                humantime_serde::re::humantime::format_duration(status.timeouts.engine_timeout),
                humantime_serde::re::humantime::format_duration(status.timeouts.hook_timeout),
                humantime_serde::re::humantime::format_duration(
                    status.timeouts.optional_stage_timeout
                ),
            );
            println!("Hooks:");
            for (stage, hooks) in status.hooks {
                println!("  {:<24} {}", stage.as_str(), hooks.join(", "));
            }
        }
    }

    Ok(())
}

async fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AugmentConfig> {
    let mut loader = ConfigLoader::new();
    match path {
        Some(path) => loader.load_from(path).await?,
        None => loader.load_default().await?,
    }
    Ok(loader.get_config())
}

fn build_service(
    config: &AugmentConfig,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<AugmentService> {
    install_global(default_registry(BuiltinOptions::from_config(config))?);
    let service = AugmentService::new(
        config,
        global_registry(),
        Arc::new(MetadataOnlyEngine::new()),
    );
    Ok(match output_dir {
        Some(dir) => service.with_sink(Arc::new(JsonFileSink::new(dir))),
        None => service,
    })
}

fn print_pipeline(spec: &TransformPipelineSpec) {
    println!("Pipeline (confidence {:.2}):", spec.confidence);
    for transform in &spec.transforms {
        let params = serde_json::to_string(&transform.parameters).unwrap_or_default();
        if transform.probability < 1.0 {
            println!(
                "  {}. {} {} (p={})",
                transform.order_index + 1,
                transform.transform_id,
                params,
                transform.probability
            );
        } else {
            println!(
                "  {}. {} {}",
                transform.order_index + 1,
                transform.transform_id,
                params
            );
        }
    }
    if let Some(seed) = spec.seed {
        println!("Seed: {}", seed);
    }
    for warning in &spec.warnings {
        println!("Warning: {}", warning);
    }
}

fn print_summary(summary: &SessionSummary, output_dir: Option<&PathBuf>) {
    println!("Session {}: {}", summary.session_id, summary.status);
    println!("  transforms: {}", summary.transforms.join(" -> "));
    println!("  seed: {} ({})", summary.seed.value, summary.seed.source);
    if let Some(image) = &summary.output_image {
        println!(
            "  output: {} ({}x{})",
            image.id(),
            image.width(),
            image.height()
        );
    }
    if !summary.skipped_capabilities.is_empty() {
        println!("  skipped: {}", summary.skipped_capabilities.join(", "));
    }
    for warning in &summary.warnings {
        println!("  warning: {}", warning);
    }
    if let Some(dir) = output_dir {
        println!(
            "  record: {}",
            dir.join(format!("{}.json", summary.session_id)).display()
        );
    }
}
