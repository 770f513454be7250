use amphora_core::backend::SynthArtifact;
use amphora_core::{verify, ProjectConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "amphora", version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the configured backend variant and write the deploy artifacts
    Synth {
        /// Path to the project configuration
        #[arg(long, default_value = "amphora.toml")]
        config: PathBuf,

        /// Directory receiving the generated artifacts
        #[arg(long, default_value = ".amphora")]
        out: PathBuf,
    },
    /// Build and validate the configured backend without writing anything
    Validate {
        /// Path to the project configuration
        #[arg(long, default_value = "amphora.toml")]
        config: PathBuf,
    },
    /// Audit the local deploy toolchain and print a status report
    VerifyEnv {
        /// Project directory to audit
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

fn run_synth(config: &Path, out: &Path) -> Result<SynthArtifact, String> {
    let project = ProjectConfig::load(config)
        .map_err(|e| format!("failed to load {}: {}", config.display(), e))?;
    info!("Building '{}' backend", project.variant.as_str());

    let backend = project
        .build_backend()
        .map_err(|e| format!("failed to build backend: {}", e))?;
    let artifact = backend
        .synth()
        .map_err(|e| format!("synthesis failed: {}", e))?;
    artifact
        .write_to(out)
        .map_err(|e| format!("failed to write artifacts: {}", e))?;
    Ok(artifact)
}

fn run_validate(config: &Path) -> Result<usize, String> {
    let project = ProjectConfig::load(config)
        .map_err(|e| format!("failed to load {}: {}", config.display(), e))?;
    let backend = project
        .build_backend()
        .map_err(|e| format!("failed to build backend: {}", e))?;
    let artifact = backend
        .synth()
        .map_err(|e| format!("validation failed: {}", e))?;
    Ok(artifact.policies.len())
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { config, out } => match run_synth(&config, &out) {
            Ok(artifact) => {
                info!("Synthesis complete");
                println!("Wrote {}", out.join("amphora_outputs.json").display());
                for policy in &artifact.policies {
                    println!(
                        "Wrote {} (attaches to {})",
                        out.join(format!("policy.{}.json", policy.name)).display(),
                        policy.role_arn
                    );
                }
            }
            Err(e) => {
                error!("{}", e);
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Validate { config } => match run_validate(&config) {
            Ok(policies) => {
                println!(
                    "Configuration is valid ({} policy attachment(s))",
                    policies
                );
            }
            Err(e) => {
                error!("{}", e);
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::VerifyEnv { dir } => {
            // The report is informational; check outcomes never set the
            // exit status.
            print!("{}", verify::run(&dir));
        }
    }
}
