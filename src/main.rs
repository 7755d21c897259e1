// ABOUTME: Entry point for the caravel CLI application.
// ABOUTME: Parses arguments, wires collaborators, and runs the pipeline.

mod cli;

use caravel::cloud::{CloudOps, GcloudCli, GsutilCli, StorageOps};
use caravel::config::{self, Config};
use caravel::error::{Error, Result};
use caravel::output::{Output, OutputMode};
use caravel::diagnostics::Warning;
use caravel::pipeline::{
    LogDir, Mode, Pipeline, PipelineContext, Stage, next_steps, print_summary,
    stages::{
        BuildStage, DeployStage, PreflightStage, PublishStage, SyncStage, ValidateStage,
        VerifyStage,
    },
};
use caravel::runtime::{BollardRuntime, CredentialStore, detect_local};
use clap::Parser;
use cli::{Cli, Commands, DeployMode};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        tracing::error!(class = e.class(), "run failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            service,
            image,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, service.as_deref(), image.as_deref(), force)
        }
        Commands::Deploy { mode, quiet, json } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;

            let output_mode = if json {
                OutputMode::Json
            } else if quiet {
                OutputMode::Quiet
            } else {
                OutputMode::Normal
            };

            let mode = match mode {
                DeployMode::Local => Mode::Local,
                DeployMode::Cloud => Mode::Cloud,
            };

            deploy(config, mode, Output::new(output_mode), cwd).await
        }
        Commands::Status => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            status(config).await
        }
    }
}

/// Run the pipeline for the chosen mode.
async fn deploy(
    config: Config,
    mode: Mode,
    mut output: Output,
    cwd: std::path::PathBuf,
) -> Result<()> {
    let socket = detect_local().map_err(|e| Error::Environment(e.to_string()))?;
    tracing::debug!(runtime = %socket.runtime_type, socket = %socket.socket_path, "using container engine");
    let runtime = Arc::new(
        BollardRuntime::connect(&socket).map_err(|e| Error::Environment(e.to_string()))?,
    );

    let mut stages: Vec<Box<dyn Stage>> = Vec::new();

    match mode {
        Mode::Local => {
            stages.push(Box::new(PreflightStage::new(runtime.clone(), None)));
            stages.push(Box::new(BuildStage::new(runtime.clone())));
            stages.push(Box::new(VerifyStage::new(runtime.clone())));
        }
        Mode::Cloud => {
            let cloud: Arc<dyn CloudOps> = Arc::new(GcloudCli::new(
                config.project.clone(),
                config.region.clone(),
            ));
            let storage: Arc<dyn StorageOps> = Arc::new(GsutilCli::new());
            let credentials = Arc::new(CredentialStore::new());

            stages.push(Box::new(PreflightStage::new(
                runtime.clone(),
                Some(cloud.clone()),
            )));
            stages.push(Box::new(BuildStage::new(runtime.clone())));
            stages.push(Box::new(VerifyStage::new(runtime.clone())));
            stages.push(Box::new(SyncStage::new(storage)));
            stages.push(Box::new(PublishStage::new(
                runtime.clone(),
                cloud.clone(),
                credentials,
            )));
            stages.push(Box::new(DeployStage::new(cloud.clone())));
            stages.push(Box::new(ValidateStage::new()));
        }
    }

    let logs = LogDir::create(&cwd)?;
    let mut ctx = PipelineContext::new(mode, config, cwd, logs);

    output.start_timer();
    let pipeline = Pipeline::new(stages);
    let (report, result) = pipeline.run(&mut ctx, &output).await;

    print_summary(&output, &report, &ctx.diagnostics);

    match result {
        Ok(()) => {
            if let Err(e) = ctx.logs.remove() {
                let warning = Warning::log_cleanup(format!("could not remove run logs: {e}"));
                output.warning(&warning.message);
            }
            let message = match (mode, &ctx.service_url) {
                (Mode::Cloud, Some(url)) => format!("deployed: {url}"),
                _ => "verified locally".to_string(),
            };
            output.success(&message);
            if mode == Mode::Cloud {
                for step in next_steps(ctx.config.service.as_str(), &ctx.config.region) {
                    output.progress(&step);
                }
            }
            Ok(())
        }
        Err(e) => {
            output.progress(&format!("run logs kept at {}", ctx.logs.path().display()));
            Err(e)
        }
    }
}

/// Print the configured service and, when reachable, its deployed state.
async fn status(config: Config) -> Result<()> {
    println!("Service: {}", config.service);
    println!("Image: {}", config.local_image()?);
    println!("Region: {}", config.region);

    if !config.env.is_empty() {
        println!("Env:");
        let mut keys: Vec<_> = config.env.keys().collect();
        keys.sort();
        for key in keys {
            let value = &config.env[key];
            if value.is_secret() {
                println!("  {key}: ***");
            } else {
                let shown = value.resolve().unwrap_or_default();
                println!("  {key}: {shown}");
            }
        }
    }

    let cloud = GcloudCli::new(config.project.clone(), config.region.clone());
    match cloud.describe_service(&config.service).await {
        Ok(Some(descriptor)) => {
            println!(
                "Deployed: {}",
                descriptor.url.as_deref().unwrap_or("(no URL)")
            );
            if let (Some(memory), Some(cpu)) = (descriptor.memory, descriptor.cpu) {
                println!("Resources: {memory} / {cpu} cpu");
            }
        }
        Ok(None) => println!("Deployed: no"),
        Err(e) => {
            tracing::debug!(error = %e, "describe failed");
            println!("Deployed: unknown ({e})");
        }
    }

    Ok(())
}
