use anyhow::{Context, Result};
use cfd_intent::cli::{Cli, Commands};
use cfd_intent::server::{app, AppState};
use cfd_intent::utils::logger::init_logger;
use cfd_intent::{IntentPipeline, JobRegistry, Settings};
use clap::Parser;
use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志系统
    if let Err(err) = init_logger(cli.log_level.as_deref(), cli.log_file.clone()) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::from(1);
    }

    match main_impl(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn main_impl(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            serve(settings, bind).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Profiles => {
            let pipeline = IntentPipeline::new(&settings);
            for listing in pipeline.registry().listings() {
                let marker = if listing.default { "*" } else { " " };
                println!(
                    "{marker} {:<32} {:<10} {:<40} {}",
                    listing.slug, listing.family, listing.profile, listing.label
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { file, profile } => validate_file(&settings, &file, profile.as_deref()),
    }
}

async fn serve(settings: Settings, bind: Option<String>) -> Result<()> {
    let address = bind.unwrap_or_else(|| settings.cfd_bind.clone());
    let state = AppState::new(IntentPipeline::new(&settings), JobRegistry::spawn());
    let router = app(state, &settings.cors_origins());

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(
        address = %address,
        schema_dir = %settings.cfd_schema_dir.display(),
        storage_dir = %settings.cfd_storage_dir.display(),
        "cfd-intent listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// 收到信号后返回；监听失败时永不返回
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            // 无法监听信号时保持运行，交由进程管理器终止
            warn!(error = %err, "failed to listen for ctrl-c, graceful shutdown disabled");
            std::future::pending::<()>().await;
        }
    }
}

fn validate_file(settings: &Settings, file: &Path, profile: Option<&str>) -> Result<ExitCode> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let intent: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", file.display()))?;

    let pipeline = IntentPipeline::new(settings);
    let outcome = pipeline.validate_intent(&intent, profile)?;
    if outcome.report.valid {
        println!("{}: valid ({})", file.display(), outcome.profile_slug);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{}: {} issue(s) against {}",
        file.display(),
        outcome.report.issues.len(),
        outcome.profile_slug
    );
    for issue in &outcome.report.issues {
        println!("  - {issue}");
    }
    Ok(ExitCode::from(2))
}
