use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use judge::{GradeJob, GradingPool, JudgeConfig, LanguageRegistry, ProcessRunner, RunLimits};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("judge=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = JudgeConfig::from_env().context("Failed to load judge configuration")?;

    // Load language configurations
    let registry = match &config.languages_config {
        Some(path) => {
            info!("Loading language configurations from {}", path.display());
            LanguageRegistry::load(path)?
        }
        None => LanguageRegistry::builtin()?,
    };
    info!(
        "Supported languages: {:?}",
        registry
            .supported_languages()
            .iter()
            .map(|lang| lang.name())
            .collect::<Vec<_>>()
    );

    let runner = Arc::new(ProcessRunner::from_config(&config, registry));
    let default_limits =
        RunLimits::from_secs(config.default_time_limit_secs, config.default_memory_limit_mb);
    let (mut pool, mut reports) =
        GradingPool::new(runner, config.max_concurrent_runs, default_limits);
    info!(
        "Starting grading worker (max_concurrent_runs={})",
        config.max_concurrent_runs
    );

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(report) = reports.recv().await {
            let mut line = match serde_json::to_string(&report) {
                Ok(line) => line,
                Err(e) => {
                    error!(
                        "Failed to serialize report for submission_id={}: {}",
                        report.submission_id, e
                    );
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                error!("Failed to write report: {}", e);
                continue;
            }
            if let Err(e) = stdout.flush().await {
                error!("Failed to flush reports: {}", e);
            }
        }
    });

    info!("Waiting for jobs on stdin...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read job from stdin")?,
            _ = tokio::signal::ctrl_c() => break true,
        };
        let Some(line) = line else {
            break false;
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<GradeJob>(&line) {
            Ok(job) => {
                info!(
                    "Received grade job: submission_id={}, language={}",
                    job.submission_id, job.language
                );
                pool.submit(job);
            }
            Err(e) => {
                warn!("Failed to parse job data: {}", e);
            }
        }
    };

    if !interrupted {
        info!("Input closed; waiting for {} job(s)", pool.in_flight());
        interrupted = tokio::select! {
            _ = pool.join() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
    }

    if interrupted {
        warn!("Received shutdown signal, aborting in-flight jobs...");
        pool.shutdown().await;
    }

    drop(pool);
    if let Err(e) = writer.await {
        error!("Report writer failed: {}", e);
    }

    info!("Worker shutdown complete");
    Ok(())
}
