mod logging;
mod push;
mod report;
mod schedule;
mod tagger;
mod watcher;
mod worker;

use chrono::Local;
use fieldvision_common::config::Config;
use fieldvision_pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use worker::FolderContext;

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fieldvision.toml"));
    // Optional: process a single folder and exit instead of watching.
    let once = args.next().map(PathBuf::from);

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    // Flushes system.log on drop, so it lives for the rest of main.
    let _log_guard = match logging::init(&config.watch.log_dir, &config.logging.level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging in {}: {e}", config.watch.log_dir.display());
            std::process::exit(1);
        }
    };

    let summary = config.mode_summary();
    info!(
        simulation = summary.simulation,
        dep_policy = ?summary.dep_policy,
        dev_profile = summary.dev_profile,
        watch_path = %summary.watch_path.display(),
        fps = summary.fps,
        max_seconds = summary.max_seconds,
        "starting fieldvision daemon"
    );

    let pipeline = match Pipeline::new(PipelineConfig::from(&config)) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "invalid pipeline configuration");
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(FolderContext {
        pipeline,
        tagger: tagger::select_tagger(&config),
        log_dir: config.watch.log_dir.clone(),
        push_token: config.push.token.clone(),
        schedule: config.schedule.path.clone(),
    });

    if let Some(folder) = once {
        let result = tokio::task::spawn_blocking(move || {
            worker::handle_folder(&ctx, &folder, Local::now().date_naive())
        })
        .await;
        match result {
            Ok(Ok(report)) => info!(
                accepted = report.accepted,
                markdown = %report.markdown.display(),
                pdf = %report.pdf.display(),
                delivery = ?report.delivery,
                schedule_warnings = report.schedule_warnings.len(),
                "folder processed"
            ),
            Ok(Err(e)) => {
                error!(error = %e, "failed processing folder");
                std::process::exit(1);
            }
            Err(e) => {
                error!(error = %e, "folder task panicked");
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = std::fs::create_dir_all(&config.watch.path) {
        error!(
            path = %config.watch.path.display(),
            error = %e,
            "failed to create watch directory"
        );
        std::process::exit(1);
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    // Dropping the watcher stops events, so it lives for the rest of main.
    let _watcher = match watcher::watch(&config.watch.path, config.watch.frames_dir.clone(), tx) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "failed to start folder watcher");
            std::process::exit(1);
        }
    };

    info!("entering folder processing loop");
    tokio::select! {
        _ = worker::run_folder_loop(rx, ctx) => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
}
