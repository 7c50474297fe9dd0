use chrono::{Local, NaiveDate};
use fieldvision_pipeline::{Pipeline, PipelineError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::push::{push_report, Delivery};
use crate::report::{self, ReportError};
use crate::schedule::Schedule;
use crate::tagger::{tag_frames, Label, Tagger};

/// Everything a folder run needs, shared by the consumer loop.
pub struct FolderContext {
    pub pipeline: Pipeline,
    pub tagger: Box<dyn Tagger>,
    pub log_dir: PathBuf,
    pub push_token: Option<String>,
    /// Re-read on every folder run so edits apply without a restart.
    pub schedule: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("folder task panicked: {0}")]
    Join(String),
}

#[derive(Debug)]
pub struct FolderReport {
    pub accepted: usize,
    pub markdown: PathBuf,
    pub pdf: PathBuf,
    pub delivery: Delivery,
    pub schedule_warnings: Vec<String>,
}

/// Schedule warnings for `labels`. An unreadable schedule is logged and
/// yields none; it never fails the folder.
fn schedule_warnings(path: Option<&Path>, labels: &[Label]) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };
    match Schedule::load(path) {
        Ok(schedule) => schedule.compare_progress(labels),
        Err(e) => {
            warn!(error = %e, "skipping schedule comparison");
            Vec::new()
        }
    }
}

/// Sample, filter, tag, render and deliver one folder.
pub fn handle_folder(
    ctx: &FolderContext,
    folder: &Path,
    date: NaiveDate,
) -> Result<FolderReport, FolderError> {
    info!(folder = %folder.display(), "processing folder");
    let outcome = ctx.pipeline.process_folder(folder)?;
    let labels = tag_frames(ctx.tagger.as_ref(), &outcome.accepted);

    let out_dir = report::daily_log_dir(&ctx.log_dir, date)?;
    let warnings = schedule_warnings(ctx.schedule.as_deref(), &labels);
    let markdown = report::render_markdown(date, &labels, &warnings, &out_dir)?;
    report::write_tags(&labels, &out_dir)?;
    let pdf = report::render_pdf(&markdown);
    let delivery = push_report(&pdf, ctx.push_token.as_deref());

    info!(
        folder = %folder.display(),
        candidates = outcome.candidates,
        accepted = outcome.accepted.len(),
        "finished folder"
    );
    Ok(FolderReport {
        accepted: outcome.accepted.len(),
        markdown,
        pdf,
        delivery,
        schedule_warnings: warnings,
    })
}

/// Consume folders from the work queue, one at a time. Each folder is
/// processed at most once per run; failures are logged and the loop goes on.
pub async fn run_folder_loop(mut rx: UnboundedReceiver<PathBuf>, ctx: Arc<FolderContext>) {
    let mut processed: HashSet<PathBuf> = HashSet::new();

    while let Some(folder) = rx.recv().await {
        if !processed.insert(folder.clone()) {
            debug!(folder = %folder.display(), "folder already processed, skipping");
            continue;
        }

        let task_ctx = Arc::clone(&ctx);
        let task_folder = folder.clone();
        let result = tokio::task::spawn_blocking(move || {
            handle_folder(&task_ctx, &task_folder, Local::now().date_naive())
        })
        .await
        .unwrap_or_else(|e| Err(FolderError::Join(e.to_string())));

        if let Err(e) = result {
            error!(folder = %folder.display(), error = %e, "failed processing folder");
        }
    }
    info!("work queue closed, stopping");
}
