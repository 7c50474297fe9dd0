use fieldvision_pipeline::{is_image, is_video};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Create(notify::Error),
    #[error("failed to watch {0}: {1}")]
    Watch(String, notify::Error),
}

/// The folder to process for a newly appeared file, if the file is site media
/// and not one of our own sampled frames.
pub fn media_folder(path: &Path, frames_dir: &str) -> Option<PathBuf> {
    if !(is_video(path) || is_image(path)) || is_sampled_frame(path, frames_dir) {
        return None;
    }
    path.parent().map(Path::to_path_buf)
}

// Sampled frames land at `<folder>/<frames_dir>/<video stem>/frame_NNN.jpg`.
fn is_sampled_frame(path: &Path, frames_dir: &str) -> bool {
    let named_like_frame = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".jpg"));
    let under_frames_dir = path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .is_some_and(|n| n == frames_dir);
    named_like_frame && under_frames_dir
}

fn is_arrival(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_)))
}

/// Folders touched by a filesystem event.
pub fn folders_for_event(event: &Event, frames_dir: &str) -> Vec<PathBuf> {
    if !is_arrival(&event.kind) {
        return Vec::new();
    }
    let mut folders: Vec<PathBuf> = event
        .paths
        .iter()
        .filter_map(|p| media_folder(p, frames_dir))
        .collect();
    folders.dedup();
    folders
}

/// Start watching `root` recursively. Folders with new media are sent on `tx`.
/// The returned watcher must be kept alive for events to keep flowing.
pub fn watch(
    root: &Path,
    frames_dir: String,
    tx: UnboundedSender<PathBuf>,
) -> Result<RecommendedWatcher, WatchError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for folder in folders_for_event(&event, &frames_dir) {
                debug!(folder = %folder.display(), "media arrived");
                if let Err(e) = tx.send(folder) {
                    error!(error = %e, "work queue closed, dropping folder");
                }
            }
        }
        Err(e) => warn!(error = %e, "watch error"),
    })
    .map_err(WatchError::Create)?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| WatchError::Watch(root.display().to_string(), e))?;
    info!(root = %root.display(), "watching for site media");
    Ok(watcher)
}
