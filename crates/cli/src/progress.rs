use drift_indexer::IndexProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over indexed files; hidden entirely in quiet mode.
pub(crate) fn create_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub(crate) fn report_batch(pb: &ProgressBar, progress: IndexProgress) {
    pb.set_length(progress.files_total as u64);
    pb.set_position(progress.files_done as u64);
    pb.set_message(format!(
        "(batch {}/{})",
        progress.batches_done, progress.batches_total
    ));
}
