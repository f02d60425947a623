//! Finished-domains checkpointing
//!
//! The checkpoint is a JSON array of domain keys whose outstanding counter
//! reached zero. Writes go through a temp file and an atomic rename, so a
//! reader (including the resume reconciler of the next run) sees either the
//! previous complete file or the new one, never a torn write.

use crate::state::{FetchController, RunState};
use crate::storage::{StorageError, StorageLayout, StorageResult};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum spacing between two saves while the crawl is still running
const MIN_SAVE_INTERVAL: Duration = Duration::from_secs(180);

/// Atomically writes the finished-domains set
pub fn save_checkpoint(layout: &StorageLayout, finished: &[String]) -> StorageResult<()> {
    std::fs::create_dir_all(layout.data_dir())?;

    let tmp = layout.checkpoint_tmp();
    let serialized = serde_json::to_vec_pretty(finished)?;
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&serialized)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, layout.checkpoint_file())?;
    Ok(())
}

/// Loads the finished-domains set; an absent file is an empty set
pub fn load_checkpoint(layout: &StorageLayout) -> StorageResult<HashSet<String>> {
    let path = layout.checkpoint_file();
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let content = std::fs::read_to_string(&path)?;
    let domains: Vec<String> =
        serde_json::from_str(&content).map_err(|e| StorageError::CorruptCheckpoint {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(domains.into_iter().collect())
}

/// Background checkpoint task
///
/// Ticks every `interval`; while the crawl is running, saves no more often
/// than `MIN_SAVE_INTERVAL`. A shutdown request triggers one final save
/// before exit. Save failures are logged and retried on the next tick.
pub async fn run_checkpoint_writer(
    layout: StorageLayout,
    controller: Arc<FetchController>,
    run_state: Arc<RunState>,
    interval: Duration,
) {
    // Spaced so the first periodic save also waits out the minimum interval
    let mut last_save = Instant::now();

    loop {
        let stopping = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            _ = run_state.shutdown_requested() => true,
        };

        if !stopping && last_save.elapsed() < MIN_SAVE_INTERVAL {
            continue;
        }

        let finished = controller.finished_domains();
        if finished.is_empty() && !stopping {
            continue;
        }

        match save_checkpoint(&layout, &finished) {
            Ok(()) => {
                last_save = Instant::now();
                tracing::debug!("Checkpointed {} finished domains", finished.len());
            }
            Err(e) => tracing::warn!("Checkpoint save failed: {}", e),
        }

        if stopping {
            tracing::info!("Final checkpoint written ({} domains)", finished.len());
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Stage;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path(), Stage::Crawl);

        let finished = vec!["a.com".to_string(), "b.net".to_string()];
        save_checkpoint(&layout, &finished).unwrap();

        let loaded = load_checkpoint(&layout).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("a.com"));
        assert!(loaded.contains("b.net"));
        // The temp file never survives a successful save
        assert!(!layout.checkpoint_tmp().exists());
    }

    #[test]
    fn test_load_absent_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path(), Stage::Crawl);
        assert!(load_checkpoint(&layout).unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_errors() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path(), Stage::Crawl);
        std::fs::create_dir_all(layout.data_dir()).unwrap();
        std::fs::write(layout.checkpoint_file(), "{{{not json").unwrap();

        assert!(matches!(
            load_checkpoint(&layout),
            Err(StorageError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path(), Stage::Crawl);

        save_checkpoint(&layout, &["a.com".to_string()]).unwrap();
        save_checkpoint(&layout, &["a.com".to_string(), "b.net".to_string()]).unwrap();

        let loaded = load_checkpoint(&layout).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_writer_saves_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path(), Stage::Crawl);
        let controller = Arc::new(FetchController::new(10));
        let run_state = Arc::new(RunState::new());

        controller.register_seed("done.com", 1).unwrap();
        controller.complete("done.com").unwrap();

        let writer = tokio::spawn(run_checkpoint_writer(
            layout.clone(),
            Arc::clone(&controller),
            Arc::clone(&run_state),
            Duration::from_secs(3600),
        ));

        run_state.begin_shutdown();
        tokio::time::timeout(Duration::from_secs(2), writer)
            .await
            .expect("checkpointer should exit")
            .unwrap();

        let loaded = load_checkpoint(&layout).unwrap();
        assert!(loaded.contains("done.com"));
    }
}
