//! Startup resume reconciliation
//!
//! A domain is either fully complete or entirely re-crawled: metadata rows
//! belonging to domains absent from the checkpoint are pruned and their dump
//! directories deleted, because a partially crawled domain's data cannot be
//! trusted. Running the reconciler twice in a row is a no-op the second
//! time.

use crate::storage::{load_checkpoint, StorageLayout, StorageResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// What the reconciler did at startup
#[derive(Debug, Default)]
pub struct ResumeOutcome {
    /// Domains that completed in an earlier run; skipped during seeding
    pub finished: HashSet<String>,
    pub meta_rows_removed: u64,
    pub dump_dirs_removed: u64,
}

/// Reconciles on-disk state with the finished-domains checkpoint
pub fn reconcile(layout: &StorageLayout) -> StorageResult<ResumeOutcome> {
    let finished = load_checkpoint(layout)?;
    let mut outcome = ResumeOutcome {
        finished,
        ..Default::default()
    };

    prune_meta_files(layout, &mut outcome)?;
    prune_dump_dirs(layout, &mut outcome)?;

    tracing::info!(
        "Resume: {} finished domains kept, {} meta rows pruned, {} dump dirs removed",
        outcome.finished.len(),
        outcome.meta_rows_removed,
        outcome.dump_dirs_removed,
    );
    Ok(outcome)
}

/// Stream-filters every metadata file: keep rows of finished domains, drop
/// the rest. Rewrites are atomic (tmp + rename); emptied files are deleted.
fn prune_meta_files(layout: &StorageLayout, outcome: &mut ResumeOutcome) -> StorageResult<()> {
    let data_dir = layout.data_dir();
    if !data_dir.is_dir() {
        return Ok(());
    }

    let prefix = layout.meta_prefix();
    for entry in std::fs::read_dir(&data_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) || !name.ends_with(".json") {
            continue;
        }

        let path = entry.path();
        let content = std::fs::read_to_string(&path)?;

        let mut kept: Vec<&str> = Vec::new();
        let mut removed: u64 = 0;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match row_domain(line) {
                Some(dom_tld) if outcome.finished.contains(&dom_tld) => kept.push(line),
                // Unfinished domain or unparseable row: drop it
                _ => removed += 1,
            }
        }

        if removed == 0 {
            continue;
        }
        outcome.meta_rows_removed += removed;

        if kept.is_empty() {
            tracing::debug!("{}: no finished rows left, deleting", name);
            std::fs::remove_file(&path)?;
            continue;
        }

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            for line in &kept {
                file.write_all(line.as_bytes())?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("{}: removed {} rows", name, removed);
    }

    Ok(())
}

/// Deletes dump directories of domains that are not finished
fn prune_dump_dirs(layout: &StorageLayout, outcome: &mut ResumeOutcome) -> StorageResult<()> {
    let dumps_dir = layout.dumps_dir();
    if !dumps_dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(&dumps_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let dom_tld = entry.file_name().to_string_lossy().into_owned();
        if !outcome.finished.contains(&dom_tld) {
            remove_dir_logged(&entry.path(), &dom_tld);
            outcome.dump_dirs_removed += 1;
        }
    }

    Ok(())
}

fn remove_dir_logged(path: &Path, dom_tld: &str) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        tracing::warn!("Failed to remove dump dir for {}: {}", dom_tld, e);
    }
}

/// Extracts the dom_tld of one ndjson row without requiring the full schema
fn row_domain(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("dom_tld")?.as_str().map(str::to_string)
}
