//! Response store: rotating per-domain dump files + ndjson metadata
//!
//! Bodies land in append-only files under `dumps/<domain_key>/`, framed by
//! an 8-byte big-endian length so readers never see a partial record. The
//! active file carries a `.open` suffix and is renamed into place when it
//! rotates past the size threshold or the store is finalized. Metadata goes
//! to one ndjson file per worker, so every file has a single writer.

use crate::crawler::FetchResponse;
use crate::seo::SeoIssue;
use crate::storage::{StorageLayout, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// One metadata row, serialized as a single ndjson line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaRecord {
    pub url: String,
    pub dom_tld: String,
    pub sub_dom_tld: String,
    pub request_discriminator: String,
    pub status_code: i32,
    pub num_redirects: u32,
    pub is_timeout: bool,
    pub elapsed_ms: u64,
    pub depth: u32,
    pub attempt: u32,
    pub engine: usize,
    pub content_length: usize,
    /// Dump file holding the body, relative to the domain's dump directory
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dump_file: Option<String>,
    /// Byte offset of the body record inside that file
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body_offset: Option<u64>,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub seo_issues: Vec<SeoIssue>,
}

/// The active dump file of one domain
struct DomainDump {
    file: File,
    open_path: PathBuf,
    seq: u32,
    written: u64,
}

struct MetaWriter {
    path: PathBuf,
    file: Option<File>,
}

impl MetaWriter {
    fn append_line(&mut self, line: &str) -> std::io::Result<()> {
        if self.file.is_none() {
            self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let file = self.file.as_mut().unwrap();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Append-only response store, shared by all workers
pub struct DumpStore {
    layout: StorageLayout,
    max_dump_size: u64,
    meta_writers: Vec<Mutex<MetaWriter>>,
    dumps: Mutex<HashMap<String, DomainDump>>,
}

impl DumpStore {
    pub fn new(layout: StorageLayout, max_dump_size: u64, workers: usize) -> Self {
        let meta_writers = (0..workers.max(1))
            .map(|worker_id| {
                Mutex::new(MetaWriter {
                    path: layout.meta_file(worker_id),
                    file: None,
                })
            })
            .collect();

        Self {
            layout,
            max_dump_size,
            meta_writers,
            dumps: Mutex::new(HashMap::new()),
        }
    }

    /// Appends one terminal response: body to the domain dump, metadata to
    /// the worker's ndjson file
    pub fn append(
        &self,
        worker_id: usize,
        response: &FetchResponse,
        seo_issues: &[SeoIssue],
    ) -> StorageResult<()> {
        let (dump_file, body_offset) = if response.content.is_empty() {
            (None, None)
        } else {
            let (name, offset) = self.write_body(&response.request.domain_key, &response.content)?;
            (Some(name), Some(offset))
        };

        let record = MetaRecord {
            url: response.request.url.clone(),
            dom_tld: response.request.domain_key.clone(),
            sub_dom_tld: response.request.sub_domain_key.clone(),
            request_discriminator: response.request_discriminator().to_string(),
            status_code: response.status_code,
            num_redirects: response.num_redirects,
            is_timeout: response.is_timeout,
            elapsed_ms: response.elapsed_ms,
            depth: response.request.depth,
            attempt: response.request.attempt,
            engine: response.request.engine,
            content_length: response.content.len(),
            dump_file,
            body_offset,
            fetched_at: Utc::now(),
            seo_issues: seo_issues.to_vec(),
        };

        let line = serde_json::to_string(&record)?;
        let writer = &self.meta_writers[worker_id % self.meta_writers.len()];
        writer.lock().unwrap().append_line(&line)?;
        Ok(())
    }

    /// Writes one length-prefixed body record, rotating first if the active
    /// file is over the threshold. Returns (finalized file name, offset).
    fn write_body(&self, dom_tld: &str, content: &[u8]) -> StorageResult<(String, u64)> {
        let mut dumps = self.dumps.lock().unwrap();

        if let Some(dump) = dumps.get(dom_tld) {
            if dump.written >= self.max_dump_size {
                let dump = dumps.remove(dom_tld).unwrap();
                finalize_dump(dump)?;
            }
        }

        if !dumps.contains_key(dom_tld) {
            let dump = self.open_next_dump(dom_tld)?;
            dumps.insert(dom_tld.to_string(), dump);
        }

        let dump = dumps.get_mut(dom_tld).unwrap();
        let offset = dump.written;
        dump.file.write_all(&(content.len() as u64).to_be_bytes())?;
        dump.file.write_all(content)?;
        dump.written += 8 + content.len() as u64;

        Ok((final_name(dump.seq), offset))
    }

    /// Opens the next dump file for a domain, skipping sequence numbers
    /// already on disk from earlier runs
    fn open_next_dump(&self, dom_tld: &str) -> StorageResult<DomainDump> {
        let dir = self.layout.domain_dump_dir(dom_tld);
        std::fs::create_dir_all(&dir)?;

        let mut seq = 0u32;
        while dir.join(final_name(seq)).exists() || dir.join(open_name(seq)).exists() {
            seq += 1;
        }

        let open_path = dir.join(open_name(seq));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&open_path)?;

        Ok(DomainDump {
            file,
            open_path,
            seq,
            written: 0,
        })
    }

    /// Finalizes every active dump file (rename `.open` into place)
    ///
    /// Called once at the end of a stage; failing to finalize one domain
    /// must not stop the others.
    pub fn finalize(&self) {
        let mut dumps = self.dumps.lock().unwrap();
        for (dom_tld, dump) in dumps.drain() {
            if let Err(e) = finalize_dump(dump) {
                tracing::warn!("Failed to finalize dump for {}: {}", dom_tld, e);
            }
        }
    }
}

fn finalize_dump(mut dump: DomainDump) -> StorageResult<()> {
    dump.file.flush()?;
    let final_path = dump.open_path.with_extension("");
    std::fs::rename(&dump.open_path, final_path)?;
    Ok(())
}

fn final_name(seq: u32) -> String {
    format!("dump_{:04}.bin", seq)
}

fn open_name(seq: u32) -> String {
    format!("dump_{:04}.bin.open", seq)
}
