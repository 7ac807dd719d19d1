//! # Telemetry Logger
//!
//! Writes records as JSON Lines, rotating to a new file every
//! `max_records_per_file` records and keeping only the newest
//! `max_files_to_keep` files.
//!
//! File names end in an index that keeps increasing across restarts; age is
//! judged by that index, not by the timestamp in the name.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::LoggingConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = ".jsonl";

/// Rotating JSON Lines writer
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    files_opened: u64,
}

impl TelemetryLogger {
    /// Create a logger writing into `dir`, creating the directory if needed
    ///
    /// No file is created until the first record is logged. File indices
    /// continue after the highest one already in `dir`.
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let files_opened = list_log_files(&dir)?
            .last()
            .and_then(|path| log_index(path))
            .map_or(0, |index| index + 1);

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            files_opened,
        })
    }

    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Append one record as a single JSON line
    pub fn log<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// File currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:06}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        info!("Opened telemetry log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.files_opened += 1;

        self.prune()
    }

    /// Remove the oldest log files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let files = list_log_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry log {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok(())
    }
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION))
        .unwrap_or(false)
}

/// Trailing index of a log file name, `telemetry_<timestamp>_<index>.jsonl`
fn log_index(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(FILE_EXTENSION)?;
    stem.rsplit('_').next()?.parse().ok()
}

/// Log files in `dir`, oldest first
fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_log_file(path))
        .collect();

    files.sort_by_key(|path| (log_index(path).unwrap_or(0), path.clone()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as Json;

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        list_log_files(dir).unwrap()
    }

    #[derive(Serialize)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 100, 5).unwrap();
        assert!(logger.current_path().is_none());

        logger.log(&Sample { n: 1 }).unwrap();
        logger.log(&Sample { n: 2 }).unwrap();

        let contents = fs::read_to_string(logger.current_path().unwrap()).unwrap();
        let lines: Vec<Json> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["n"], 1);
        assert_eq!(lines[1]["n"], 2);
    }

    #[test]
    fn test_rotates_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 2, 2).unwrap();

        for n in 0..5 {
            logger.log(&Sample { n }).unwrap();
        }

        let files = log_files(dir.path());
        assert_eq!(files.len(), 2);

        let total_lines: usize = files
            .iter()
            .map(|path| fs::read_to_string(path).unwrap().lines().count())
            .sum();
        assert_eq!(total_lines, 3);

        // The newest file holds the last record
        let newest = fs::read_to_string(files.last().unwrap()).unwrap();
        let last: Json = serde_json::from_str(newest.lines().last().unwrap()).unwrap();
        assert_eq!(last["n"], 4);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TelemetryLogger::new(dir.path(), 1, 1).unwrap();
        for n in 0..3 {
            logger.log(&Sample { n }).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(log_files(dir.path()).len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ground").join("logs");

        let mut logger = TelemetryLogger::new(&nested, 10, 1).unwrap();
        logger.log(&Sample { n: 0 }).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_restart_keeps_newest_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = TelemetryLogger::new(dir.path(), 10, 1).unwrap();
        first.log(&Sample { n: 1 }).unwrap();
        let first_path = first.current_path().unwrap().to_path_buf();
        drop(first);

        // Restarted within the same second: the new file must not clash
        // with the old one or be pruned in its place
        let mut second = TelemetryLogger::new(dir.path(), 10, 1).unwrap();
        second.log(&Sample { n: 2 }).unwrap();
        let second_path = second.current_path().unwrap().to_path_buf();

        assert_ne!(first_path, second_path);
        assert_eq!(log_files(dir.path()), vec![second_path.clone()]);

        let contents = fs::read_to_string(&second_path).unwrap();
        let last: Json = serde_json::from_str(contents.lines().last().unwrap()).unwrap();
        assert_eq!(last["n"], 2);
    }

    #[test]
    fn test_index_orders_files_over_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        // A later timestamp with a lower index is older
        fs::write(dir.path().join("telemetry_20300101_000000_000001.jsonl"), "").unwrap();
        fs::write(dir.path().join("telemetry_20200101_000000_000002.jsonl"), "").unwrap();

        let files = log_files(dir.path());
        assert_eq!(log_index(&files[0]), Some(1));
        assert_eq!(log_index(&files[1]), Some(2));

        let mut logger = TelemetryLogger::new(dir.path(), 10, 2).unwrap();
        logger.log(&Sample { n: 0 }).unwrap();
        assert_eq!(log_index(logger.current_path().unwrap()), Some(3));

        let remaining: Vec<_> = log_files(dir.path()).iter().filter_map(|p| log_index(p)).collect();
        assert_eq!(remaining, vec![2, 3]);
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().into_owned(),
            max_records_per_file: 1,
            max_files_to_keep: 3,
        };

        let mut logger = TelemetryLogger::from_config(&config).unwrap();
        for n in 0..4 {
            logger.log(&Sample { n }).unwrap();
        }
        assert_eq!(log_files(dir.path()).len(), 3);
    }
}
