//! Append-only CoT history journal and replay scheduling.
//!
//! Each journal record is `<ISO-8601 UTC timestamp>\n<cot xml>\n\n`. The
//! journal is never truncated here; rotation belongs to whoever owns the file.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use trackbridge_core::error::{ConfigError, Result, TransportError};

/// Appends sent CoT messages to the journal file.
#[derive(Debug)]
pub struct HistoryWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl HistoryWriter {
    /// Opens (or creates) the journal in append mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| TransportError::history(path.display(), e))?;

        debug!(path = %path.display(), "History journal opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record stamped with `at`.
    pub async fn append(&self, xml: &str, at: DateTime<Utc>) -> Result<()> {
        let record = format_record(xml, at);

        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes())
            .await
            .map_err(|e| TransportError::history(self.path.display(), e))?;
        file.flush()
            .await
            .map_err(|e| TransportError::history(self.path.display(), e))?;
        Ok(())
    }
}

fn format_record(xml: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}\n{}\n\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        xml.trim_end()
    )
}

/// One journal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub xml: String,
}

/// Reads and parses a journal file.
pub async fn read_entries(path: impl AsRef<Path>) -> Result<Vec<HistoryEntry>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TransportError::history(path.display(), e))?;
    Ok(parse_entries(&contents))
}

/// Parses journal text into entries ordered by time.
///
/// A record whose timestamp line is missing or unreadable takes its time from
/// the event's `time` attribute; records with neither are skipped.
pub fn parse_entries(contents: &str) -> Vec<HistoryEntry> {
    let normalized = contents.replace("\r\n", "\n");
    let mut entries = Vec::new();

    for block in normalized.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let (first, rest) = block.split_once('\n').unwrap_or((block, ""));
        let entry = match first.trim().parse::<DateTime<Utc>>() {
            Ok(time) if !rest.trim().is_empty() => Some(HistoryEntry {
                time,
                xml: rest.trim().to_string(),
            }),
            Ok(_) => None,
            Err(_) => event_time(block).map(|time| HistoryEntry {
                time,
                xml: block.to_string(),
            }),
        };

        match entry {
            Some(entry) => entries.push(entry),
            None => warn!(record = %first, "Skipping unreadable history record"),
        }
    }

    entries.sort_by_key(|e| e.time);
    entries
}

fn event_time(xml: &str) -> Option<DateTime<Utc>> {
    static TIME_ATTR: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = TIME_ATTR
        .get_or_init(|| Regex::new(r#"<event\b[^>]*?\btime="([^"]+)""#).ok())
        .as_ref()?;

    regex
        .captures(xml)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Wall-clock schedule for resending journal entries.
#[derive(Debug, Clone)]
pub struct ReplayPlan {
    entries: Vec<HistoryEntry>,
    speed: f64,
}

impl ReplayPlan {
    /// Creates a plan that plays `entries` at `speed` times real time.
    ///
    /// # Errors
    ///
    /// Returns a config error if `speed` is not a positive finite number.
    pub fn new(mut entries: Vec<HistoryEntry>, speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(
                ConfigError::invalid_value("speed", format!("must be positive, got {}", speed))
                    .into(),
            );
        }
        entries.sort_by_key(|e| e.time);
        Ok(Self { entries, speed })
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Delay of an entry relative to the start of playback.
    pub fn offset_of(&self, entry: &HistoryEntry) -> Duration {
        let Some(first) = self.entries.first() else {
            return Duration::ZERO;
        };

        let elapsed = (entry.time - first.time).to_std().unwrap_or(Duration::ZERO);
        elapsed.div_f64(self.speed)
    }

    /// Entries paired with their playback offsets.
    pub fn schedule(&self) -> impl Iterator<Item = (Duration, &HistoryEntry)> + '_ {
        self.entries.iter().map(move |e| (self.offset_of(e), e))
    }

    /// Playback length at the configured speed.
    pub fn duration(&self) -> Duration {
        self.entries
            .last()
            .map(|last| self.offset_of(last))
            .unwrap_or(Duration::ZERO)
    }
}
