/*!
File-based snapshot store.

Each snapshot is one file in a flat directory, named after the UTC instant it
was written (`2024-05-01T09-30-00.123456`). Two dumps within the same
microsecond get a numeric suffix (`..._1`, `..._2`). The file body is a
single encoded document with no header.

The store assumes a single writer per directory. File creation uses
`create_new`, so a racing writer can never overwrite an existing snapshot,
but no further cross-process coordination is attempted.
*/

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::registry::TypeBinding;
use crate::value::Mapping;
use crate::{Result, SnapwireError};

/// chrono pattern of snapshot file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6f";

/// Separator between the timestamp and the collision counter.
const SEQUENCE_SEPARATOR: char = '_';

/// A snapshot file found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    path: PathBuf,
    timestamp: DateTime<Utc>,
    sequence: u32,
    modified: SystemTime,
    size: u64,
}

impl SnapshotFile {
    /// Inspect `path`; `None` if its name is not a snapshot name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let Some((timestamp, sequence)) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_file_name)
        else {
            return Ok(None);
        };

        let meta = fs::metadata(path)?;
        if !meta.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path: path.to_path_buf(),
            timestamp,
            sequence,
            modified: meta.modified()?,
            size: meta.len(),
        }))
    }

    /// The identifier callers pass back to the store: the file name.
    pub fn id(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation instant embedded in the file name.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Collision counter, 0 when the name carries no suffix.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Filesystem modification time.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Absolute distance between the embedded timestamp and `target`.
    pub fn distance_micros(&self, target: DateTime<Utc>) -> u64 {
        (self.timestamp - target)
            .num_microseconds()
            .map_or(u64::MAX, i64::unsigned_abs)
    }
}

/// Split a file name into its embedded timestamp and collision counter.
pub fn parse_file_name(name: &str) -> Option<(DateTime<Utc>, u32)> {
    if let Some((base, suffix)) = name.rsplit_once(SEQUENCE_SEPARATOR) {
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            let sequence = suffix.parse().ok()?;
            return parse_file_timestamp(base).map(|ts| (ts, sequence));
        }
    }
    parse_file_timestamp(name).map(|ts| (ts, 0))
}

fn parse_file_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a user-supplied timestamp: the file-name pattern or RFC 3339.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Some(ts) = parse_file_timestamp(text) {
        return Ok(ts);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SnapwireError::validation(format!("Invalid timestamp {text:?}: {e}")))
}

/// Format an instant the way snapshot file names do.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Persists whole documents as timestamp-named files.
///
/// # Example
/// ```rust,no_run
/// use snapwire_core::{Mapping, SnapshotStore, StoreConfig, Value};
///
/// let store = SnapshotStore::open(StoreConfig::with_dir("/tmp/snapshots"))?;
///
/// let mut doc = Mapping::new();
/// doc.insert("a".to_string(), Value::from(1));
/// let snapshot = store.dump(&doc)?;
///
/// assert_eq!(store.load(None)?, doc);
/// store.prune_snapshot(&snapshot.id())?;
/// # Ok::<(), snapwire_core::SnapwireError>(())
/// ```
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    codec: Codec,
}

impl SnapshotStore {
    /// Open the store described by `config`, creating its directory.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let codec = config.build_codec();
        Self::with_codec(config.dir, codec)
    }

    /// Open a store in `dir` using an explicit codec.
    pub fn with_codec<P: AsRef<Path>>(dir: P, codec: Codec) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                SnapwireError::storage(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(Self { dir, codec })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }

    /// Register a custom type binding on this store's codec.
    pub fn register(&mut self, binding: TypeBinding) -> Result<()> {
        self.codec.register(binding)
    }

    /// Write `doc` to a new snapshot file. The data is synced to disk
    /// before this returns.
    pub fn dump(&self, doc: &Mapping) -> Result<SnapshotFile> {
        // Encode first so an unknown type never leaves a partial file behind.
        let bytes = self.codec.encode(doc)?;

        let base = format_timestamp(Utc::now());
        let (path, mut file) = self.create_unique(&base)?;

        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                SnapwireError::storage(format!(
                    "Failed to write snapshot to {}: {}",
                    path.display(),
                    e
                ))
            })?;
        drop(file);

        let snapshot = SnapshotFile::from_path(&path)?.ok_or_else(|| {
            SnapwireError::storage(format!("Snapshot {} vanished after write", path.display()))
        })?;

        info!(id = %snapshot.id(), bytes = bytes.len(), entries = doc.len(), "Snapshot written");
        #[cfg(feature = "metrics")]
        crate::observability::SnapwireMetrics::global().record_snapshot_written(bytes.len());

        Ok(snapshot)
    }

    /// Load a snapshot.
    ///
    /// Without a target this is the most recently modified file; with one,
    /// the file whose name-embedded timestamp is closest to it. An empty
    /// store yields an empty mapping.
    pub fn load(&self, target: Option<DateTime<Utc>>) -> Result<Mapping> {
        match self.list(target)?.into_iter().next() {
            Some(snapshot) => {
                debug!(id = %snapshot.id(), "Loading snapshot");
                self.read_file(snapshot.path())
            }
            None => {
                debug!(dir = %self.dir.display(), "No snapshots found, returning empty mapping");
                Ok(Mapping::new())
            }
        }
    }

    /// Load one snapshot by identifier.
    pub fn load_snapshot(&self, id: &str) -> Result<Mapping> {
        let snapshot = self.resolve_snapshot(id)?;
        self.read_file(snapshot.path())
    }

    /// Enumerate snapshots.
    ///
    /// Without a target: newest modification time first. With a target:
    /// closest embedded timestamp first, ties going to the earlier snapshot.
    pub fn list(&self, target: Option<DateTime<Utc>>) -> Result<Vec<SnapshotFile>> {
        let mut snapshots = self.scan()?;
        match target {
            None => snapshots.sort_by(|a, b| {
                b.modified
                    .cmp(&a.modified)
                    .then_with(|| b.timestamp.cmp(&a.timestamp))
                    .then_with(|| b.sequence.cmp(&a.sequence))
            }),
            Some(target) => snapshots.sort_by(|a, b| {
                a.distance_micros(target)
                    .cmp(&b.distance_micros(target))
                    .then_with(|| a.timestamp.cmp(&b.timestamp))
                    .then_with(|| a.sequence.cmp(&b.sequence))
            }),
        }
        Ok(snapshots)
    }

    /// Remove up to `max_count` snapshots, most recently modified first.
    ///
    /// Nothing is removed when fewer than `max_count` snapshots exist.
    /// Per-file failures are logged and skipped. Returns how many were
    /// removed.
    pub fn prune(&self, max_count: usize) -> Result<usize> {
        let snapshots = self.list(None)?;
        if snapshots.len() < max_count {
            debug!(available = snapshots.len(), max_count, "Fewer snapshots than prune count, nothing to do");
            return Ok(0);
        }

        let mut removed = 0;
        for snapshot in snapshots.iter().take(max_count) {
            match fs::remove_file(snapshot.path()) {
                Ok(()) => {
                    removed += 1;
                    info!(id = %snapshot.id(), "Pruned snapshot");
                    #[cfg(feature = "metrics")]
                    crate::observability::SnapwireMetrics::global().record_pruned();
                }
                Err(e) => {
                    warn!(id = %snapshot.id(), error = %e, "Failed to prune snapshot");
                    #[cfg(feature = "metrics")]
                    crate::observability::SnapwireMetrics::global().record_prune_failure();
                }
            }
        }
        Ok(removed)
    }

    /// Delete one snapshot by identifier (file name or path).
    pub fn prune_snapshot(&self, id: &str) -> Result<()> {
        let snapshot = self.resolve_snapshot(id)?;
        let path = snapshot.path();

        fs::remove_file(path).map_err(|e| {
            SnapwireError::storage(format!(
                "Failed to delete snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        info!(id, "Deleted snapshot");
        Ok(())
    }

    /// Only existing files whose name parses as a snapshot name qualify.
    fn resolve_snapshot(&self, id: &str) -> Result<SnapshotFile> {
        // Absolute paths replace the base directory on join.
        let path = self.dir.join(id);
        if !path.is_file() {
            return Err(SnapwireError::SnapshotNotFound(id.to_string()));
        }
        SnapshotFile::from_path(&path)?
            .ok_or_else(|| SnapwireError::SnapshotNotFound(id.to_string()))
    }

    fn read_file(&self, path: &Path) -> Result<Mapping> {
        let bytes = fs::read(path).map_err(|e| {
            SnapwireError::storage(format!(
                "Failed to read snapshot from {}: {}",
                path.display(),
                e
            ))
        })?;
        self.codec.decode(&bytes)
    }

    fn scan(&self) -> Result<Vec<SnapshotFile>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            SnapwireError::storage(format!(
                "Failed to read snapshot directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            match SnapshotFile::from_path(&path) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => debug!(path = %path.display(), "Ignoring non-snapshot entry"),
                // Removed between read_dir and stat.
                Err(SnapwireError::Io(e)) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(snapshots)
    }

    fn create_unique(&self, base: &str) -> Result<(PathBuf, fs::File)> {
        let mut sequence: u32 = 0;
        loop {
            let name = if sequence == 0 {
                base.to_string()
            } else {
                format!("{base}{SEQUENCE_SEPARATOR}{sequence}")
            };
            let path = self.dir.join(&name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    sequence = sequence.checked_add(1).ok_or_else(|| {
                        SnapwireError::storage(format!("Too many snapshots named {base}"))
                    })?;
                }
                Err(e) => {
                    return Err(SnapwireError::storage(format!(
                        "Failed to create snapshot {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }
}
