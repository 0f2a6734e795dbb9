//! Append-only column files.
//!
//! Each handle writes its own file per destination, so handles never
//! contend on a file:
//!
//! ```text
//! <dir>/<destination>-<handle:04>.tsv
//! ```
//!
//! One record per line, fields separated by `\t`. Backslash, tab, newline
//! and carriage return inside a field are escaped as `\\`, `\t`, `\n` and
//! `\r`. A record with no fields is written as `\.`.
//!
//! [`WriteMode::Sync`] flushes and `sync_data`s after every batch.
//! [`WriteMode::Async`] leaves the batch in the write buffer; it reaches the
//! file on a later sync batch, a read, or [`DataSink::close`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, trace, warn};

use super::{DataSink, Predicate, SinkError, SinkFactory, WriteMode};
use crate::record::{BatchKey, Record};

const FILE_EXT: &str = "tsv";

// ------------------------------------------------------------------------------------------------
// Store
// ------------------------------------------------------------------------------------------------

/// A directory of column files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    next_handle: Arc<AtomicU64>,
}

impl FileStore {
    /// Creates the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            SinkError::Unavailable(format!("cannot create {}: {e}", dir.display()))
        })?;
        info!(dir = %dir.display(), "file store opened");
        Ok(Self {
            dir,
            next_handle: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SinkFactory for FileStore {
    fn open(&self) -> Result<Box<dyn DataSink>, SinkError> {
        if !self.dir.is_dir() {
            return Err(SinkError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FileSink {
            dir: self.dir.clone(),
            handle,
            writers: HashMap::new(),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ------------------------------------------------------------------------------------------------
// Handle
// ------------------------------------------------------------------------------------------------

/// One writer onto a [`FileStore`].
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    handle: u64,
    writers: HashMap<BatchKey, BufWriter<File>>,
    closed: bool,
}

impl FileSink {
    fn check_open(&self) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        Ok(())
    }

    fn writer(&mut self, destination: &BatchKey) -> io::Result<&mut BufWriter<File>> {
        match self.writers.entry(destination.clone()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let path = self.dir.join(format!(
                    "{}-{:04}.{FILE_EXT}",
                    destination.as_str(),
                    self.handle
                ));
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                trace!(path = %path.display(), "column file opened");
                Ok(slot.insert(BufWriter::new(file)))
            }
        }
    }

    /// Pushes buffered async batches to disk so reads observe them.
    fn flush_all(&mut self) -> io::Result<()> {
        for w in self.writers.values_mut() {
            w.flush()?;
        }
        Ok(())
    }

    /// Every column file of `destination` across all handles.
    fn files_of(&self, destination: &BatchKey) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| file_belongs_to(n, destination));
            if matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DataSink for FileSink {
    fn write_batch(
        &mut self,
        destination: &BatchKey,
        records: Vec<Record>,
        mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.check_open()?;

        let write = |w: &mut BufWriter<File>| -> io::Result<()> {
            for record in &records {
                w.write_all(encode_line(record).as_bytes())?;
            }
            if mode == WriteMode::Sync {
                w.flush()?;
                w.get_ref().sync_data()?;
            }
            Ok(())
        };

        self.writer(destination)
            .and_then(write)
            .map_err(|e| SinkError::Write {
                destination: destination.to_string(),
                reason: e.to_string(),
            })
    }

    fn count(&mut self, destination: &BatchKey) -> Result<u64, SinkError> {
        self.check_open()?;
        self.flush_all()?;

        let mut total = 0u64;
        for path in self.files_of(destination)? {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                line?;
                total += 1;
            }
        }
        Ok(total)
    }

    fn read_one(
        &mut self,
        destination: &BatchKey,
        predicate: &Predicate,
    ) -> Result<Option<Record>, SinkError> {
        self.check_open()?;
        self.flush_all()?;

        for path in self.files_of(destination)? {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let record = decode_line(&line?);
                if predicate.matches(&record) {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_err = None;
        for (destination, mut w) in self.writers.drain() {
            if let Err(e) = w.flush() {
                warn!(%destination, handle = self.handle, "flush on close failed: {e}");
                first_err.get_or_insert(e);
            }
        }
        debug!(handle = self.handle, "file sink closed");
        match first_err {
            Some(e) => Err(SinkError::Io(e)),
            None => Ok(()),
        }
    }
}

/// `true` if `file_name` is `<destination>-<handle>.tsv` for exactly this
/// destination. Destinations may contain `-`, so the handle is split off
/// at the last one.
pub(crate) fn file_belongs_to(file_name: &str, destination: &BatchKey) -> bool {
    let Some(stem) = file_name
        .strip_suffix(FILE_EXT)
        .and_then(|s| s.strip_suffix('.'))
    else {
        return false;
    };
    match stem.rsplit_once('-') {
        Some((name, handle)) => {
            name == destination.as_str()
                && !handle.is_empty()
                && handle.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

// ------------------------------------------------------------------------------------------------
// Line codec
// ------------------------------------------------------------------------------------------------

/// Line body of a record with no fields. A field never encodes to a lone
/// `\.`, so it cannot be confused with a record holding one empty field.
const EMPTY_RECORD: &str = "\\.";

pub(crate) fn encode_line(record: &Record) -> String {
    let mut line = String::new();
    if record.is_empty() {
        line.push_str(EMPTY_RECORD);
    }
    for (i, field) in record.fields().iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        for c in field.chars() {
            match c {
                '\\' => line.push_str("\\\\"),
                '\t' => line.push_str("\\t"),
                '\n' => line.push_str("\\n"),
                '\r' => line.push_str("\\r"),
                c => line.push(c),
            }
        }
    }
    line.push('\n');
    line
}

pub(crate) fn decode_line(line: &str) -> Record {
    if line == EMPTY_RECORD {
        return Record::new(Vec::new());
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\t' => fields.push(std::mem::take(&mut current)),
            '\\' => match chars.next() {
                Some('t') => current.push('\t'),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            c => current.push(c),
        }
    }
    fields.push(current);
    Record::new(fields)
}
