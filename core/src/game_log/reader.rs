use super::error::ReaderError;
use super::line::decode_line;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs;
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

const TAIL_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Reads a whole log file at once. Used to seed counters before tailing.
pub struct Reader {
    path: PathBuf,
}

impl Reader {
    pub fn from(file_path: PathBuf) -> Self {
        Reader { path: file_path }
    }

    /// Run `f` over every complete line of the file and collect the results
    /// in file order. Returns the offset just past the last newline so
    /// tailing can resume exactly where the scan stopped.
    ///
    /// `f` receives the 1-based line number and the decoded line.
    pub fn scan_log_file<T, F>(&self, f: F) -> Result<(Vec<T>, u64), ReaderError>
    where
        T: Send,
        F: Fn(u64, &str) -> Option<T> + Sync + Send,
    {
        let file = fs::File::open(&self.path).map_err(|source| ReaderError::OpenFile {
            path: self.path.clone(),
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| ReaderError::ReadFile {
                path: self.path.clone(),
                source,
            })?
            .len();
        if len == 0 {
            return Ok((Vec::new(), 0));
        }

        // SAFETY: the game only appends to its log; bytes past `len` are ignored
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::MemoryMap {
            path: self.path.clone(),
            source,
        })?;
        let bytes = mmap.as_ref();

        // Find all line boundaries
        let mut line_ranges: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        for end in memchr_iter(b'\n', bytes) {
            if end > start {
                line_ranges.push((start, end));
            }
            start = end + 1;
        }
        // an unterminated last line is still being written; the tailer gets it whole
        let end_pos = start as u64;

        let results: Vec<T> = line_ranges
            .par_iter()
            .enumerate()
            .filter_map(|(idx, &(start, end))| {
                let line = decode_line(&bytes[start..end]);
                f(idx as u64 + 1, &line)
            })
            .collect();

        Ok((results, end_pos))
    }
}

/// Where a [`Tailer`] starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStart {
    /// Current end of file; existing content is not replayed.
    End,
    /// Absolute byte offset, typically the end position of a full scan.
    Offset(u64),
}

/// Follows a growing log file line by line.
///
/// Polls for new bytes with a short idle wait. Partial lines are buffered
/// until their newline arrives, so a line is only handed out once the game
/// has flushed it completely.
pub struct Tailer {
    path: PathBuf,
    reader: BufReader<File>,
    position: u64,
    buf: Vec<u8>,
    idle_wait: Duration,
}

impl Tailer {
    pub async fn open(path: impl Into<PathBuf>, start: TailStart) -> Result<Self, ReaderError> {
        let path = path.into();
        let file = File::open(&path)
            .await
            .map_err(|source| ReaderError::OpenFile {
                path: path.clone(),
                source,
            })?;
        let mut reader = BufReader::new(file);

        let seek = match start {
            TailStart::End => SeekFrom::End(0),
            TailStart::Offset(pos) => SeekFrom::Start(pos),
        };
        let position = reader
            .seek(seek)
            .await
            .map_err(|source| ReaderError::Seek {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            reader,
            position,
            buf: Vec::new(),
            idle_wait: TAIL_SLEEP_DURATION,
        })
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Byte offset just past the last byte consumed from the file.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Wait for the next complete line.
    ///
    /// Returns `None` only once `cancel` fires; read errors are logged and
    /// retried after the idle wait.
    pub async fn next_line(&mut self, cancel: &CancellationToken) -> Option<String> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    self.check_truncated().await;
                    if !self.idle(cancel).await {
                        return None;
                    }
                }
                Ok(n) => {
                    self.position += n as u64;
                    if self.buf.ends_with(b"\n") {
                        let line = decode_line(&self.buf);
                        self.buf.clear();
                        return Some(line);
                    }
                    // Otherwise keep partial data, next read will append to it
                }
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Log read failed, retrying");
                    if !self.idle(cancel).await {
                        return None;
                    }
                }
            }
        }
    }

    // false when cancelled during the wait
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = sleep(self.idle_wait) => true,
        }
    }

    async fn check_truncated(&mut self) {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Could not stat tailed file");
                return;
            }
        };

        if len >= self.position {
            return;
        }

        tracing::warn!(
            path = %self.path.display(),
            len,
            position = self.position,
            "Log file shrank, restarting from the beginning"
        );
        match self.reader.seek(SeekFrom::Start(0)).await {
            Ok(_) => {
                self.position = 0;
                self.buf.clear();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to rewind log file");
            }
        }
    }
}
