use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

use crate::error::LogError;
use crate::invariants::{debug_assert_line_fits, debug_assert_position_in_bounds};
use crate::level::{Level, LevelFilter};

const MARKER: &str = "---^-OVERWRITE-^---\n";
const MIN_CAP: u64 = 256;

struct Inner {
    file: File,
    cap: u64,
    write_position: u64,
    overwriting: bool,
    marker_pos: Option<u64>,
}

impl Inner {
    fn blank_marker(&mut self) -> std::io::Result<()> {
        if let Some(pos) = self.marker_pos.take() {
            self.file.seek(SeekFrom::Start(pos))?;
            let mut blank = vec![b' '; MARKER.len()];
            *blank.last_mut().unwrap() = b'\n';
            self.file.write_all(&blank)?;
        }
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let marker_len = MARKER.len() as u64;
        let line_len = line.len() as u64;

        if self.overwriting {
            self.blank_marker()?;
        }

        if self.write_position + line_len > self.cap {
            self.write_position = 0;
            self.overwriting = true;
        }
        debug_assert_position_in_bounds!(self.write_position, self.cap);

        self.file.seek(SeekFrom::Start(self.write_position))?;
        self.file.write_all(line.as_bytes())?;
        self.write_position += line_len;

        if self.overwriting {
            debug_assert_position_in_bounds!(self.write_position + marker_len, self.cap + 1);
            self.file.seek(SeekFrom::Start(self.write_position))?;
            self.file.write_all(MARKER.as_bytes())?;
            self.marker_pos = Some(self.write_position);
        }

        self.file.flush()?;
        Ok(())
    }
}

/// A single-file circular append log: crash-recoverable, wraps when full,
/// serves as the process-wide structured logging backend (spec §4.7).
pub struct CircularLog {
    inner: Mutex<Inner>,
    level: LevelFilter,
}

impl CircularLog {
    /// Opens (or creates) the log file at `path`, recovering the wrap state
    /// from an existing overwrite marker if present (spec §4.7 "Recovery").
    pub fn open(path: impl AsRef<Path>, cap: u64, min_level: Level) -> Result<Self, LogError> {
        if cap < MIN_CAP {
            return Err(LogError::CapTooSmall(cap));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let file_len = file.metadata()?.len();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let (write_position, overwriting, marker_pos) =
            if let Some(pos) = find_marker(&contents) {
                (pos as u64, true, Some(pos as u64))
            } else if file_len >= cap {
                (0, true, None)
            } else {
                (file_len, false, None)
            };

        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                cap,
                write_position,
                overwriting,
                marker_pos,
            }),
            level: LevelFilter::new(min_level),
        })
    }

    /// Returns the level filter handle so callers can tune verbosity at
    /// runtime (spec §4.7 "Level filtering").
    #[must_use]
    pub fn level_filter(&self) -> &LevelFilter {
        &self.level
    }

    /// Writes one line if `level` passes the current filter. Also mirrored
    /// to stderr under the same lock, for line atomicity (spec §5 "Log").
    pub fn log(&self, level: Level, message: &str) {
        if !self.level.allows(level) {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let line = format_line(level, message, inner.cap, inner.marker_pos.is_some());
        eprint!("{line}");
        if let Err(err) = inner.write_line(&line) {
            eprintln!("relay-log: write failed: {err}");
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Reconstructs logical order and returns the last `n` lines (spec §4.7
    /// "Reads"). Reopens the file for an independent read cursor.
    pub fn tail(&self, n: usize) -> Result<Vec<String>, LogError> {
        let inner = self.inner.lock().unwrap();
        let mut buf = Vec::new();
        let mut file = inner.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut buf)?;

        let logical = match inner.marker_pos {
            Some(pos) => {
                let pos = pos as usize;
                let marker_end = (pos + MARKER.len()).min(buf.len());
                let mut out = buf[marker_end..].to_vec();
                out.extend_from_slice(&buf[..pos]);
                out
            }
            None => buf,
        };

        let text = String::from_utf8_lossy(&logical);
        let lines: Vec<String> = text
            .split('\n')
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].to_vec())
    }
}

/// Formats one line, truncating the message so the whole line fits within
/// `cap - marker_len` when the file is (or will be) in overwrite mode.
fn format_line(level: Level, message: &str, cap: u64, marker_present: bool) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    let prefix = format!("[{timestamp}] [{}] ", level.padded());
    let marker_len = if marker_present { MARKER.len() as u64 } else { 0 };
    let budget = cap.saturating_sub(marker_len).saturating_sub(prefix.len() as u64 + 1);
    let message = truncate_utf8(message, budget as usize);
    let line = format!("{prefix}{message}\n");
    debug_assert_line_fits!(line.len() as u64, cap, marker_len);
    line
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}

/// Scans `buf` for the marker's literal byte sequence (ignoring the trailing
/// newline, which may have been partially overwritten by a subsequent blank).
fn find_marker(buf: &[u8]) -> Option<usize> {
    let needle = MARKER.trim_end().as_bytes();
    buf.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_within_cap_without_wrapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let log = CircularLog::open(&path, 4096, Level::Debug).unwrap();
        log.info("hello");
        log.warn("world");

        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO ] hello"));
        assert!(lines[1].contains("[WARN ] world"));
    }

    #[test]
    fn wraps_and_reconstructs_logical_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let cap = 256;
        let log = CircularLog::open(&path, cap, Level::Debug).unwrap();

        for i in 0..40 {
            log.info(&format!("line {i:03}"));
        }

        let lines = log.tail(3).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("line 039"));
    }

    #[test]
    fn level_filter_drops_below_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let log = CircularLog::open(&path, 4096, Level::Warn).unwrap();
        log.debug("should be dropped");
        log.info("also dropped");
        log.error("kept");

        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("kept"));
    }

    #[test]
    fn recovers_overwrite_state_from_existing_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let cap = 256;
        {
            let log = CircularLog::open(&path, cap, Level::Debug).unwrap();
            for i in 0..40 {
                log.info(&format!("line {i:03}"));
            }
        }

        let reopened = CircularLog::open(&path, cap, Level::Debug).unwrap();
        reopened.info("after reopen");
        let lines = reopened.tail(1).unwrap();
        assert!(lines[0].contains("after reopen"));
    }

    #[test]
    fn rejects_cap_below_minimum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        assert!(matches!(
            CircularLog::open(&path, 64, Level::Debug),
            Err(LogError::CapTooSmall(64))
        ));
    }
}
