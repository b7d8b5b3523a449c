use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Durable, append-only destination for audit lines
pub trait LogSink: Send {
    fn write(&mut self, level: LogLevel, message: &str) -> io::Result<()>;
}

/// Daily log file for one center: `<folder>/<center>_db2db-<YYYY-MM-DD>.log`
pub struct FileLogSink {
    name: String,
    file: File,
}

impl FileLogSink {
    /// Open today's log file, creating the folder if needed
    pub fn open(log_folder: &Path, center_name: &str) -> Result<Self> {
        Self::open_for_date(log_folder, center_name, Local::now().date_naive())
    }

    /// Open the log file of a given day, creating the folder if needed
    pub fn open_for_date(log_folder: &Path, center_name: &str, date: NaiveDate) -> Result<Self> {
        if !log_folder.exists() {
            fs::create_dir_all(log_folder).with_context(|| {
                format!("Failed to create log directory: {}", log_folder.display())
            })?;
        }

        let path = log_path(log_folder, center_name, date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "opened run log");

        Ok(Self {
            name: format!("{}_db2db", center_name),
            file,
        })
    }
}

impl LogSink for FileLogSink {
    fn write(&mut self, level: LogLevel, message: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        writeln!(self.file, "{} - {} - {} - {}", timestamp, self.name, level, message)?;
        self.file.flush()
    }
}

/// Path of the log file for one center and day
pub fn log_path(log_folder: &Path, center_name: &str, date: NaiveDate) -> PathBuf {
    log_folder.join(format!(
        "{}_db2db-{}.log",
        center_name,
        date.format("%Y-%m-%d")
    ))
}

/// Keeps lines in memory; shared so a test can read what the handler wrote
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryLogSink {
    pub lines: std::sync::Arc<std::sync::Mutex<Vec<(LogLevel, String)>>>,
}

#[cfg(test)]
impl LogSink for MemoryLogSink {
    fn write(&mut self, level: LogLevel, message: &str) -> io::Result<()> {
        self.lines.lock().unwrap().push((level, message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_by_center_and_date() {
        let date = NaiveDate::from_ymd_opt(2011, 6, 30).unwrap();
        assert_eq!(
            log_path(Path::new("/var/log/db2db"), "nysgrc", date),
            PathBuf::from("/var/log/db2db/nysgrc_db2db-2011-06-30.log")
        );
    }

    #[test]
    fn creates_folder_and_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("nested").join("logs");
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        {
            let mut sink = FileLogSink::open_for_date(&folder, "uva", date).unwrap();
            sink.write(LogLevel::Info, "first").unwrap();
        }
        let mut sink = FileLogSink::open_for_date(&folder, "uva", date).unwrap();
        sink.write(LogLevel::Error, "second").unwrap();

        let content = fs::read_to_string(log_path(&folder, "uva", date)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - uva_db2db - INFO - first"));
        assert!(lines[1].ends_with(" - uva_db2db - ERROR - second"));
    }

    #[test]
    fn open_fails_when_folder_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, "not a directory").unwrap();

        let err = FileLogSink::open(&blocker.join("inner"), "uva").err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to create log directory"));
    }
}
