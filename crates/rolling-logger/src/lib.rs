//! Rolling Logger
//!
//! File logger for the app's `tracing` output (and everything sent through the
//! `log` facade). The active file `<name>.log` is rolled into `<name>.1.log`,
//! `<name>.2.log`, ... once it grows past a size cap, and the most recent lines
//! are kept in a ring buffer so a diagnostics screen can show them without
//! reading the disk.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::MakeWriter;

/// Logger tuning
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Roll the active file once it reaches this many bytes
    pub max_file_bytes: u64,
    /// Number of rolled files kept next to the active one
    pub max_rolled_files: usize,
    /// Lines kept in memory
    pub buffer_lines: usize,
    pub level: tracing::Level,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            max_rolled_files: 3,
            buffer_lines: 500,
            level: tracing::Level::INFO,
        }
    }
}

/// Size-capped log file plus in-memory tail
pub struct RollingFile {
    dir: PathBuf,
    name: String,
    config: LoggerConfig,
    file: File,
    size: u64,
    recent: VecDeque<String>,
}

impl RollingFile {
    pub fn open(dir: &Path, name: &str, config: LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        let capacity = config.buffer_lines;

        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            config,
            file,
            size,
            recent: VecDeque::with_capacity(capacity),
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.name))
    }

    fn rolled_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.name, index))
    }

    /// Append one line, rolling first if the cap would be exceeded
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let bytes = line.len() as u64 + 1;
        if self.size > 0 && self.size + bytes > self.config.max_file_bytes {
            self.roll()?;
        }

        writeln!(self.file, "{}", line)?;
        self.size += bytes;

        if self.config.buffer_lines > 0 {
            if self.recent.len() == self.config.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_string());
        }
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.config.max_rolled_files == 0 {
            self.file = File::create(self.active_path())?;
            self.size = 0;
            return Ok(());
        }

        let oldest = self.rolled_path(self.config.max_rolled_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.config.max_rolled_files).rev() {
            let from = self.rolled_path(index);
            if from.exists() {
                fs::rename(&from, self.rolled_path(index + 1))?;
            }
        }
        fs::rename(self.active_path(), self.rolled_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(self.active_path())?;
        self.size = 0;
        Ok(())
    }

    pub fn recent_lines(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }
}

/// Handle shared between the subscriber and the helper functions
#[derive(Clone)]
pub struct SharedLog(Arc<Mutex<RollingFile>>);

impl SharedLog {
    pub fn new(file: RollingFile) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }

    pub fn recent_lines(&self) -> Vec<String> {
        self.0.lock().map(|file| file.recent_lines()).unwrap_or_default()
    }

    pub fn active_path(&self) -> Option<PathBuf> {
        self.0.lock().ok().map(|file| file.active_path())
    }
}

/// Per-event writer handed out to `tracing-subscriber`
pub struct LogWriter(Arc<Mutex<RollingFile>>);

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        for line in text.lines().filter(|line| !line.is_empty()) {
            file.write_line(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.file.flush(),
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SharedLog {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.0.clone())
    }
}

static LOGGER: OnceLock<SharedLog> = OnceLock::new();

/// Initialize the global logger with default settings
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, LoggerConfig::default())
}

/// Initialize the global logger.
///
/// Installs a `tracing` subscriber writing into the rolling file and bridges
/// the `log` facade into it. Fails if a global subscriber is already set.
#[cfg(not(target_os = "android"))]
pub fn init_logger_with(log_dir: PathBuf, app_name: &str, config: LoggerConfig) -> Result<(), String> {
    let level = config.level;
    let file = RollingFile::open(&log_dir, app_name, config)
        .map_err(|e| format!("Failed to open log file: {}", e))?;
    let shared = SharedLog::new(file);

    tracing_subscriber::fmt()
        .with_writer(shared.clone())
        .with_ansi(false)
        .with_max_level(level)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    LOGGER
        .set(shared)
        .map_err(|_| "Logger already initialized".to_string())?;

    tracing::info!(
        "=== {} started {} ===",
        app_name,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

/// Android has no writable log dir worth tailing; forward to logcat instead
#[cfg(target_os = "android")]
pub fn init_logger_with(_log_dir: PathBuf, app_name: &str, _config: LoggerConfig) -> Result<(), String> {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag(app_name),
    );
    Ok(())
}

fn ensure_init() -> Result<(), String> {
    if cfg!(target_os = "android") || LOGGER.get().is_some() {
        Ok(())
    } else {
        Err("Logger not initialized".to_string())
    }
}

pub fn info(message: &str) -> Result<(), String> {
    ensure_init()?;
    log::info!("{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), String> {
    ensure_init()?;
    log::warn!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), String> {
    ensure_init()?;
    log::error!("{}", message);
    Ok(())
}

/// Last lines written since startup (empty before init)
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(SharedLog::recent_lines).unwrap_or_default()
}

pub fn log_file_path() -> Option<PathBuf> {
    LOGGER.get().and_then(SharedLog::active_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> LoggerConfig {
        LoggerConfig {
            max_file_bytes: 32,
            max_rolled_files: 2,
            buffer_lines: 3,
            level: tracing::Level::DEBUG,
        }
    }

    #[test]
    fn test_rolls_when_cap_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", small_config()).unwrap();

        file.write_line("0123456789012345678").unwrap();
        file.write_line("second line goes here").unwrap();

        assert!(dir.path().join("app.1.log").exists());
        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(active, "second line goes here\n");
    }

    #[test]
    fn test_keeps_bounded_number_of_rolled_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", small_config()).unwrap();

        for i in 0..6 {
            file.write_line(&format!("line number {} padded out", i)).unwrap();
        }

        assert!(dir.path().join("app.1.log").exists());
        assert!(dir.path().join("app.2.log").exists());
        assert!(!dir.path().join("app.3.log").exists());
        let newest_rolled = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(newest_rolled, "line number 4 padded out\n");
    }

    #[test]
    fn test_ring_buffer_keeps_latest_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", small_config()).unwrap();

        for line in ["a", "b", "c", "d"] {
            file.write_line(line).unwrap();
        }

        assert_eq!(file.recent_lines(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_writer_splits_lines() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedLog::new(RollingFile::open(dir.path(), "app", LoggerConfig::default()).unwrap());

        let mut writer = shared.make_writer();
        writer.write_all(b"first\nsecond\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(shared.recent_lines(), vec!["first", "second"]);
    }
}
