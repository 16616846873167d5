//! Rolling Logger
//!
//! File logger with size-based rotation plus a circular buffer of the most
//! recent lines (for an in-app log viewer).
//!
//! `init_logger` installs a global `tracing` subscriber; records emitted
//! through the `log` facade are forwarded to it as well.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Rotation and buffer limits
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Rotate once the active file grows past this many bytes
    pub max_bytes: u64,
    /// Number of rotated files kept next to the active one
    pub max_files: usize,
    /// Lines retained in memory
    pub ring_capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_bytes: 2 * 1024 * 1024,
            max_files: 3,
            ring_capacity: 500,
        }
    }
}

#[derive(Debug)]
pub enum LoggerError {
    Io(io::Error),
    AlreadyInitialized,
    NotInitialized,
    Init(String),
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::Io(e) => write!(f, "Log file error: {}", e),
            LoggerError::AlreadyInitialized => write!(f, "Logger already initialized"),
            LoggerError::NotInitialized => write!(f, "Logger not initialized"),
            LoggerError::Init(msg) => write!(f, "Failed to install logger: {}", msg),
        }
    }
}

impl std::error::Error for LoggerError {}

impl From<io::Error> for LoggerError {
    fn from(e: io::Error) -> Self {
        LoggerError::Io(e)
    }
}

struct RollingState {
    dir: PathBuf,
    app_name: String,
    config: LoggerConfig,
    file: File,
    written: u64,
    ring: VecDeque<String>,
    partial: String,
}

impl RollingState {
    fn active_path(dir: &Path, app_name: &str) -> PathBuf {
        dir.join(format!("{}.log", app_name))
    }

    fn rotated_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.app_name, n))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.config.max_files == 0 {
            self.file = File::create(Self::active_path(&self.dir, &self.app_name))?;
            self.written = 0;
            return Ok(());
        }

        // Shift app.log.{n-1} -> app.log.{n}, dropping the oldest
        let oldest = self.rotated_path(self.config.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.config.max_files).rev() {
            let from = self.rotated_path(n);
            if from.exists() {
                fs::rename(&from, self.rotated_path(n + 1))?;
            }
        }
        let active = Self::active_path(&self.dir, &self.app_name);
        fs::rename(&active, self.rotated_path(1))?;

        self.file = File::create(&active)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            if self.config.ring_capacity == 0 {
                continue;
            }
            if self.ring.len() == self.config.ring_capacity {
                self.ring.pop_front();
            }
            self.ring.push_back(line);
        }
    }
}

/// Shared writer handed to the subscriber
#[derive(Clone)]
pub struct RollingWriter {
    state: Arc<Mutex<RollingState>>,
}

impl RollingWriter {
    pub fn open(
        log_dir: impl Into<PathBuf>,
        app_name: &str,
        config: LoggerConfig,
    ) -> Result<Self, LoggerError> {
        let dir = log_dir.into();
        fs::create_dir_all(&dir)?;

        let path = RollingState::active_path(&dir, app_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            state: Arc::new(Mutex::new(RollingState {
                dir,
                app_name: app_name.to_string(),
                ring: VecDeque::with_capacity(config.ring_capacity),
                config,
                file,
                written,
                partial: String::new(),
            })),
        })
    }

    /// Most recent lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => state.ring.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().ring.iter().cloned().collect(),
        }
    }

    pub fn active_path(&self) -> PathBuf {
        match self.state.lock() {
            Ok(state) => RollingState::active_path(&state.dir, &state.app_name),
            Err(poisoned) => {
                let state = poisoned.into_inner();
                RollingState::active_path(&state.dir, &state.app_name)
            }
        }
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;

        if state.written > 0 && state.written + buf.len() as u64 > state.config.max_bytes {
            state.rotate()?;
        }

        state.file.write_all(buf)?;
        state.written += buf.len() as u64;
        state.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

static WRITER: OnceLock<RollingWriter> = OnceLock::new();

/// Initialize the global logger with default limits.
pub fn init_logger(log_dir: impl Into<PathBuf>, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerConfig::default())
}

pub fn init_logger_with(
    log_dir: impl Into<PathBuf>,
    app_name: &str,
    config: LoggerConfig,
) -> Result<(), LoggerError> {
    if WRITER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let writer = RollingWriter::open(log_dir, app_name, config)?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))?;

    WRITER
        .set(writer)
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    tracing::info!("{} logger started", app_name);
    Ok(())
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// Recent lines from the global logger (empty before init)
pub fn recent_lines() -> Vec<String> {
    WRITER.get().map(|w| w.recent_lines()).unwrap_or_default()
}

fn ensure_initialized() -> Result<(), LoggerError> {
    if WRITER.get().is_some() {
        Ok(())
    } else {
        Err(LoggerError::NotInitialized)
    }
}
