use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or `EnvFilter` directives such as
    /// `warn,taproot.roots=debug`. `RUST_LOG` is appended when set.
    pub level: String,
    /// JSON lines instead of plain text.
    pub json: bool,
    /// Also write to stderr.
    pub stderr: bool,
    /// Also append to this file. An unopenable file only disables this sink.
    pub file: Option<PathBuf>,
    /// Lines kept by the in-memory [`LogBuffer`].
    pub buffer_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            stderr: true,
            file: None,
            buffer_lines: 2_000,
        }
    }
}

impl LoggingConfig {
    /// `level` with bare level names normalized (`Warning` becomes `warn`).
    pub fn directives(&self) -> String {
        let level = self.level.trim();
        if level.is_empty() {
            return "info".to_owned();
        }
        let lowered = level.to_ascii_lowercase();
        match lowered.as_str() {
            "warning" => "warn".to_owned(),
            "trace" | "debug" | "info" | "warn" | "error" | "off" => lowered,
            _ => level.to_owned(),
        }
    }

    /// Filter built from [`LoggingConfig::directives`] plus `RUST_LOG`.
    /// Unparseable directives degrade to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let own = self.directives();
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let candidates = match from_env {
            Some(env) => vec![format!("{own},{env}"), env, own],
            None => vec![own],
        };
        candidates
            .into_iter()
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }
}

/// Keeps the most recent formatted log lines in memory.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
        }
    }

    pub fn push_line(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Up to `n` lines, oldest first.
    pub fn last_lines(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }
}

/// The fmt layer formats a whole event before writing it, so each write is
/// split into lines as is.
impl io::Write for &LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        String::from_utf8_lossy(buf)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .for_each(|line| self.push_line(line));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

static INIT: Once = Once::new();
static BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

/// Installs the global `tracing` subscriber described by `logging`.
///
/// Only the first call installs anything; every call returns the same buffer.
pub fn init_tracing(logging: &LoggingConfig) -> Arc<LogBuffer> {
    let buffer = Arc::clone(BUFFER.get_or_init(|| Arc::new(LogBuffer::new(logging.buffer_lines))));

    INIT.call_once(|| {
        let file = logging.file.as_ref().map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(Arc::new)
        });

        let mut writer = BoxMakeWriter::new(Arc::clone(&buffer));
        if logging.stderr {
            writer = BoxMakeWriter::new(writer.and(io::stderr));
        }
        if let Some(Ok(file)) = &file {
            writer = BoxMakeWriter::new(writer.and(Arc::clone(file)));
        }

        let fmt = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        let layer = if logging.json {
            fmt.json().boxed()
        } else {
            fmt.boxed()
        };
        let installed = tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(logging.env_filter())
                .with(layer),
        )
        .is_ok();

        if let (true, Some(Err(err)), Some(path)) = (installed, &file, &logging.file) {
            tracing::warn!(
                target: "taproot.config",
                path = %path.display(),
                error = %err,
                "cannot open log file; file logging disabled"
            );
        }
    });

    buffer
}
