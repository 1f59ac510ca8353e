//! Leveled, tagged log sink shared by every component of the ECU.
//!
//! Records are rendered as `[<level>][<module>] <message>\r\n` into fixed
//! buffers and written synchronously to the configured sink. A message body
//! longer than [`MESSAGE_CAPACITY`] bytes, or a full line longer than
//! [`LINE_CAPACITY`] bytes, is truncated at a character boundary. The line
//! terminator is always kept.
//!
//! Components log through the `log_*!` macros:
//!
//! ```rust
//! use mini_ecu::logging::{CaptureSink, Logger};
//! use mini_ecu::log_info;
//!
//! let sink = CaptureSink::new();
//! let logger = Logger::new(sink.clone());
//! log_info!(logger, "CLI", "speed {:.1}", 42.5);
//! assert_eq!(sink.contents(), "[I][CLI] speed 42.5\r\n");
//! ```

use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Maximum size of the formatted message body in bytes.
pub const MESSAGE_CAPACITY: usize = 128;
/// Maximum size of an emitted line in bytes, including `\r\n`.
pub const LINE_CAPACITY: usize = 160;

const LINE_END: &str = "\r\n";
const DEFAULT_MODULE: &str = "GEN";

const_assert!(MESSAGE_CAPACITY < LINE_CAPACITY);

/// Record severity. Lower values are more severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_char(self) -> char {
        match self {
            LogLevel::Error => 'E',
            LogLevel::Warn => 'W',
            LogLevel::Info => 'I',
            LogLevel::Debug => 'D',
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" | "e" => Ok(LogLevel::Error),
            "warn" | "warning" | "w" => Ok(LogLevel::Warn),
            "info" | "i" => Ok(LogLevel::Info),
            "debug" | "d" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// `fmt::Write` adapter that stops accepting text once `limit` bytes are
/// used, never splitting a UTF-8 sequence.
struct Clipped<const N: usize> {
    buf: ArrayString<N>,
    limit: usize,
}

impl<const N: usize> Clipped<N> {
    fn new(limit: usize) -> Self {
        Self {
            buf: ArrayString::new(),
            limit: limit.min(N),
        }
    }
}

impl<const N: usize> fmt::Write for Clipped<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.buf.len() + ch.len_utf8() > self.limit {
                break;
            }
            self.buf.push(ch);
        }
        Ok(())
    }
}

/// Render one record, applying both truncation limits.
pub fn format_record(
    level: LogLevel,
    module: &str,
    args: fmt::Arguments<'_>,
) -> ArrayString<LINE_CAPACITY> {
    let mut body = Clipped::<MESSAGE_CAPACITY>::new(MESSAGE_CAPACITY);
    let _ = body.write_fmt(args);

    let module = if module.is_empty() { DEFAULT_MODULE } else { module };

    let mut line = Clipped::<LINE_CAPACITY>::new(LINE_CAPACITY - LINE_END.len());
    let _ = write!(line, "[{}][{}] {}", level.as_char(), module, body.buf);

    let mut out = line.buf;
    out.push_str(LINE_END);
    out
}

pub struct Logger {
    level: AtomicU8,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Logger {
    /// Create a logger at the default `Info` threshold.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self::with_level(sink, LogLevel::default())
    }

    pub fn with_level(sink: impl Write + Send + 'static, level: LogLevel) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level()
    }

    /// Emit one record. Returns `Ok(false)` when the record is filtered out
    /// and `Ok(true)` when a line reached the sink. Sink failures are
    /// returned as-is and never retried.
    pub fn write(&self, level: LogLevel, module: &str, args: fmt::Arguments<'_>) -> io::Result<bool> {
        if !self.enabled(level) {
            return Ok(false);
        }

        let line = format_record(level, module, args);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(line.as_bytes())?;
        sink.flush()?;
        Ok(true)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("level", &self.level()).finish_non_exhaustive()
    }
}

/// In-memory sink for test harnesses. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Drain everything captured so far.
    pub fn take(&self) -> String {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        let text = String::from_utf8_lossy(&buf).into_owned();
        buf.clear();
        text
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $module:expr, $($arg:tt)+) => {{
        let _ = $logger.write($crate::logging::LogLevel::Error, $module, format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $module:expr, $($arg:tt)+) => {{
        let _ = $logger.write($crate::logging::LogLevel::Warn, $module, format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $module:expr, $($arg:tt)+) => {{
        let _ = $logger.write($crate::logging::LogLevel::Info, $module, format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $module:expr, $($arg:tt)+) => {{
        let _ = $logger.write($crate::logging::LogLevel::Debug, $module, format_args!($($arg)+));
    }};
}
