//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - [`LogSink`], the diagnostics channel handed to pipeline components
//!
//! The pipeline never writes to the terminal on its own. Each component
//! receives an `Arc<dyn LogSink>` when it is constructed, so tests can swap
//! in a [`NullSink`] (or a capturing sink) without touching global state.
//!
//! # Example
//!
//! ```ignore
//! // Terminal logging from the binary edges
//! log!("serve"; "http://{}", addr);
//!
//! // Logging through an injected sink
//! log!(self.sink => "content"; "{} is not published", route);
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::{Arc, OnceLock},
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

// ============================================================================
// Layout Constants
// ============================================================================
//
// Line format: "[module] message"
//               ^------^ ^-----^
//               prefix   truncated to the remaining width

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;

/// Calculate total prefix length for a module name.
///
/// Returns: `module.len() + 3` (for `[`, `]`, and trailing space)
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// log!(sink => "module"; "routed through a LogSink");
/// ```
#[macro_export]
macro_rules! log {
    ($sink:expr => $module:expr; $($arg:tt)*) => {{
        $sink.log($module, &format!($($arg)*))
    }};
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for pipeline diagnostics.
pub trait LogSink: Send + Sync {
    fn log(&self, module: &str, message: &str);
}

/// Shared handle passed into component constructors.
pub type Sink = Arc<dyn LogSink>;

/// Forwards every message to the colored terminal logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl LogSink for TerminalSink {
    fn log(&self, module: &str, message: &str) {
        log(module, message);
    }
}

/// Drops everything. Used by `--quiet` and by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _module: &str, _message: &str) {}
}

/// Build the sink selected on the command line.
pub fn sink(quiet: bool) -> Sink {
    if quiet {
        Arc::new(NullSink)
    } else {
        Arc::new(TerminalSink)
    }
}

/// Captures messages as `"[module] message"` lines.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn log(&self, module: &str, message: &str) {
        self.lines.lock().push(format!("[{module}] {message}"));
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Automatically truncates long messages to fit terminal width.
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();

    if message.contains('\n') {
        // Multiline messages (error chains) are printed whole.
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let prefix_len = calc_prefix_len(module.len());
        let max_msg_len = width.saturating_sub(prefix_len);
        writeln!(stdout, "{prefix} {}", truncate_str(message, max_msg_len)).ok();
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================
