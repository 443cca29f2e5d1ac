//! Shared types for pylog-pretty
//!
//! This crate contains the level tables and the chunk transform seam used
//! across the pylog-pretty crates.

use crossterm::style::Color;
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Level Mapping
// ============================================================================

/// Python `logging` level names and their pino severities
static PYTHON_LEVELS: LevelMapping = LevelMapping {
    entries: &[
        ("DEBUG", 20),
        ("INFO", 30),
        ("WARNING", 40),
        ("ERROR", 50),
        ("CRITICAL", 60),
    ],
};

/// Errors raised when building a custom level mapping
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelMappingError {
    #[error("level token '{0}' is mapped more than once")]
    DuplicateToken(&'static str),

    #[error("level token '{0}' must be non-empty ASCII word characters")]
    InvalidToken(&'static str),
}

/// Fixed table from a foreign level-name token to a numeric severity.
///
/// Lookups are case-sensitive. Tokens outside the table have no mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelMapping {
    entries: &'static [(&'static str, u32)],
}

impl LevelMapping {
    /// Build a mapping from a static table, rejecting duplicate or unmatchable tokens
    pub fn new(entries: &'static [(&'static str, u32)]) -> Result<Self, LevelMappingError> {
        let mut seen = HashSet::new();
        for (token, _) in entries {
            if token.is_empty() || !token.bytes().all(is_word_byte) {
                return Err(LevelMappingError::InvalidToken(*token));
            }
            if !seen.insert(*token) {
                return Err(LevelMappingError::DuplicateToken(*token));
            }
        }
        Ok(Self { entries })
    }

    /// The process-wide Python `logging` to pino table
    pub fn python() -> &'static LevelMapping {
        &PYTHON_LEVELS
    }

    /// Look up the severity for a raw token
    pub fn get(&self, token: &[u8]) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_bytes() == token)
            .map(|(_, level)| *level)
    }

    /// Iterate over `(token, severity)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Characters accepted in a level token (`[A-Za-z0-9_]`)
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ============================================================================
// Pino Levels
// ============================================================================

/// Severity levels understood by the renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinoLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl PinoLevel {
    pub const ALL: [PinoLevel; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    /// Numeric severity as written in the `level` field
    pub fn value(&self) -> u64 {
        match self {
            Self::Trace => 10,
            Self::Debug => 20,
            Self::Info => 30,
            Self::Warn => 40,
            Self::Error => 50,
            Self::Fatal => 60,
        }
    }

    /// Exact lookup by numeric severity
    pub fn from_value(value: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.value() == value)
    }

    /// Parse a level from a name ("warn") or a number ("40")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u64>() {
            return Self::from_value(n);
        }
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" | "critical" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Trace => Color::Grey,
            Self::Debug => Color::Blue,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
        }
    }
}

// ============================================================================
// Chunk Transform
// ============================================================================

/// A synchronous stage in a byte pipeline.
///
/// `process` is called once per inbound chunk, in order, and returns the bytes
/// to forward. A stage may hold bytes back between calls; `finish` is called
/// once at end of input and must return everything still held.
pub trait Transform {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8>;

    fn finish(&mut self) -> Vec<u8>;
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        (**self).process(chunk)
    }

    fn finish(&mut self) -> Vec<u8> {
        (**self).finish()
    }
}
