//! Rendering for pylog-pretty
//!
//! This crate turns pino-style JSON log lines into human-readable text,
//! in the spirit of pino-pretty's default layout.

mod lines;
mod options;
mod renderer;

pub use lines::{LineCounts, LineRenderer};
pub use options::{DEFAULT_TIME_FORMAT, RenderOptions, is_valid_time_format, parse_key_list};
pub use renderer::Renderer;

// Re-export types used in our public API
pub use pylog_types::{PinoLevel, Transform};
