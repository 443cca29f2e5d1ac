//! Level-name normalization for pylog-pretty
//!
//! This crate rewrites Python `"levelname":"INFO"` fields into pino
//! `"level":30` fields as bytes stream past, and hosts the async pump that
//! drives a chain of transforms from a reader to a writer.

mod normalizer;
mod pattern;
mod pipeline;
mod stream;

pub use normalizer::{
    DEFAULT_CARRY_LIMIT, LevelNormalizer, MatchPolicy, NormalizerOptions, Step, finish, step,
};
pub use pipeline::Pipeline;
pub use stream::{
    DEFAULT_CHUNK_SIZE, PumpError, PumpOptions, PumpStats, TransformStream, pump,
};

// Re-export types used in our public API
pub use pylog_types::{LevelMapping, Transform};
