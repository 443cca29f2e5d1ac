use regex::bytes::Captures;

use pylog_types::{LevelMapping, Transform};

use crate::pattern::{LEVELNAME_FIELD, partial_field_start};

/// Default bound on bytes held back between chunks.
///
/// Comfortably above `"levelname" : "CRITICAL"` with generous whitespace.
pub const DEFAULT_CARRY_LIMIT: usize = 256;

/// How many `levelname` fields are rewritten per invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Rewrite every occurrence
    #[default]
    All,
    /// Rewrite only the first occurrence
    First,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizerOptions {
    pub policy: MatchPolicy,

    /// Maximum bytes of a split field held back for the next chunk (0 disables)
    pub carry_limit: usize,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::All,
            carry_limit: DEFAULT_CARRY_LIMIT,
        }
    }
}

/// Result of one normalization step
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Bytes to prepend to the next chunk
    pub carry: Vec<u8>,

    /// Bytes ready to forward downstream
    pub output: Vec<u8>,

    /// Number of fields rewritten in `output`
    pub rewritten: usize,
}

/// Pure state transition: `(carry, chunk) -> (carry', output)`.
///
/// The carry is at most `options.carry_limit` bytes and always a strict prefix
/// of a possible `"levelname":"TOKEN"` field.
pub fn step(
    mapping: &LevelMapping,
    options: &NormalizerOptions,
    carry: Vec<u8>,
    chunk: &[u8],
) -> Step {
    let mut buf = carry;
    buf.extend_from_slice(chunk);

    let last_match_end = LEVELNAME_FIELD
        .find_iter(&buf)
        .last()
        .map(|m| m.end())
        .unwrap_or(0);

    let split = partial_field_start(&buf, last_match_end, options.carry_limit)
        .unwrap_or(buf.len());
    let carry = buf.split_off(split);

    let (output, rewritten) = rewrite(mapping, options.policy, &buf);
    Step {
        carry,
        output,
        rewritten,
    }
}

/// Final transition at end of input; an incomplete field can never match
pub fn finish(carry: Vec<u8>) -> Vec<u8> {
    carry
}

fn rewrite(mapping: &LevelMapping, policy: MatchPolicy, text: &[u8]) -> (Vec<u8>, usize) {
    let limit = match policy {
        MatchPolicy::All => 0,
        MatchPolicy::First => 1,
    };

    let mut rewritten = 0;
    let output = LEVELNAME_FIELD.replacen(text, limit, |caps: &Captures<'_>| {
        match mapping.get(&caps[1]) {
            Some(level) => {
                rewritten += 1;
                format!("\"level\":{level}").into_bytes()
            }
            None => caps[0].to_vec(),
        }
    });

    (output.into_owned(), rewritten)
}

/// Streaming rewrite of `"levelname":"TOKEN"` into `"level":N`
#[derive(Debug)]
pub struct LevelNormalizer<'m> {
    mapping: &'m LevelMapping,
    options: NormalizerOptions,
    carry: Vec<u8>,
    rewritten: u64,
}

impl<'m> LevelNormalizer<'m> {
    pub fn new(mapping: &'m LevelMapping, options: NormalizerOptions) -> Self {
        Self {
            mapping,
            options,
            carry: Vec::with_capacity(options.carry_limit),
            rewritten: 0,
        }
    }

    /// Normalize one chunk, holding back a trailing partial field if present
    pub fn normalize(&mut self, chunk: &[u8]) -> Vec<u8> {
        let carry = std::mem::take(&mut self.carry);
        let step = step(self.mapping, &self.options, carry, chunk);

        if !step.carry.is_empty() {
            tracing::trace!(held = step.carry.len(), "holding partial levelname field");
        }
        self.carry = step.carry;
        self.rewritten += step.rewritten as u64;
        step.output
    }

    /// Flush whatever is still held back
    pub fn flush(&mut self) -> Vec<u8> {
        let residual = finish(std::mem::take(&mut self.carry));
        if !residual.is_empty() {
            tracing::debug!(bytes = residual.len(), "flushing incomplete levelname field");
        }
        residual
    }

    /// Bytes currently held back
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Total fields rewritten so far
    pub fn rewritten(&self) -> u64 {
        self.rewritten
    }
}

impl Transform for LevelNormalizer<'_> {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        self.normalize(chunk)
    }

    fn finish(&mut self) -> Vec<u8> {
        self.flush()
    }
}
