//! Pass identifier generation.
//!
//! Pass ids look like `VIS-4821`: a fixed prefix and four digits drawn from
//! [`PASS_ID_RANGE`]. The space is small, so collisions are expected; the
//! store rejects duplicates and the issuer asks for another id.

use std::ops::Range;
use std::sync::atomic::{AtomicU16, Ordering};

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Prefix shared by every pass id.
pub const PASS_ID_PREFIX: &str = "VIS-";

/// Numeric suffixes a pass id may carry.
pub const PASS_ID_RANGE: Range<u16> = 1000..9999;

static PASS_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^VIS-(\d{4})$").expect("pass id pattern is valid"));

/// Source of candidate pass ids.
pub trait PassIdGenerator: Send + Sync {
    /// Produce the next candidate. Uniqueness is not guaranteed.
    fn next_pass_id(&self) -> String;
}

/// Draws suffixes uniformly at random from [`PASS_ID_RANGE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPassIdGenerator;

impl PassIdGenerator for RandomPassIdGenerator {
    fn next_pass_id(&self) -> String {
        format_pass_id(rand::rng().random_range(PASS_ID_RANGE))
    }
}

/// Hands out consecutive suffixes, wrapping inside [`PASS_ID_RANGE`].
///
/// Deterministic; meant for tests and fixtures.
#[derive(Debug)]
pub struct SequentialPassIdGenerator {
    next: AtomicU16,
}

impl SequentialPassIdGenerator {
    /// Start at `first`, clamped into [`PASS_ID_RANGE`].
    #[must_use]
    pub fn starting_at(first: u16) -> Self {
        Self {
            next: AtomicU16::new(first.clamp(PASS_ID_RANGE.start, PASS_ID_RANGE.end - 1)),
        }
    }
}

impl Default for SequentialPassIdGenerator {
    fn default() -> Self {
        Self::starting_at(PASS_ID_RANGE.start)
    }
}

impl PassIdGenerator for SequentialPassIdGenerator {
    fn next_pass_id(&self) -> String {
        let current = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(if n + 1 >= PASS_ID_RANGE.end {
                    PASS_ID_RANGE.start
                } else {
                    n + 1
                })
            })
            .unwrap_or(PASS_ID_RANGE.start);
        format_pass_id(current)
    }
}

/// Render a numeric suffix as a pass id.
#[must_use]
pub fn format_pass_id(suffix: u16) -> String {
    format!("{PASS_ID_PREFIX}{suffix:04}")
}

/// Whether `candidate` is a well-formed pass id with an in-range suffix.
#[must_use]
pub fn is_valid_pass_id(candidate: &str) -> bool {
    PASS_ID_PATTERN
        .captures(candidate)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u16>().ok())
        .is_some_and(|n| PASS_ID_RANGE.contains(&n))
}
