//! Validated concurrency limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building a [`Concurrency`] value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    #[error("concurrency must be at least 1, got 0")]
    Zero,

    #[error("invalid concurrency '{0}': expected a positive integer")]
    Invalid(String),
}

/// Maximum number of transforms allowed in flight at once.
///
/// Always at least one, so a mapper configured with it can never stall
/// without filling a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    /// One transform at a time
    pub const SEQUENTIAL: Self = Self(NonZeroUsize::MIN);

    pub fn new(slots: usize) -> Result<Self, ConcurrencyError> {
        NonZeroUsize::new(slots)
            .map(Self)
            .ok_or(ConcurrencyError::Zero)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::SEQUENTIAL
    }
}

impl TryFrom<usize> for Concurrency {
    type Error = ConcurrencyError;

    fn try_from(slots: usize) -> Result<Self, Self::Error> {
        Self::new(slots)
    }
}

impl From<Concurrency> for usize {
    fn from(concurrency: Concurrency) -> Self {
        concurrency.get()
    }
}

impl From<NonZeroUsize> for Concurrency {
    fn from(slots: NonZeroUsize) -> Self {
        Self(slots)
    }
}

impl FromStr for Concurrency {
    type Err = ConcurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slots: usize = s
            .trim()
            .parse()
            .map_err(|_| ConcurrencyError::Invalid(s.to_string()))?;
        Self::new(slots)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
