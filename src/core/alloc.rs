//! Fresh trace-ID allocation inside a bounded range.
//!
//! Callers hold the catalog store lock across the allocation and the insert
//! of the returned ID, so a free ID can never be handed out twice.

use std::collections::HashMap;

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::catalog::{TraceFormat, TraceId};

/// How the next unused ID is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Smallest unused integer >= min.
    Upward,
    /// Largest unused integer <= max.
    Downward,
    /// Uniform sample in [min, max], resampled on collision.
    Random,
}

/// Resample budget for the random strategy. A nearly full range should be
/// switched to upward/downward instead; random does not fall back.
const RANDOM_RETRY_LIMIT: usize = 10_000;

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("no free trace ID in [{min}, {max}] ({strategy:?} search exhausted)")]
    RangeExhausted {
        min: TraceId,
        max: TraceId,
        strategy: Strategy,
    },
}

/// Returns an ID in `[min, max]` that is not a key of `used`.
pub fn allocate(
    used: &HashMap<TraceId, TraceFormat>,
    min: TraceId,
    max: TraceId,
    strategy: Strategy,
) -> Result<TraceId, AllocError> {
    let exhausted = || AllocError::RangeExhausted { min, max, strategy };

    match strategy {
        Strategy::Upward => (min..=max)
            .find(|id| !used.contains_key(id))
            .ok_or_else(exhausted),
        Strategy::Downward => (min..=max)
            .rev()
            .find(|id| !used.contains_key(id))
            .ok_or_else(exhausted),
        Strategy::Random => {
            let mut rng = rand::rng();
            for _ in 0..RANDOM_RETRY_LIMIT {
                let id = rng.random_range(min..=max);
                if !used.contains_key(&id) {
                    return Ok(id);
                }
            }
            Err(exhausted())
        }
    }
}
