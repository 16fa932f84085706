//! How many successful deliveries a note tolerates.
//!
//! Persisted as an incrementing view counter plus `max_views` and a
//! `burn_after_reading` flag. The counter only ever grows, so exhaustion is
//! monotonic: once a note is exhausted it stays exhausted.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "views", rename_all = "snake_case")]
pub enum ViewPolicy {
    #[default]
    Unlimited,
    Limited(NonZeroU32),
    /// Gone after the first counted view.
    BurnAfterReading,
}

impl ViewPolicy {
    /// Build from the wire/storage fields. `burn_after_reading` wins over
    /// `max_views`; a zero view limit is invalid.
    pub fn from_parts(max_views: Option<u32>, burn_after_reading: bool) -> Result<Self> {
        if burn_after_reading {
            return Ok(ViewPolicy::BurnAfterReading);
        }
        match max_views {
            None => Ok(ViewPolicy::Unlimited),
            Some(n) => NonZeroU32::new(n)
                .map(ViewPolicy::Limited)
                .ok_or_else(|| Error::Validation("view limit must be at least 1".into())),
        }
    }

    pub fn max_views(&self) -> Option<u32> {
        match self {
            ViewPolicy::Limited(n) => Some(n.get()),
            _ => None,
        }
    }

    pub fn burn_after_reading(&self) -> bool {
        matches!(self, ViewPolicy::BurnAfterReading)
    }

    /// Effective number of views allowed, `None` when unlimited.
    pub fn limit(&self) -> Option<u32> {
        match self {
            ViewPolicy::Unlimited => None,
            ViewPolicy::Limited(n) => Some(n.get()),
            ViewPolicy::BurnAfterReading => Some(1),
        }
    }

    pub fn is_exhausted(&self, view_count: u32) -> bool {
        matches!(self.limit(), Some(limit) if view_count >= limit)
    }

    pub fn remaining(&self, view_count: u32) -> Option<u32> {
        self.limit().map(|limit| limit.saturating_sub(view_count))
    }
}
