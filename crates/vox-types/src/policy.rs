//! Blocking policies for directive handling.
//!
//! A handler declares, per routing key, which [`Medium`]s the operation
//! occupies and whether it *blocks* those mediums. The admission rules
//! are enforced by the dispatch layer's gate:
//!
//! - Two directives may run concurrently if their mediums are disjoint.
//! - Two **non-blocking** directives may share a medium.
//! - A **blocking** directive excludes every other directive on its
//!   mediums, and is itself excluded by anything already holding them.
//!
//! | In-flight \ Candidate | non-blocking, same medium | blocking, same medium |
//! |-----------------------|---------------------------|-----------------------|
//! | non-blocking          | run together              | wait                  |
//! | blocking              | wait                      | wait                  |
//!
//! # Example
//!
//! Speech playback owns the speaker exclusively while a volume change
//! touches it without excluding anyone:
//!
//! ```
//! use vox_types::{BlockingPolicy, Medium};
//!
//! let speak = BlockingPolicy::audio_blocking();
//! assert!(speak.is_blocking());
//! assert!(speak.mediums().contains(Medium::Audio));
//!
//! let set_volume = BlockingPolicy::audio_nonblocking();
//! assert!(!set_volume.is_blocking());
//! ```

use crate::{Medium, MediumSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares how a directive consumes shared mediums.
///
/// The default policy (`none`) occupies nothing and blocks nothing;
/// it is used for directives with no device footprint and as the
/// fallback when no handler is registered for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockingPolicy {
    mediums: MediumSet,
    is_blocking: bool,
}

impl BlockingPolicy {
    /// Creates a policy from an arbitrary medium set and blocking flag.
    #[must_use]
    pub fn new(mediums: MediumSet, is_blocking: bool) -> Self {
        Self {
            mediums,
            is_blocking,
        }
    }

    /// No mediums, non-blocking. The default.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Occupies audio exclusively (e.g. speech playback).
    #[must_use]
    pub fn audio_blocking() -> Self {
        Self::new(MediumSet::audio(), true)
    }

    /// Touches audio without excluding others (e.g. volume change).
    #[must_use]
    pub fn audio_nonblocking() -> Self {
        Self::new(MediumSet::audio(), false)
    }

    /// Occupies the display exclusively.
    #[must_use]
    pub fn visual_blocking() -> Self {
        Self::new(MediumSet::visual(), true)
    }

    /// Touches the display without excluding others (e.g. a card render).
    #[must_use]
    pub fn visual_nonblocking() -> Self {
        Self::new(MediumSet::visual(), false)
    }

    /// Occupies both mediums exclusively.
    #[must_use]
    pub fn audio_visual_blocking() -> Self {
        Self::new(MediumSet::audio_visual(), true)
    }

    /// The mediums this policy occupies.
    #[must_use]
    pub fn mediums(&self) -> &MediumSet {
        &self.mediums
    }

    /// Whether the policy excludes others on its mediums.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    /// Returns `true` for the empty non-blocking policy.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.mediums.is_empty() && !self.is_blocking
    }

    /// Returns `true` if this policy and `other` exclude each other.
    ///
    /// Mutual exclusion requires a shared medium and at least one of
    /// the two policies marked blocking.
    #[must_use]
    pub fn conflicts_with(&self, other: &BlockingPolicy) -> bool {
        self.mediums.intersects(&other.mediums) && (self.is_blocking || other.is_blocking)
    }
}

impl fmt::Display for BlockingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.mediums,
            if self.is_blocking {
                "BLOCKING"
            } else {
                "NON_BLOCKING"
            }
        )
    }
}
