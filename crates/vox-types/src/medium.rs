//! Shared output mediums.
//!
//! A *medium* is an abstract device resource — the audio pipeline or the
//! display surface — that directives compete over. Blocking policies
//! declare which mediums an operation occupies so the pipeline can
//! serialize conflicting work (two things cannot own the speaker at
//! once) while letting independent work proceed in parallel.
//!
//! # Closed Set
//!
//! The set of mediums is closed by design: adding a medium changes the
//! exclusion semantics of every policy in the system and is a breaking
//! change, not an extension point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An abstract shared device resource.
///
/// | Medium | Backing resource |
/// |--------|------------------|
/// | `Audio` | Speaker / audio output pipeline |
/// | `Visual` | Display surface |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Medium {
    /// The audio output pipeline.
    Audio,
    /// The display surface.
    Visual,
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "AUDIO"),
            Self::Visual => write!(f, "VISUAL"),
        }
    }
}

/// A set of [`Medium`]s.
///
/// Small and copyable; the closed medium set keeps this a pair of
/// flags rather than a heap collection.
///
/// # Example
///
/// ```
/// use vox_types::{Medium, MediumSet};
///
/// let av = MediumSet::audio_visual();
/// assert!(av.contains(Medium::Audio));
/// assert!(av.contains(Medium::Visual));
///
/// let audio = MediumSet::audio();
/// assert!(audio.intersects(&av));
/// assert!(!audio.intersects(&MediumSet::visual()));
/// assert!(!MediumSet::none().intersects(&av));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MediumSet {
    audio: bool,
    visual: bool,
}

impl MediumSet {
    /// The empty set. Directives with no medium footprint use this.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Just [`Medium::Audio`].
    #[must_use]
    pub fn audio() -> Self {
        Self {
            audio: true,
            visual: false,
        }
    }

    /// Just [`Medium::Visual`].
    #[must_use]
    pub fn visual() -> Self {
        Self {
            audio: false,
            visual: true,
        }
    }

    /// Both mediums.
    #[must_use]
    pub fn audio_visual() -> Self {
        Self {
            audio: true,
            visual: true,
        }
    }

    /// Returns `true` if the set contains `medium`.
    #[must_use]
    pub fn contains(&self, medium: Medium) -> bool {
        match medium {
            Medium::Audio => self.audio,
            Medium::Visual => self.visual,
        }
    }

    /// Returns `true` if the two sets share any medium.
    #[must_use]
    pub fn intersects(&self, other: &MediumSet) -> bool {
        (self.audio && other.audio) || (self.visual && other.visual)
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.audio && !self.visual
    }

    /// Adds a medium to the set.
    pub fn insert(&mut self, medium: Medium) {
        match medium {
            Medium::Audio => self.audio = true,
            Medium::Visual => self.visual = true,
        }
    }

    /// Iterates the contained mediums in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Medium> {
        let audio = self.audio.then_some(Medium::Audio);
        let visual = self.visual.then_some(Medium::Visual);
        audio.into_iter().chain(visual)
    }
}

impl fmt::Display for MediumSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for medium in self.iter() {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{medium}")?;
            first = false;
        }
        if first {
            write!(f, "NONE")?;
        }
        Ok(())
    }
}

impl FromIterator<Medium> for MediumSet {
    fn from_iter<I: IntoIterator<Item = Medium>>(iter: I) -> Self {
        let mut set = Self::none();
        for medium in iter {
            set.insert(medium);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_display() {
        assert_eq!(Medium::Audio.to_string(), "AUDIO");
        assert_eq!(Medium::Visual.to_string(), "VISUAL");
    }

    #[test]
    fn medium_set_constructors() {
        assert!(MediumSet::none().is_empty());
        assert!(MediumSet::audio().contains(Medium::Audio));
        assert!(!MediumSet::audio().contains(Medium::Visual));
        assert!(MediumSet::visual().contains(Medium::Visual));
        assert!(MediumSet::audio_visual().contains(Medium::Audio));
        assert!(MediumSet::audio_visual().contains(Medium::Visual));
    }

    #[test]
    fn medium_set_intersects() {
        assert!(MediumSet::audio().intersects(&MediumSet::audio()));
        assert!(MediumSet::audio().intersects(&MediumSet::audio_visual()));
        assert!(!MediumSet::audio().intersects(&MediumSet::visual()));
        assert!(!MediumSet::none().intersects(&MediumSet::audio_visual()));
        assert!(!MediumSet::audio_visual().intersects(&MediumSet::none()));
    }

    #[test]
    fn medium_set_insert() {
        let mut set = MediumSet::none();
        set.insert(Medium::Visual);
        assert!(set.contains(Medium::Visual));
        assert!(!set.contains(Medium::Audio));
        set.insert(Medium::Audio);
        assert_eq!(set, MediumSet::audio_visual());
    }

    #[test]
    fn medium_set_iter_order() {
        let mediums: Vec<Medium> = MediumSet::audio_visual().iter().collect();
        assert_eq!(mediums, vec![Medium::Audio, Medium::Visual]);
        assert_eq!(MediumSet::none().iter().count(), 0);
    }

    #[test]
    fn medium_set_from_iterator() {
        let set: MediumSet = [Medium::Visual, Medium::Audio].into_iter().collect();
        assert_eq!(set, MediumSet::audio_visual());
    }

    #[test]
    fn medium_set_display() {
        assert_eq!(MediumSet::none().to_string(), "NONE");
        assert_eq!(MediumSet::audio().to_string(), "AUDIO");
        assert_eq!(MediumSet::audio_visual().to_string(), "AUDIO+VISUAL");
    }
}
