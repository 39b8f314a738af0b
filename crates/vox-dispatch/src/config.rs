//! Sequencer configuration.

use serde::{Deserialize, Serialize};

/// Runtime configuration for a
/// [`DirectiveSequencer`](crate::DirectiveSequencer).
///
/// # `dispatch_empty_dialog_immediately`
///
/// Historically every response directive was expected to carry the
/// dialog id of the user turn that produced it; in practice the cloud
/// also sends dialog-free directives mid-turn. This flag chooses how
/// dialog-free directives travel:
///
/// | Value | Dialog-free directives go through |
/// |-------|-----------------------------------|
/// | `false` (default) | the processed path, serialized with the active dialog |
/// | `true` | the immediate path (`handle_immediately`), bypassing staging |
///
/// Directives that carry a dialog id always take the processed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Route dialog-free directives via the immediate path.
    pub dispatch_empty_dialog_immediately: bool,
}

impl SequencerConfig {
    /// The default configuration: everything through the processed path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables immediate dispatch for dialog-free directives.
    #[must_use]
    pub fn with_immediate_dialog_free_dispatch(mut self) -> Self {
        self.dispatch_empty_dialog_immediately = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_processed_path() {
        assert!(!SequencerConfig::new().dispatch_empty_dialog_immediately);
    }

    #[test]
    fn builder_enables_immediate_path() {
        let config = SequencerConfig::new().with_immediate_dialog_free_dispatch();
        assert!(config.dispatch_empty_dialog_immediately);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SequencerConfig = serde_json::from_str("{}").expect("empty config");
        assert_eq!(config, SequencerConfig::default());

        let config: SequencerConfig =
            serde_json::from_str(r#"{"dispatch_empty_dialog_immediately":true}"#)
                .expect("explicit config");
        assert!(config.dispatch_empty_dialog_immediately);
    }
}
