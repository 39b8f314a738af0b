//! Routing key for directive dispatch.
//!
//! Every directive delivered by the cloud carries a `namespace` and a
//! `name`; together they identify the operation and select the handler
//! that claims it. [`RoutingKey`] is that pair, used both inside
//! directive headers and as the key of the routing table.
//!
//! # No Identity Beyond the Pair
//!
//! Unlike message ids, routing keys are **not** unique per directive:
//! every `Speak` directive from the speech-synthesizer namespace shares
//! the key `SpeechSynthesizer::Speak`. Equality and hashing compare the
//! two strings and nothing else.
//!
//! # Example
//!
//! ```
//! use vox_types::RoutingKey;
//!
//! let key = RoutingKey::new("SpeechSynthesizer", "Speak");
//! assert_eq!(key.fqn(), "SpeechSynthesizer::Speak");
//! assert!(key.matches("SpeechSynthesizer", "Speak"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a directive operation: `(namespace, name)`.
///
/// Routing keys are the unit of handler registration. A handler claims
/// one or more keys via its configurations, and the router maps each
/// key to at most one handler at a time.
///
/// # Validity
///
/// A key with an empty namespace or name never appears in a well-formed
/// directive (the directive builder rejects it). The type itself does
/// not enforce non-emptiness so that lookups can be built from
/// arbitrary wire input.
///
/// # Example
///
/// ```
/// use vox_types::RoutingKey;
/// use std::collections::HashMap;
///
/// let mut table: HashMap<RoutingKey, &str> = HashMap::new();
/// table.insert(RoutingKey::new("Speaker", "SetVolume"), "speaker-handler");
///
/// let lookup = RoutingKey::new("Speaker", "SetVolume");
/// assert_eq!(table.get(&lookup), Some(&"speaker-handler"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey {
    /// Capability namespace (e.g. `"SpeechSynthesizer"`).
    pub namespace: String,
    /// Operation name within the namespace (e.g. `"Speak"`).
    pub name: String,
}

impl RoutingKey {
    /// Creates a routing key from a namespace and name.
    ///
    /// # Example
    ///
    /// ```
    /// use vox_types::RoutingKey;
    ///
    /// let key = RoutingKey::new("Alerts", "SetAlert");
    /// assert_eq!(key.namespace, "Alerts");
    /// assert_eq!(key.name, "SetAlert");
    /// ```
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the fully qualified name in `namespace::name` format.
    ///
    /// Used for logging and conflict diagnostics.
    #[must_use]
    pub fn fqn(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// Returns `true` if both namespace and name match.
    #[must_use]
    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    /// Returns `true` if either component is empty.
    ///
    /// Well-formed directives never produce such a key; lookups built
    /// from raw wire input may.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.namespace.is_empty() || self.name.is_empty()
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.name)
    }
}
