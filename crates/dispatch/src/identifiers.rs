//! Newtype identifiers.
//!
//! Provider names, model identifiers, and endpoint URLs are all strings on the
//! wire; wrapping each in its own type stops a model identifier from being
//! passed where a display name is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is blank.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration)
// ---------------------------------------------------------------------------

string_id! {
    /// Human-readable name of a provider candidate (e.g. `"DeepSeek (Primary)"`).
    ///
    /// Used in log events and in the final [`crate::DispatchResult`].
    CandidateName
}

string_id! {
    /// Model identifier sent in the `model` field of the request body
    /// (e.g. `"deepseek-chat"`, `"meta-llama/llama-3.2-3b-instruct:free"`).
    ModelId
}

string_id! {
    /// Full URL of a chat-completions endpoint.
    Endpoint
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single dispatch call.
///
/// Generated fresh for every call to [`crate::Dispatcher::dispatch`] and
/// attached to every event it emits, so the attempts of one dispatch can be
/// correlated when several run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchId(Uuid);

impl DispatchId {
    /// Generates a new random dispatch identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_reject_blank_values() {
        assert!(CandidateName::new("").is_none());
        assert!(ModelId::new("   ").is_none());
        assert!(Endpoint::new("\t\n").is_none());
    }

    #[test]
    fn string_ids_keep_value_verbatim() {
        let model = ModelId::new("qwen/qwen-2-7b-instruct:free").unwrap();
        assert_eq!(model.as_str(), "qwen/qwen-2-7b-instruct:free");
        assert_eq!(model.to_string(), "qwen/qwen-2-7b-instruct:free");
    }

    #[test]
    fn dispatch_ids_are_unique() {
        assert_ne!(DispatchId::new_random(), DispatchId::new_random());
    }
}
