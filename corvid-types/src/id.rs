//! Typed identifier wrappers.
//!
//! A bare `String` id makes it easy to pass a task id where an agent
//! name was expected. These newtypes catch that at compile time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Declares a typed string-backed identifier.
macro_rules! typed_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string as an id.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the id as a plain string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

typed_id!(TaskId, "Identifier for a task tracked by the task manager.");

static TASK_COUNTER: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    /// Generate the next process-local task id (`task-1`, `task-2`, ...).
    ///
    /// Monotonic within a process; not globally unique across restarts.
    pub fn generate() -> Self {
        let n = TASK_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("task-{n}"))
    }
}
