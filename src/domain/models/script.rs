use serde::{Deserialize, Serialize};

/// One step of a scripted UI traversal.
///
/// Traversal sequences are configuration, not code: the surfaces this daemon
/// drives change their layouts without notice, and the same workflow core has
/// to survive a selector or key-order change with a config edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Click the element matching a CSS selector.
    Click { selector: String },

    /// Evaluate a JavaScript expression in the page.
    Eval { script: String },

    /// Press a named key one or more times.
    Key {
        key: String,
        #[serde(default = "default_repeat")]
        repeat: u32,
    },

    /// Wait for a fixed duration, in milliseconds.
    Pause { ms: u64 },
}

const fn default_repeat() -> u32 {
    1
}
