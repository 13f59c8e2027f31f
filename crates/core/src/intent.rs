use serde::{Deserialize, Serialize};

/// Classified purpose of an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Meeting,
    Form,
    Escalate,
    Support,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Meeting => "meeting",
            Self::Form => "form",
            Self::Escalate => "escalate",
            Self::Support => "support",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps raw message text to an intent with fixed-priority keyword rules.
///
/// Rules are case-insensitive substring tests on the trimmed message, first
/// match wins. The substring semantics are deliberately blunt ("hi" matches
/// inside "this", "angry" fires even in "I am not angry") and are kept as-is
/// for compatibility with the deployed rule set.
pub fn classify(message: &str) -> Intent {
    let text = message.trim().to_lowercase();

    if text.contains("hello") || text.contains("hi") || text == "hey" {
        return Intent::Greeting;
    }
    if text.contains("schedule") || text.contains("book") || text.contains("meeting") {
        return Intent::Meeting;
    }
    if text.contains("form") || text.contains("apply") {
        return Intent::Form;
    }
    if text.contains("human") || text.contains("agent") || text.contains("angry") {
        return Intent::Escalate;
    }

    Intent::Support
}
