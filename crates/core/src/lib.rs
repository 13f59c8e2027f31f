//! Core domain for the moxbot conversational responder.
//!
//! No networking lives here; the decision logic is pure and the only I/O is
//! config-file loading:
//! - `intent` - deterministic keyword classification of inbound messages
//! - `cooldown` - the time-gated reply policy over conversation memory
//! - `domain::memory` - the per-conversation memory record and its merge rules
//! - `replies` - scripted reply text for the non-knowledge-base actions
//! - `config` - application configuration with file/env layering
//! - `errors` - the failure taxonomy surfaced to the acknowledgment layer

pub mod config;
pub mod cooldown;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod replies;

pub use cooldown::{decide, Decision, ReplyAction};
pub use domain::memory::{ConversationMemory, MemoryPatch};
pub use errors::{ProcessError, SkipReason};
pub use intent::{classify, Intent};
pub use replies::ReplyCatalog;
