//! Moxo platform client.
//!
//! This crate owns every call that crosses into the Moxo API:
//! - **Token issuance** (`auth`) - HMAC-SHA256 app signature exchanged for a
//!   bearer token at `/v1/apps/token`
//! - **Messages and escalation** (`client`) - chat message posting and the
//!   human-routing handoff, behind the `ConversationApi` trait so the router
//!   can be exercised without a network
//!
//! Tokens are issued per outbound call, matching the platform's short-lived
//! signature window. No retries: a failed call surfaces once and the caller
//! decides what the user sees.

pub mod auth;
pub mod client;

use thiserror::Error;

pub use auth::TokenIssuer;
pub use client::{ConversationApi, MoxoClient};

#[derive(Debug, Error)]
pub enum MoxoError {
    #[error("token signing failed: {0}")]
    TokenSigning(String),
    #[error("token issuance failed: {0}")]
    TokenIssuance(String),
    #[error("message send failed: {0}")]
    Send(String),
    #[error("human routing handoff failed: {0}")]
    Escalation(String),
}
