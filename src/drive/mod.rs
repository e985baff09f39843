//! Google Drive adapter.
//!
//! Authentication lives in an explicit [`DriveSession`]; remote calls go
//! through [`DriveClient`] and take the session's credential per call.

mod client;
mod session;
mod token;
mod types;

#[cfg(test)]
pub mod fake;

pub use client::DriveClient;
pub use session::{DriveSession, SessionState, SessionStatus};
pub use token::{SignInGrant, TokenExchange};
pub use types::{AccessToken, ShareLinks};
