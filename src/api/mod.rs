//! # API Module
//!
//! HTTP handlers of the local listener that stands in for the browser
//! callback page:
//!
//! - [`callback`] - receives `?code=...` (or `?error=...`) from the
//!   authorization server and hands it to the waiting flow through shared
//!   state
//! - [`health`] - liveness probe returning status and version

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
