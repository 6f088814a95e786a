//! Session Module - debounced text editing over a model
//!
//! - `debounce`: `EditSession`, the Idle → Pending → Reparsing →
//!   Applied/ErrorState machine driven by an explicit clock
//! - `driver`: `spawn_session`, a tokio task doing the same with real timers
//!
//! Only the last full text of a burst is reparsed; every edit restarts the
//! quiescence window.

mod debounce;
mod driver;

pub use debounce::{EditSession, SessionState};
pub use driver::{spawn_session, SessionHandle};
