//! Interactive command surface.
//!
//! Four fixed commands (`stats`, `bot`, `approve`, `reject`) arriving
//! from the platform's interaction gateway. Each invocation resolves to
//! exactly one final reply; slow handlers get a "processing"
//! acknowledgement first so the interaction window never expires silently.

mod dispatcher;
mod models;

pub use dispatcher::{CommandDispatcher, ReplySink};
pub use models::{CommandInvocation, CommandReply};
