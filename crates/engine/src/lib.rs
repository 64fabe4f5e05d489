// draftsync-engine: the live collaborative editing engine (embedded in the
// dashboard client).

pub mod channel;
pub mod comments;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod insights;
pub mod presence;
pub mod propagation;
pub mod session;
pub mod suggestions;
