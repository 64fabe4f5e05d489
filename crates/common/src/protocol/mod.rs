// Wire protocol for the draftsync-collab.v1 channel.

pub mod envelope;

pub use envelope::{CollabMessage, CollabPayload, Envelope, StartCollaboration, SuggestionBatch};
