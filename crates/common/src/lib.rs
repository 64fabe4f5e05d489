// draftsync-common: shared types and wire protocol for the DraftSync workspace

pub mod protocol;
pub mod types;
