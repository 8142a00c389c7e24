//! MTGJSON bulk data client: snapshot decoding and version tracking

mod snapshot;
mod version;

pub use snapshot::{CardSnapshot, RawCard, RawEdition, RawLegality};
pub use version::{SnapshotStore, Version};
