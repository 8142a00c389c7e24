//! Normalized card catalog: entities, color codec and the snapshot normalizer

pub mod colors;
mod entities;
mod normalizer;

pub use entities::{
    Card, Edition, Format, Legality, LegalityStatus, Metacard, Rarity, VARIABLE_STAT,
};
pub use normalizer::{normalize, printing_version, NormalizedCatalog};
