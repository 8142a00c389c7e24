//! Raw bulk snapshot decoding
//!
//! The snapshot is one JSON document keyed by edition code, each value an
//! edition record carrying its card list. That shape is dictated by the
//! upstream provider and treated as a fixed external contract.
//!
//! Card fields are deliberately lenient (`Option` / `default`): a malformed
//! individual record must not fail whole-document decoding. Required-field
//! validation happens in the normalizer, which can skip and continue.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

/// The decoded bulk snapshot: every edition, keyed by edition code.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct CardSnapshot {
    sets: BTreeMap<String, RawEdition>,
}

impl CardSnapshot {
    /// Decode a snapshot from a reader. A parse failure here is fatal for
    /// the ingestion pass.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Decode a snapshot from an in-memory JSON string.
    pub fn from_str(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Iterate over all edition records, in code order.
    pub fn editions(&self) -> impl Iterator<Item = &RawEdition> {
        self.sets.values()
    }

    /// Number of editions in the snapshot.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// One edition record as published upstream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdition {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub release_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub cards: Vec<RawCard>,
}

/// One card record as published upstream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCard {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub subtypes: Option<Vec<String>>,
    #[serde(default)]
    pub supertypes: Option<Vec<String>>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub image_name: Option<String>,
    /// Official card ID; all-lowercase upstream, null for promotional cards
    #[serde(rename = "multiverseid", default)]
    pub multiverseid: Option<i64>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub flavor: Option<String>,
    #[serde(default)]
    pub legalities: Vec<RawLegality>,
}

/// One legality entry on a card record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLegality {
    pub format: String,
    pub legality: String,
}
