//! Normalized catalog entities
//!
//! Plain data structs produced by the normalizer and consumed by the
//! persister. Identity rules:
//! - `Edition` is identified by its code.
//! - `Metacard` is identified by its name, shared across all printings.
//! - `Card` (one printing) is identified by (name, edition, number, version).
//! - `Legality` is unique per (card name, format name).

use crate::catalog::colors::Color;
use crate::error::{CollectorError, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Sentinel for a variable power/toughness ("*" in the source data).
///
/// Distinct from `None`, which means the card has no such stat at all.
/// Collapsing the two would make "Tarmogoyf" indistinguishable from a
/// Sorcery in range searches.
pub const VARIABLE_STAT: f64 = -1.0;

/// One release set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub code: String,
    pub name: String,
    /// Release type (core, expansion, promo, ...)
    pub release_type: String,
    pub release_date: NaiveDate,
    pub block: Option<String>,
}

/// The abstract, name-level card shared by all its printings.
#[derive(Debug, Clone, PartialEq)]
pub struct Metacard {
    pub name: String,
    pub types: BTreeSet<String>,
    pub subtypes: Option<BTreeSet<String>>,
    pub supertypes: Option<BTreeSet<String>>,
    pub mana_cost: Option<String>,
    /// None = not applicable, VARIABLE_STAT = "*"
    pub power: Option<f64>,
    pub toughness: Option<f64>,
    pub colors: Option<BTreeSet<Color>>,
    pub cmc: f64,
    pub text: Option<String>,
}

/// One concrete printing of a metacard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub name: String,
    pub edition: String,
    /// Catalog number within the edition; "0" for editions without numbers
    pub number: String,
    /// Disambiguating ordinal derived from the image reference; 0 unless
    /// the edition reused a catalog number for distinct artwork
    pub version: u32,
    pub multiverseid: Option<i64>,
    pub rarity: Rarity,
    pub artist: String,
    pub flavor: Option<String>,
}

impl Card {
    /// The composite identity tuple used for deduplication and upserts.
    pub fn identity(&self) -> (&str, &str, &str, u32) {
        (&self.name, &self.edition, &self.number, self.version)
    }
}

/// A constructed-play format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Format {
    pub name: String,
}

/// Legality of a metacard in a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legality {
    pub card_name: String,
    pub format: String,
    pub status: LegalityStatus,
}

/// Card rarity, matching the fixed vocabulary of the snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rarity {
    BasicLand,
    Common,
    Uncommon,
    Rare,
    MythicRare,
    Special,
}

impl Rarity {
    pub const ALL: [Rarity; 6] = [
        Rarity::BasicLand,
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::MythicRare,
        Rarity::Special,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::BasicLand => "Basic Land",
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::MythicRare => "Mythic Rare",
            Rarity::Special => "Special",
        }
    }

    pub fn from_str(value: &str) -> Result<Rarity> {
        match value {
            "Basic Land" => Ok(Rarity::BasicLand),
            "Common" => Ok(Rarity::Common),
            "Uncommon" => Ok(Rarity::Uncommon),
            "Rare" => Ok(Rarity::Rare),
            "Mythic Rare" => Ok(Rarity::MythicRare),
            "Special" => Ok(Rarity::Special),
            other => Err(CollectorError::RecordNormalization(format!(
                "unknown rarity: {}",
                other
            ))),
        }
    }
}

/// Legality status of a card in a format.
///
/// All three statuses are stored; the format search filter excludes Banned
/// at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegalityStatus {
    Legal,
    Restricted,
    Banned,
}

impl LegalityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LegalityStatus::Legal => "Legal",
            LegalityStatus::Restricted => "Restricted",
            LegalityStatus::Banned => "Banned",
        }
    }

    pub fn from_str(value: &str) -> Result<LegalityStatus> {
        match value {
            "Legal" => Ok(LegalityStatus::Legal),
            "Restricted" => Ok(LegalityStatus::Restricted),
            "Banned" => Ok(LegalityStatus::Banned),
            other => Err(CollectorError::RecordNormalization(format!(
                "unknown legality status: {}",
                other
            ))),
        }
    }
}
