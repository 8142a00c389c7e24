//! Snapshot normalization
//!
//! Walks the nested bulk snapshot (set → card) and produces the five flat
//! entity collections, deduplicated by entity identity. A malformed
//! individual record is logged and skipped; it never aborts the pass.

use crate::catalog::colors::Color;
use crate::catalog::entities::{
    Card, Edition, Format, Legality, LegalityStatus, Metacard, Rarity, VARIABLE_STAT,
};
use crate::error::{CollectorError, Result};
use crate::mtgjson::{CardSnapshot, RawCard, RawEdition};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The five entity collections derived from one snapshot.
#[derive(Debug, Default)]
pub struct NormalizedCatalog {
    pub editions: Vec<Edition>,
    pub metacards: Vec<Metacard>,
    pub cards: Vec<Card>,
    pub formats: Vec<Format>,
    pub legalities: Vec<Legality>,
    /// Number of malformed records dropped during the pass
    pub skipped: usize,
}

/// Normalize a full snapshot into flat entity collections.
///
/// Entities are deduplicated by identity: edition code, metacard name, the
/// card identity tuple and (card, format) for legalities. Output vectors are
/// sorted by identity so repeated runs over the same snapshot are
/// byte-identical.
pub fn normalize(snapshot: &CardSnapshot) -> NormalizedCatalog {
    let mut editions: HashMap<String, Edition> = HashMap::new();
    let mut metacards: HashMap<String, Metacard> = HashMap::new();
    let mut cards: HashMap<(String, String, String, u32), Card> = HashMap::new();
    let mut formats: HashSet<String> = HashSet::new();
    let mut legalities: HashMap<(String, String), Legality> = HashMap::new();
    let mut skipped = 0usize;

    for raw_edition in snapshot.editions() {
        let edition = match normalize_edition(raw_edition) {
            Ok(edition) => edition,
            Err(e) => {
                // The edition's cards cannot reference it, so they go too
                log::warn!("Skipping edition record: {}", e);
                skipped += 1 + raw_edition.cards.len();
                continue;
            }
        };

        for raw_card in &raw_edition.cards {
            let normalized = match normalize_card(&edition.code, raw_card) {
                Ok(normalized) => normalized,
                Err(e) => {
                    log::warn!("Skipping card record in {}: {}", edition.code, e);
                    skipped += 1;
                    continue;
                }
            };

            let NormalizedCard {
                metacard,
                card,
                legalities: card_legalities,
            } = normalized;

            for legality in card_legalities {
                formats.insert(legality.format.clone());
                legalities.insert(
                    (legality.card_name.clone(), legality.format.clone()),
                    legality,
                );
            }
            metacards.insert(metacard.name.clone(), metacard);
            let identity = (
                card.name.clone(),
                card.edition.clone(),
                card.number.clone(),
                card.version,
            );
            cards.insert(identity, card);
        }

        editions.insert(edition.code.clone(), edition);
    }

    let mut catalog = NormalizedCatalog {
        editions: editions.into_values().collect(),
        metacards: metacards.into_values().collect(),
        cards: cards.into_values().collect(),
        formats: formats
            .into_iter()
            .map(|name| Format { name })
            .collect(),
        legalities: legalities.into_values().collect(),
        skipped,
    };

    catalog.editions.sort_by(|a, b| a.code.cmp(&b.code));
    catalog.metacards.sort_by(|a, b| a.name.cmp(&b.name));
    catalog
        .cards
        .sort_by(|a, b| a.identity().cmp(&b.identity()));
    catalog.formats.sort_by(|a, b| a.name.cmp(&b.name));
    catalog
        .legalities
        .sort_by(|a, b| (&a.card_name, &a.format).cmp(&(&b.card_name, &b.format)));

    log::info!(
        "Normalized snapshot: {} editions, {} metacards, {} cards, {} formats, {} legalities ({} records skipped)",
        catalog.editions.len(),
        catalog.metacards.len(),
        catalog.cards.len(),
        catalog.formats.len(),
        catalog.legalities.len(),
        catalog.skipped
    );

    catalog
}

/// Derive the disambiguating printing ordinal from an image reference.
///
/// Scans backward from the last character while it is a decimal digit; the
/// accumulated trailing digits are the version. No trailing digits → 0.
/// Editions that reused one catalog number for several artworks get a
/// stable per-artwork ordinal this way.
pub fn printing_version(image_name: &str) -> u32 {
    let bytes = image_name.as_bytes();
    let mut start = bytes.len();
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == bytes.len() {
        0
    } else {
        image_name[start..].parse().unwrap_or(0)
    }
}

struct NormalizedCard {
    metacard: Metacard,
    card: Card,
    legalities: Vec<Legality>,
}

fn normalize_edition(raw: &RawEdition) -> Result<Edition> {
    let code = require(&raw.code, "edition code")?;
    let name = require(&raw.name, "edition name")?;
    let release_type = require(&raw.release_type, "edition type")?;
    let release_date = require(&raw.release_date, "edition release date")?;

    let release_date = NaiveDate::parse_from_str(&release_date, "%Y-%m-%d").map_err(|e| {
        CollectorError::RecordNormalization(format!(
            "edition {}: bad release date {:?}: {}",
            code, release_date, e
        ))
    })?;

    Ok(Edition {
        code,
        name,
        release_type,
        release_date,
        block: raw.block.clone(),
    })
}

fn normalize_card(edition_code: &str, raw: &RawCard) -> Result<NormalizedCard> {
    let name = require(&raw.name, "card name")?;

    let types = match &raw.types {
        Some(types) if !types.is_empty() => types.iter().cloned().collect::<BTreeSet<_>>(),
        // Some non-standard play objects ship without a type line; the name
        // marker is the only signal we get for them
        _ if name.contains("token") => BTreeSet::from(["Token".to_string()]),
        _ => {
            return Err(CollectorError::RecordNormalization(format!(
                "card {:?} has no types",
                name
            )))
        }
    };

    let colors = match &raw.colors {
        Some(colors) if !colors.is_empty() => {
            let mut set = BTreeSet::new();
            for color in colors {
                let color = Color::from_name(color).ok_or_else(|| {
                    CollectorError::RecordNormalization(format!(
                        "card {:?}: unknown color {:?}",
                        name, color
                    ))
                })?;
                set.insert(color);
            }
            Some(set)
        }
        _ => None,
    };

    let rarity = raw.rarity.as_deref().ok_or_else(|| {
        CollectorError::RecordNormalization(format!("card {:?} has no rarity", name))
    })?;
    let rarity = Rarity::from_str(rarity)?;

    let artist = require(&raw.artist, "card artist")
        .map_err(|_| CollectorError::RecordNormalization(format!("card {:?} has no artist", name)))?;

    let metacard = Metacard {
        name: name.clone(),
        types,
        subtypes: name_set(&raw.subtypes),
        supertypes: name_set(&raw.supertypes),
        mana_cost: raw.mana_cost.clone(),
        power: parse_stat(&raw.power),
        toughness: parse_stat(&raw.toughness),
        colors,
        cmc: raw.cmc,
        text: raw.original_text.clone(),
    };

    let card = Card {
        name: name.clone(),
        edition: edition_code.to_string(),
        number: raw.number.clone().unwrap_or_else(|| "0".to_string()),
        version: printing_version(raw.image_name.as_deref().unwrap_or("")),
        multiverseid: raw.multiverseid,
        rarity,
        artist,
        flavor: raw.flavor.clone(),
    };

    let mut legalities = Vec::new();
    for entry in &raw.legalities {
        // Block groupings are not constructed-play formats
        if entry.format.ends_with("Block") {
            continue;
        }
        legalities.push(Legality {
            card_name: name.clone(),
            format: entry.format.clone(),
            status: LegalityStatus::from_str(&entry.legality)?,
        });
    }

    Ok(NormalizedCard {
        metacard,
        card,
        legalities,
    })
}

/// A required string field; absence makes the record malformed.
fn require(value: &Option<String>, what: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| CollectorError::RecordNormalization(format!("missing {}", what)))
}

/// Absent or empty name lists collapse to None.
fn name_set(values: &Option<Vec<String>>) -> Option<BTreeSet<String>> {
    values
        .as_ref()
        .filter(|values| !values.is_empty())
        .map(|values| values.iter().cloned().collect())
}

/// Parse a power/toughness value.
///
/// Absent → None (not applicable). Present but non-numeric ("*", "1+*") →
/// the VARIABLE_STAT sentinel. The two must stay distinguishable.
fn parse_stat(value: &Option<String>) -> Option<f64> {
    value
        .as_ref()
        .map(|raw| raw.trim().parse().unwrap_or(VARIABLE_STAT))
}
