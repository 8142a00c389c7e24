//! Database operations for the card catalog
//!
//! Uses parameterized queries exclusively for security (no SQL string
//! concatenation). Bulk writes run inside one transaction per entity type,
//! flushed in fixed-size chunks; entity types are written in referential
//! order (editions and formats before cards and legalities).

use crate::catalog::{colors, Card, Edition, Format, Legality, Metacard, NormalizedCatalog};
use crate::catalog::colors::Color;
use crate::search::{self, Maximums, SearchFilter};
use rusqlite::{params, CachedStatement, Connection};
use std::collections::BTreeSet;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Rows per flush during bulk upserts. Exists to respect driver payload
/// limits, not for concurrency.
const CHUNK_SIZE: usize = 2500;

/// Initialize the database schema
///
/// Creates the five catalog tables plus the per-viewer `collection` table.
/// `collection` is owned by the collection-management layer; it is created
/// here so one schema call yields a complete, joinable database file.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS edition (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            release_date TEXT NOT NULL,
            block TEXT
        );

        CREATE TABLE IF NOT EXISTS metacard (
            name TEXT PRIMARY KEY,
            types TEXT NOT NULL,
            subtypes TEXT,
            supertypes TEXT,
            mana_cost TEXT,
            power REAL,
            toughness REAL,
            colors INTEGER,
            cmc REAL NOT NULL,
            orig_text TEXT
        );

        CREATE TABLE IF NOT EXISTS card (
            card_id INTEGER PRIMARY KEY AUTOINCREMENT,
            multiverseid INTEGER,
            name TEXT NOT NULL REFERENCES metacard(name),
            edition TEXT NOT NULL REFERENCES edition(code),
            rarity TEXT NOT NULL,
            number TEXT NOT NULL,
            version INTEGER NOT NULL,
            artist TEXT NOT NULL,
            flavor TEXT,
            UNIQUE (name, edition, number, version)
        );

        CREATE INDEX IF NOT EXISTS idx_card_name ON card(name);
        CREATE INDEX IF NOT EXISTS idx_card_edition ON card(edition);

        CREATE TABLE IF NOT EXISTS format (
            name TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS card_legal_in_format (
            card_name TEXT NOT NULL REFERENCES metacard(name),
            format TEXT NOT NULL REFERENCES format(name),
            status TEXT NOT NULL,
            UNIQUE (card_name, format)
        );

        CREATE INDEX IF NOT EXISTS idx_legal_format ON card_legal_in_format(format);

        CREATE TABLE IF NOT EXISTS collection (
            user_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL REFERENCES card(card_id),
            normal INTEGER NOT NULL DEFAULT 0,
            foil INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, card_id)
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Result of one persistence pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub editions: usize,
    pub formats: usize,
    pub metacards: usize,
    pub cards: usize,
    pub legalities: usize,
}

/// Merge one normalized catalog into the store.
///
/// Upserts preserve identity columns (card ids survive re-ingestion, so
/// collection rows stay attached) and refresh mutable ones. Each entity
/// type commits atomically; a failure rolls back the type being written and
/// leaves previously committed types intact.
pub fn persist_catalog(
    conn: &mut Connection,
    catalog: &NormalizedCatalog,
) -> DbResult<PersistStats> {
    let editions = bulk_upsert(conn, &catalog.editions, UPSERT_EDITION, bind_edition)?;
    let formats = bulk_upsert(conn, &catalog.formats, UPSERT_FORMAT, bind_format)?;
    let metacards = bulk_upsert(conn, &catalog.metacards, UPSERT_METACARD, bind_metacard)?;
    let cards = bulk_upsert(conn, &catalog.cards, UPSERT_CARD, bind_card)?;
    let legalities = bulk_upsert(conn, &catalog.legalities, UPSERT_LEGALITY, bind_legality)?;

    let stats = PersistStats {
        editions,
        formats,
        metacards,
        cards,
        legalities,
    };
    log::info!(
        "Persisted catalog: {} editions, {} formats, {} metacards, {} cards, {} legalities",
        stats.editions,
        stats.formats,
        stats.metacards,
        stats.cards,
        stats.legalities
    );
    Ok(stats)
}

/// Upsert a batch of rows of one entity type inside a single transaction,
/// flushing in chunks. The per-entity mapping lives in the `bind` function.
fn bulk_upsert<T, F>(conn: &mut Connection, rows: &[T], sql: &str, bind: F) -> DbResult<usize>
where
    F: Fn(&mut CachedStatement<'_>, &T) -> DbResult<()>,
{
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(sql)?;
        for chunk in rows.chunks(CHUNK_SIZE) {
            for row in chunk {
                bind(&mut stmt, row)?;
            }
            log::debug!("Flushed chunk of {} rows", chunk.len());
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

const UPSERT_EDITION: &str = "INSERT INTO edition (code, name, type, release_date, block)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(code) DO UPDATE SET
         name = excluded.name,
         type = excluded.type,
         release_date = excluded.release_date,
         block = excluded.block";

fn bind_edition(stmt: &mut CachedStatement<'_>, edition: &Edition) -> DbResult<()> {
    stmt.execute(params![
        &edition.code,
        &edition.name,
        &edition.release_type,
        edition.release_date.format("%Y-%m-%d").to_string(),
        &edition.block,
    ])?;
    Ok(())
}

const UPSERT_FORMAT: &str =
    "INSERT INTO format (name) VALUES (?1) ON CONFLICT(name) DO NOTHING";

fn bind_format(stmt: &mut CachedStatement<'_>, format: &Format) -> DbResult<()> {
    stmt.execute(params![&format.name])?;
    Ok(())
}

const UPSERT_METACARD: &str = "INSERT INTO metacard
     (name, types, subtypes, supertypes, mana_cost, power, toughness, colors, cmc, orig_text)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT(name) DO UPDATE SET
         types = excluded.types,
         subtypes = excluded.subtypes,
         supertypes = excluded.supertypes,
         mana_cost = excluded.mana_cost,
         power = excluded.power,
         toughness = excluded.toughness,
         colors = excluded.colors,
         cmc = excluded.cmc,
         orig_text = excluded.orig_text";

fn bind_metacard(stmt: &mut CachedStatement<'_>, metacard: &Metacard) -> DbResult<()> {
    stmt.execute(params![
        &metacard.name,
        join_names(&metacard.types),
        metacard.subtypes.as_ref().map(join_names),
        metacard.supertypes.as_ref().map(join_names),
        &metacard.mana_cost,
        metacard.power,
        metacard.toughness,
        color_mask(&metacard.colors),
        metacard.cmc,
        &metacard.text,
    ])?;
    Ok(())
}

const UPSERT_CARD: &str = "INSERT INTO card
     (multiverseid, name, edition, rarity, number, version, artist, flavor)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(name, edition, number, version) DO UPDATE SET
         multiverseid = excluded.multiverseid,
         rarity = excluded.rarity,
         artist = excluded.artist,
         flavor = excluded.flavor";

fn bind_card(stmt: &mut CachedStatement<'_>, card: &Card) -> DbResult<()> {
    stmt.execute(params![
        card.multiverseid,
        &card.name,
        &card.edition,
        card.rarity.as_str(),
        &card.number,
        card.version,
        &card.artist,
        &card.flavor,
    ])?;
    Ok(())
}

const UPSERT_LEGALITY: &str = "INSERT INTO card_legal_in_format (card_name, format, status)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(card_name, format) DO UPDATE SET status = excluded.status";

fn bind_legality(stmt: &mut CachedStatement<'_>, legality: &Legality) -> DbResult<()> {
    stmt.execute(params![
        &legality.card_name,
        &legality.format,
        legality.status.as_str(),
    ])?;
    Ok(())
}

/// Render a name set as the stored comma-joined text column.
fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(",")
}

/// Render a color set as the stored bitmask; colorless stores NULL.
fn color_mask(set: &Option<BTreeSet<Color>>) -> Option<i64> {
    set.as_ref().map(|colors| colors::encode(colors.iter().copied()))
}

// ── Search-side reads ──────────────────────────────────────────────────────

/// Attributes the range filters can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAttribute {
    Power,
    Toughness,
    ConvertedManaCost,
}

impl RangeAttribute {
    fn column(self) -> &'static str {
        match self {
            RangeAttribute::Power => "power",
            RangeAttribute::Toughness => "toughness",
            RangeAttribute::ConvertedManaCost => "cmc",
        }
    }
}

/// The maximum stored value for a range attribute, `None` when the catalog
/// is empty for it.
pub fn maximum(conn: &Connection, attribute: RangeAttribute) -> DbResult<Option<f64>> {
    let sql = format!("SELECT MAX({}) FROM metacard", attribute.column());
    conn.query_row(&sql, [], |row| row.get(0))
}

/// All three range maxima, fetched once per search.
pub fn catalog_maximums(conn: &Connection) -> DbResult<Maximums> {
    Ok(Maximums {
        power: maximum(conn, RangeAttribute::Power)?,
        toughness: maximum(conn, RangeAttribute::Toughness)?,
        cmc: maximum(conn, RangeAttribute::ConvertedManaCost)?,
    })
}

/// Catalog row counts, by entity type.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub editions: i64,
    pub metacards: i64,
    pub cards: i64,
    pub formats: i64,
    pub legalities: i64,
}

/// Current row counts of the five catalog tables.
pub fn entity_counts(conn: &Connection) -> DbResult<EntityCounts> {
    let count = |table: &str| -> DbResult<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
    };
    Ok(EntityCounts {
        editions: count("edition")?,
        metacards: count("metacard")?,
        cards: count("card")?,
        formats: count("format")?,
        legalities: count("card_legal_in_format")?,
    })
}

/// One search result: a metacard with its matching printings and, when a
/// viewer was supplied, the summed owned copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub name: String,
    pub printings: Vec<i64>,
    pub normal: Option<i64>,
    pub foil: Option<i64>,
}

/// Compile the filter against the current catalog maxima and execute it.
pub fn search(
    conn: &Connection,
    filter: &SearchFilter,
    viewer: Option<i64>,
) -> crate::error::Result<Vec<SearchRow>> {
    let maxima = catalog_maximums(conn)?;
    let compiled = search::compile(filter, viewer, &maxima)?;
    run_compiled(conn, &compiled, viewer.is_some())
}

/// Execute an already-compiled query fragment.
pub fn run_compiled(
    conn: &Connection,
    compiled: &search::CompiledQuery,
    with_viewer: bool,
) -> crate::error::Result<Vec<SearchRow>> {
    let sql = compiled.to_sql(with_viewer);
    log::debug!("Search query:\n{}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let args = compiled.bind_args();
    let mapped = stmt.query_map(args.as_slice(), |row| {
        let name: String = row.get(0)?;
        let printings: String = row.get(1)?;
        let (normal, foil) = if with_viewer {
            (Some(row.get(2)?), Some(row.get(3)?))
        } else {
            (None, None)
        };
        Ok((name, printings, normal, foil))
    })?;

    let mut results = Vec::new();
    for row in mapped {
        let (name, printings, normal, foil) = row?;
        results.push(SearchRow {
            name,
            printings: parse_id_list(&printings),
            normal,
            foil,
        });
    }
    Ok(results)
}

/// Parse the GROUP_CONCAT id list ("3,17,42") back into ids.
fn parse_id_list(joined: &str) -> Vec<i64> {
    joined
        .split(',')
        .filter_map(|id| id.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{normalize, Rarity};
    use crate::mtgjson::CardSnapshot;
    use crate::search::{ColorFilter, Maximums, RangeFilter, SearchFilter};
    use std::collections::BTreeSet;

    /// Create an in-memory database for testing
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    /// A snapshot exercising every search dimension.
    fn sample_snapshot() -> CardSnapshot {
        CardSnapshot::from_str(
            r#"{
            "LEA": {
                "code": "LEA",
                "name": "Limited Edition Alpha",
                "type": "core",
                "releaseDate": "1993-08-05",
                "cards": [
                    {
                        "name": "Lightning Bolt",
                        "types": ["Instant"],
                        "manaCost": "{R}",
                        "cmc": 1,
                        "colors": ["Red"],
                        "originalText": "Lightning Bolt deals 3 damage to any target.",
                        "imageName": "lightning bolt",
                        "multiverseid": 209,
                        "rarity": "Common",
                        "number": "161",
                        "artist": "Christopher Rush"
                    },
                    {
                        "name": "Counterspell",
                        "types": ["Instant"],
                        "manaCost": "{U}{U}",
                        "cmc": 2,
                        "colors": ["Blue"],
                        "originalText": "Counter target spell.",
                        "imageName": "counterspell",
                        "rarity": "Uncommon",
                        "artist": "Mark Poole",
                        "legalities": [{"format": "Standard", "legality": "Legal"}]
                    },
                    {
                        "name": "Channel",
                        "types": ["Sorcery"],
                        "manaCost": "{G}{G}",
                        "cmc": 2,
                        "colors": ["Green"],
                        "imageName": "channel",
                        "rarity": "Uncommon",
                        "artist": "Richard Thomas",
                        "legalities": [{"format": "Standard", "legality": "Restricted"}]
                    },
                    {
                        "name": "Oppressive Decree",
                        "types": ["Sorcery"],
                        "manaCost": "{2}{B}",
                        "cmc": 3,
                        "colors": ["Black"],
                        "imageName": "oppressive decree",
                        "rarity": "Rare",
                        "artist": "Douglas Shuler",
                        "legalities": [{"format": "Standard", "legality": "Banned"}]
                    },
                    {
                        "name": "Boros Guildmage",
                        "types": ["Creature"],
                        "subtypes": ["Human", "Wizard"],
                        "manaCost": "{R}{W}",
                        "cmc": 2,
                        "colors": ["Red", "White"],
                        "power": "2",
                        "toughness": "2",
                        "imageName": "boros guildmage",
                        "rarity": "Uncommon",
                        "artist": "Ken Frank"
                    },
                    {
                        "name": "Ornithopter",
                        "types": ["Artifact", "Creature"],
                        "subtypes": ["Thopter"],
                        "manaCost": "{0}",
                        "cmc": 0,
                        "power": "0",
                        "toughness": "2",
                        "imageName": "ornithopter",
                        "rarity": "Uncommon",
                        "artist": "Anson Maddocks"
                    },
                    {
                        "name": "Ancient Dragon",
                        "types": ["Creature"],
                        "subtypes": ["Dragon"],
                        "manaCost": "{7}{R}{R}",
                        "cmc": 9,
                        "colors": ["Red"],
                        "power": "15",
                        "toughness": "15",
                        "imageName": "ancient dragon",
                        "rarity": "Rare",
                        "artist": "Mark Tedin"
                    },
                    {
                        "name": "Tarmogoyf",
                        "types": ["Creature"],
                        "subtypes": ["Lhurgoyf"],
                        "manaCost": "{1}{G}",
                        "cmc": 2,
                        "colors": ["Green"],
                        "power": "*",
                        "toughness": "1+*",
                        "imageName": "tarmogoyf",
                        "rarity": "Rare",
                        "artist": "Justin Murray"
                    },
                    {
                        "name": "The Fire of Dragon's Breath",
                        "types": ["Enchantment"],
                        "manaCost": "{3}{R}",
                        "cmc": 4,
                        "colors": ["Red"],
                        "imageName": "the fire of dragons breath",
                        "rarity": "Rare",
                        "artist": "Mark Tedin"
                    },
                    {
                        "name": "Breath of Fire",
                        "types": ["Sorcery"],
                        "manaCost": "{1}{R}",
                        "cmc": 2,
                        "colors": ["Red"],
                        "imageName": "breath of fire",
                        "rarity": "Common",
                        "artist": "Mark Tedin"
                    },
                    {
                        "name": "Forest",
                        "types": ["Land"],
                        "subtypes": ["Forest"],
                        "supertypes": ["Basic"],
                        "cmc": 0,
                        "imageName": "forest07",
                        "rarity": "Basic Land",
                        "artist": "Christopher Rush"
                    },
                    {
                        "name": "Forest",
                        "types": ["Land"],
                        "subtypes": ["Forest"],
                        "supertypes": ["Basic"],
                        "cmc": 0,
                        "imageName": "forest08",
                        "rarity": "Basic Land",
                        "artist": "Christopher Rush"
                    }
                ]
            },
            "ICE": {
                "code": "ICE",
                "name": "Ice Age",
                "type": "expansion",
                "releaseDate": "1995-06-03",
                "block": "Ice Age",
                "cards": [
                    {
                        "name": "Icy Manipulator",
                        "types": ["Artifact"],
                        "manaCost": "{4}",
                        "cmc": 4,
                        "imageName": "icy manipulator",
                        "rarity": "Uncommon",
                        "artist": "Douglas Shuler"
                    }
                ]
            },
            "ALL": {
                "code": "ALL",
                "name": "Alliances",
                "type": "expansion",
                "releaseDate": "1996-06-10",
                "block": "Ice Age",
                "cards": [
                    {
                        "name": "Force of Will",
                        "types": ["Instant"],
                        "manaCost": "{3}{U}{U}",
                        "cmc": 5,
                        "colors": ["Blue"],
                        "imageName": "force of will",
                        "rarity": "Uncommon",
                        "artist": "Terese Nielsen"
                    }
                ]
            }
        }"#,
        )
        .unwrap()
    }

    fn populated_db() -> Connection {
        let mut conn = test_db();
        let catalog = normalize(&sample_snapshot());
        persist_catalog(&mut conn, &catalog).unwrap();
        conn
    }

    fn names(rows: &[SearchRow]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_db();
        for table in ["edition", "metacard", "card", "format", "card_legal_in_format", "collection"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn persist_is_idempotent() {
        let mut conn = test_db();
        let catalog = normalize(&sample_snapshot());

        persist_catalog(&mut conn, &catalog).unwrap();
        let first = entity_counts(&conn).unwrap();

        persist_catalog(&mut conn, &catalog).unwrap();
        let second = entity_counts(&conn).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.editions, 3);
        assert_eq!(first.formats, 1);
        // 13 distinct names (two Forest printings share one metacard)
        assert_eq!(first.metacards, 13);
        assert_eq!(first.cards, 14);
        assert_eq!(first.legalities, 3);
    }

    #[test]
    fn upsert_refreshes_mutable_fields_and_keeps_ids() {
        let mut conn = test_db();
        let mut catalog = normalize(&sample_snapshot());
        persist_catalog(&mut conn, &catalog).unwrap();

        let id_before: i64 = conn
            .query_row(
                "SELECT card_id FROM card WHERE name = 'Lightning Bolt'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        for metacard in &mut catalog.metacards {
            if metacard.name == "Lightning Bolt" {
                metacard.text = Some("Updated oracle wording.".to_string());
            }
        }
        persist_catalog(&mut conn, &catalog).unwrap();

        let (id_after, text): (i64, String) = conn
            .query_row(
                "SELECT card.card_id, metacard.orig_text
                 FROM card JOIN metacard ON metacard.name = card.name
                 WHERE card.name = 'Lightning Bolt'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(id_before, id_after);
        assert_eq!(text, "Updated oracle wording.");
    }

    #[test]
    fn printing_versions_disambiguate_shared_numbers() {
        let conn = populated_db();
        let mut versions: Vec<u32> = Vec::new();
        let mut stmt = conn
            .prepare("SELECT version FROM card WHERE name = 'Forest' ORDER BY version")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        for row in rows {
            versions.push(row.unwrap());
        }
        assert_eq!(versions, vec![7, 8]);
    }

    #[test]
    fn maximum_on_empty_catalog_is_none() {
        let conn = test_db();
        assert_eq!(maximum(&conn, RangeAttribute::Power).unwrap(), None);
        let maxima = catalog_maximums(&conn).unwrap();
        assert_eq!(maxima, Maximums::default());
    }

    #[test]
    fn maximum_after_persist() {
        let conn = populated_db();
        assert_eq!(maximum(&conn, RangeAttribute::Power).unwrap(), Some(15.0));
        assert_eq!(
            maximum(&conn, RangeAttribute::ConvertedManaCost).unwrap(),
            Some(9.0)
        );
    }

    #[test]
    fn stat_sentinel_survives_storage() {
        let conn = populated_db();
        let (power, toughness): (Option<f64>, Option<f64>) = conn
            .query_row(
                "SELECT power, toughness FROM metacard WHERE name = 'Tarmogoyf'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(power, Some(-1.0));
        assert_eq!(toughness, Some(-1.0));

        let power: Option<f64> = conn
            .query_row(
                "SELECT power FROM metacard WHERE name = 'Lightning Bolt'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(power, None);
    }

    #[test]
    fn name_search_enforces_token_order() {
        let conn = populated_db();
        let filter = SearchFilter {
            name: Some("fire breath".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["The Fire of Dragon's Breath"]);
    }

    #[test]
    fn text_search_matches_rules_text() {
        let conn = populated_db();
        let filter = SearchFilter {
            text: Some("deals 3 damage".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["Lightning Bolt"]);
    }

    #[test]
    fn results_group_printings_by_metacard() {
        let conn = populated_db();
        let filter = SearchFilter {
            name: Some("Forest".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].printings.len(), 2);
        assert_eq!(rows[0].normal, None);
    }

    #[test]
    fn color_truth_table_single_selection() {
        let conn = populated_db();
        // Boros Guildmage stores Red|White = 5
        let cases = [
            (false, false, true),
            (false, true, false),
            (true, false, true),
            (true, true, false),
        ];
        for (match_all, match_only, expected) in cases {
            let filter = SearchFilter {
                colors: Some(ColorFilter {
                    colors: BTreeSet::from([Color::Red]),
                    colorless: false,
                    match_all,
                    match_only,
                }),
                ..SearchFilter::default()
            };
            let rows = search(&conn, &filter, None).unwrap();
            assert_eq!(
                names(&rows).contains(&"Boros Guildmage"),
                expected,
                "all={} only={}",
                match_all,
                match_only
            );
        }
    }

    #[test]
    fn color_truth_table_full_selection() {
        let conn = populated_db();
        for match_all in [false, true] {
            for match_only in [false, true] {
                let filter = SearchFilter {
                    colors: Some(ColorFilter {
                        colors: BTreeSet::from([Color::Red, Color::White]),
                        colorless: false,
                        match_all,
                        match_only,
                    }),
                    ..SearchFilter::default()
                };
                let rows = search(&conn, &filter, None).unwrap();
                assert!(
                    names(&rows).contains(&"Boros Guildmage"),
                    "all={} only={}",
                    match_all,
                    match_only
                );
            }
        }
    }

    #[test]
    fn colorless_selection_finds_artifacts() {
        let conn = populated_db();
        let filter = SearchFilter {
            colors: Some(ColorFilter {
                colorless: true,
                ..ColorFilter::default()
            }),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        let found = names(&rows);
        assert!(found.contains(&"Ornithopter"));
        assert!(found.contains(&"Icy Manipulator"));
        assert!(!found.contains(&"Lightning Bolt"));
    }

    #[test]
    fn range_open_upper_bound_at_stale_maximum() {
        let conn = populated_db();
        // The maxima were observed before Ancient Dragon (power 15) was
        // ingested; a slider parked at the old end stop must not hide it.
        let stale = Maximums {
            power: Some(10.0),
            toughness: None,
            cmc: None,
        };

        let open = SearchFilter {
            power: Some(RangeFilter { min: 2.0, max: 10.0 }),
            ..SearchFilter::default()
        };
        let compiled = search::compile(&open, None, &stale).unwrap();
        let rows = run_compiled(&conn, &compiled, false).unwrap();
        assert!(names(&rows).contains(&"Ancient Dragon"));

        let bounded = SearchFilter {
            power: Some(RangeFilter { min: 2.0, max: 9.0 }),
            ..SearchFilter::default()
        };
        let compiled = search::compile(&bounded, None, &stale).unwrap();
        let rows = run_compiled(&conn, &compiled, false).unwrap();
        assert!(!names(&rows).contains(&"Ancient Dragon"));
        assert!(names(&rows).contains(&"Boros Guildmage"));
    }

    #[test]
    fn format_filter_excludes_banned_cards() {
        let conn = populated_db();
        let filter = SearchFilter {
            format: Some("Standard".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        let found = names(&rows);
        assert!(found.contains(&"Counterspell"));
        assert!(found.contains(&"Channel"));
        assert!(!found.contains(&"Oppressive Decree"));
    }

    #[test]
    fn block_filter_spans_member_editions() {
        let conn = populated_db();
        let filter = SearchFilter {
            block: Some("Ice Age".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["Force of Will", "Icy Manipulator"]);
    }

    #[test]
    fn edition_and_rarity_filters() {
        let conn = populated_db();
        let filter = SearchFilter {
            edition: Some("ICE".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["Icy Manipulator"]);

        let filter = SearchFilter {
            rarities: vec![Rarity::BasicLand],
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["Forest"]);
    }

    #[test]
    fn number_filter_is_exact() {
        let conn = populated_db();
        let filter = SearchFilter {
            number: Some("161".to_string()),
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, None).unwrap();
        assert_eq!(names(&rows), vec!["Lightning Bolt"]);

        let filter = SearchFilter {
            number: Some("16".to_string()),
            ..SearchFilter::default()
        };
        assert!(search(&conn, &filter, None).unwrap().is_empty());
    }

    #[test]
    fn collection_filter_sums_owned_copies() {
        let conn = populated_db();
        let bolt_id: i64 = conn
            .query_row(
                "SELECT card_id FROM card WHERE name = 'Lightning Bolt'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        conn.execute(
            "INSERT INTO collection (user_id, card_id, normal, foil) VALUES (1, ?1, 2, 1)",
            params![bolt_id],
        )
        .unwrap();

        let filter = SearchFilter {
            in_collection: true,
            ..SearchFilter::default()
        };
        let rows = search(&conn, &filter, Some(1)).unwrap();
        assert_eq!(names(&rows), vec!["Lightning Bolt"]);
        assert_eq!(rows[0].normal, Some(2));
        assert_eq!(rows[0].foil, Some(1));

        // another viewer owns nothing
        let rows = search(&conn, &filter, Some(2)).unwrap();
        assert!(rows.is_empty());

        // without the flag the viewer still gets ownership sums
        let all = search(&conn, &SearchFilter::default(), Some(1)).unwrap();
        let bolt = all.iter().find(|row| row.name == "Lightning Bolt").unwrap();
        assert_eq!(bolt.normal, Some(2));
        let forest = all.iter().find(|row| row.name == "Forest").unwrap();
        assert_eq!(forest.normal, Some(0));
    }

    #[test]
    fn malformed_range_never_reaches_the_store() {
        let conn = populated_db();
        let result = RangeFilter::parse("two,ten");
        assert!(result.is_err());
        // nothing to execute: validation failed before compilation
        let filter = SearchFilter {
            in_collection: true,
            ..SearchFilter::default()
        };
        assert!(search(&conn, &filter, None).is_err());
    }
}
