//! Search predicate compiler
//!
//! Compiles a sparse record of optional search filters into a parameterized
//! query fragment against the normalized schema. Compilation is a pure
//! function: it performs no I/O, the catalog maxima it needs for open-ended
//! ranges are passed in as a value, and the same filter record always yields
//! the same fragment. Query execution lives in [`crate::database`].
//!
//! All predicates are conjoined with AND; the color predicate has internal
//! OR structure and the owned-in-collection filter is a HAVING condition
//! because it sums over the left-joined ownership table.

use crate::catalog::colors::{self, Color};
use crate::catalog::Rarity;
use crate::error::{CollectorError, Result};
use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use std::collections::BTreeSet;

/// A bound query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i64),
    Real(f64),
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Text(value) => value.to_sql(),
            Param::Int(value) => value.to_sql(),
            Param::Real(value) => value.to_sql(),
        }
    }
}

/// Result ordering. Fixed column mapping only: ORDER BY is never built from
/// caller-supplied text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    ConvertedManaCost,
    Power,
    Toughness,
}

impl SortKey {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortKey::Name => "metacard.name",
            SortKey::ConvertedManaCost => "metacard.cmc",
            SortKey::Power => "metacard.power",
            SortKey::Toughness => "metacard.toughness",
        }
    }
}

/// An inclusive numeric range, as submitted by the range sliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min > max {
            return Err(CollectorError::FilterValidation(format!(
                "range minimum {} exceeds maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Parse the `"min,max"` form the UI submits. Non-numeric components are
    /// rejected here, before any predicate is built.
    pub fn parse(value: &str) -> Result<Self> {
        let (min, max) = value.split_once(',').ok_or_else(|| {
            CollectorError::FilterValidation(format!("range must be \"min,max\", got {:?}", value))
        })?;
        let min: f64 = min.trim().parse().map_err(|_| {
            CollectorError::FilterValidation(format!("range minimum {:?} is not a number", min))
        })?;
        let max: f64 = max.trim().parse().map_err(|_| {
            CollectorError::FilterValidation(format!("range maximum {:?} is not a number", max))
        })?;
        Self::new(min, max)
    }
}

/// Color selection with its two matching-mode toggles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorFilter {
    pub colors: BTreeSet<Color>,
    /// "Colorless" was explicitly selected
    pub colorless: bool,
    /// Card must have at least the full selected set
    pub match_all: bool,
    /// Card must have no colors outside the selected set
    pub match_only: bool,
}

impl ColorFilter {
    fn is_empty(&self) -> bool {
        self.colors.is_empty() && !self.colorless
    }
}

/// Catalog-wide maxima for the range attributes, as observed when the UI
/// was rendered. `None` means the catalog was empty for that attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Maximums {
    pub power: Option<f64>,
    pub toughness: Option<f64>,
    pub cmc: Option<f64>,
}

/// One search request: every filter independently optional.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub name: Option<String>,
    pub types: Option<String>,
    pub subtypes: Option<String>,
    pub supertypes: Option<String>,
    /// Rules text
    pub text: Option<String>,
    pub flavor: Option<String>,
    /// Exact catalog number within the edition
    pub number: Option<String>,
    pub artist: Option<String>,
    pub power: Option<RangeFilter>,
    pub toughness: Option<RangeFilter>,
    pub cmc: Option<RangeFilter>,
    pub colors: Option<ColorFilter>,
    pub rarities: Vec<Rarity>,
    pub edition: Option<String>,
    pub block: Option<String>,
    pub format: Option<String>,
    /// Restrict to printings the viewer owns at least one copy of
    pub in_collection: bool,
    pub order_by: SortKey,
}

/// The compiled, fully-bound query fragment.
#[derive(Debug)]
pub struct CompiledQuery {
    /// Empty string when no filter contributed a predicate
    pub where_clause: String,
    pub having_clause: Option<String>,
    pub order_by: &'static str,
    /// Named parameters, keys carrying the `:` prefix
    pub params: Vec<(String, Param)>,
}

impl CompiledQuery {
    /// Assemble the full SELECT statement. One row per metacard with the
    /// aggregated printing ids; ownership sums when a viewer is joined.
    pub fn to_sql(&self, with_viewer: bool) -> String {
        let select = if with_viewer {
            "SELECT metacard.name AS name, GROUP_CONCAT(card.card_id) AS printings, \
             IFNULL(SUM(collection.normal), 0) AS normal, \
             IFNULL(SUM(collection.foil), 0) AS foil"
        } else {
            "SELECT metacard.name AS name, GROUP_CONCAT(card.card_id) AS printings"
        };

        let mut sql = String::from(select);
        sql.push_str("\nFROM metacard\nINNER JOIN card ON card.name = metacard.name");
        if with_viewer {
            sql.push_str(
                "\nLEFT JOIN collection ON collection.card_id = card.card_id \
                 AND collection.user_id = :user_id",
            );
        }
        if !self.where_clause.is_empty() {
            sql.push('\n');
            sql.push_str(&self.where_clause);
        }
        sql.push_str("\nGROUP BY metacard.name");
        if let Some(having) = &self.having_clause {
            sql.push('\n');
            sql.push_str(having);
        }
        sql.push_str("\nORDER BY ");
        sql.push_str(self.order_by);
        sql
    }

    /// The parameters in the borrowed form rusqlite binds.
    pub fn bind_args(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// Compile a filter record into a query fragment.
///
/// Absent filters contribute no predicate. Invalid input surfaces as
/// `FilterValidation` before any SQL could run.
pub fn compile(
    filter: &SearchFilter,
    viewer: Option<i64>,
    maxima: &Maximums,
) -> Result<CompiledQuery> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<(String, Param)> = Vec::new();

    if let Some(name) = &filter.name {
        clauses.push("metacard.name LIKE :name COLLATE NOCASE".to_string());
        params.push((":name".to_string(), Param::Text(wildcard(name)?)));
    }
    if let Some(types) = &filter.types {
        clauses.push("metacard.types LIKE :types COLLATE NOCASE".to_string());
        params.push((":types".to_string(), Param::Text(wildcard(types)?)));
    }
    if let Some(subtypes) = &filter.subtypes {
        clauses.push("metacard.subtypes LIKE :subtypes COLLATE NOCASE".to_string());
        params.push((":subtypes".to_string(), Param::Text(wildcard(subtypes)?)));
    }
    if let Some(supertypes) = &filter.supertypes {
        clauses.push("metacard.supertypes LIKE :supertypes COLLATE NOCASE".to_string());
        params.push((":supertypes".to_string(), Param::Text(wildcard(supertypes)?)));
    }
    if let Some(text) = &filter.text {
        clauses.push("metacard.orig_text LIKE :card_text COLLATE NOCASE".to_string());
        params.push((":card_text".to_string(), Param::Text(wildcard(text)?)));
    }
    if let Some(flavor) = &filter.flavor {
        clauses.push("card.flavor LIKE :flavor COLLATE NOCASE".to_string());
        params.push((":flavor".to_string(), Param::Text(wildcard(flavor)?)));
    }
    if let Some(number) = &filter.number {
        clauses.push("card.number = :card_number".to_string());
        params.push((":card_number".to_string(), Param::Text(number.clone())));
    }
    if let Some(artist) = &filter.artist {
        clauses.push("card.artist LIKE :artist COLLATE NOCASE".to_string());
        params.push((":artist".to_string(), Param::Text(wildcard(artist)?)));
    }
    if let Some(edition) = &filter.edition {
        clauses.push("card.edition = :edition".to_string());
        params.push((":edition".to_string(), Param::Text(edition.clone())));
    }
    if let Some(block) = &filter.block {
        clauses
            .push("card.edition IN (SELECT code FROM edition WHERE block = :block)".to_string());
        params.push((":block".to_string(), Param::Text(block.clone())));
    }
    if let Some(format) = &filter.format {
        // Banned status is stored but never satisfies "legal in format"
        clauses.push(
            "metacard.name IN (SELECT card_name FROM card_legal_in_format \
             WHERE format = :format AND status != 'Banned')"
                .to_string(),
        );
        params.push((":format".to_string(), Param::Text(format.clone())));
    }

    if !filter.rarities.is_empty() {
        let mut keys = Vec::new();
        for (counter, rarity) in filter.rarities.iter().enumerate() {
            let key = format!(":rarity_{}", counter);
            params.push((key.clone(), Param::Text(rarity.as_str().to_string())));
            keys.push(key);
        }
        clauses.push(format!("card.rarity IN ({})", keys.join(", ")));
    }

    if let Some(color_filter) = &filter.colors {
        push_colors(&mut clauses, &mut params, color_filter);
    }

    if let Some(range) = filter.power {
        push_range(&mut clauses, &mut params, range, "metacard.power", "power", maxima.power);
    }
    if let Some(range) = filter.toughness {
        push_range(
            &mut clauses,
            &mut params,
            range,
            "metacard.toughness",
            "toughness",
            maxima.toughness,
        );
    }
    if let Some(range) = filter.cmc {
        push_range(&mut clauses, &mut params, range, "metacard.cmc", "cmc", maxima.cmc);
    }

    let having_clause = if filter.in_collection {
        if viewer.is_none() {
            return Err(CollectorError::FilterValidation(
                "the collection filter requires a signed-in viewer".to_string(),
            ));
        }
        Some(
            "HAVING (IFNULL(SUM(collection.normal), 0) + IFNULL(SUM(collection.foil), 0)) > 0"
                .to_string(),
        )
    } else {
        None
    };

    if let Some(user_id) = viewer {
        params.push((":user_id".to_string(), Param::Int(user_id)));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    Ok(CompiledQuery {
        where_clause,
        having_clause,
        order_by: filter.order_by.as_sql(),
        params,
    })
}

/// Emit the color predicate for the four matching-mode quadrants.
///
/// For "only selected" the mask is the complement of the selection: a card
/// qualifies when it has no bit outside the selected set. Colorless cards
/// carry a NULL mask and only ever match through the explicit IS NULL arm.
fn push_colors(clauses: &mut Vec<String>, params: &mut Vec<(String, Param)>, filter: &ColorFilter) {
    if filter.is_empty() {
        return;
    }

    if filter.colors.is_empty() {
        // a selection of just "Colorless"
        clauses.push("metacard.colors IS NULL".to_string());
        return;
    }

    let selected = colors::encode(filter.colors.iter().copied());
    let clause = match (filter.match_all, filter.match_only) {
        (true, true) => {
            params.push((":colors".to_string(), Param::Int(selected)));
            "metacard.colors = :colors".to_string()
        }
        (true, false) => {
            params.push((":colors".to_string(), Param::Int(selected)));
            "(metacard.colors & :colors) = :colors".to_string()
        }
        (false, only) => {
            let mask = if only {
                // complement: no color outside the selection
                colors::encode(Color::ALL) - selected
            } else {
                selected
            };
            params.push((":colors".to_string(), Param::Int(mask)));
            let comparison = if only {
                "(metacard.colors & :colors) = 0"
            } else {
                "(metacard.colors & :colors) > 0"
            };
            if filter.colorless {
                format!("({} OR metacard.colors IS NULL)", comparison)
            } else {
                comparison.to_string()
            }
        }
    };
    clauses.push(clause);
}

/// Emit a range predicate. When the requested maximum equals the catalog
/// maximum the upper bound is dropped: the slider was at its end stop, and
/// cards above whatever the maximum was at render time must still match.
fn push_range(
    clauses: &mut Vec<String>,
    params: &mut Vec<(String, Param)>,
    range: RangeFilter,
    column: &str,
    key: &str,
    maximum: Option<f64>,
) {
    let min_key = format!(":{}_min", key);
    if maximum.is_some_and(|observed| range.max == observed) {
        clauses.push(format!("{} >= {}", column, min_key));
        params.push((min_key, Param::Real(range.min)));
    } else {
        let max_key = format!(":{}_max", key);
        clauses.push(format!("{} BETWEEN {} AND {}", column, min_key, max_key));
        params.push((min_key, Param::Real(range.min)));
        params.push((max_key, Param::Real(range.max)));
    }
}

/// Build the ordered-substring wildcard pattern: `%tok1%tok2%…%`.
///
/// Every token must appear, in the given order, with arbitrary filler in
/// between. Quoted substrings are single tokens.
fn wildcard(input: &str) -> Result<String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok("%".to_string());
    }
    Ok(format!("%{}%", tokens.join("%")))
}

/// Split the raw input on whitespace, honoring shell-style quoting
/// (single quotes, double quotes, backslash escapes).
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    match chars.next() {
                        Some(escaped) => current.push(escaped),
                        None => {
                            return Err(CollectorError::FilterValidation(
                                "dangling escape in filter text".to_string(),
                            ))
                        }
                    }
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => match chars.next() {
                    Some(escaped) => {
                        current.push(escaped);
                        in_token = true;
                    }
                    None => {
                        return Err(CollectorError::FilterValidation(
                            "dangling escape in filter text".to_string(),
                        ))
                    }
                },
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(CollectorError::FilterValidation(
            "unbalanced quote in filter text".to_string(),
        ));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
