//! Spell metadata table.
//!
//! Rows come from the game's `^`-delimited spell file. Besides lookups by
//! name, the table keeps the "lands on you" and "fades" message texts in
//! catalog order so a log line can be matched back to the spell that
//! produced it.

use super::{CatalogError, read_catalog};
use hashbrown::HashMap;
use phf::phf_set;
use std::path::Path;

const DELIMITER: char = '^';

/// Fewest fields a row must have to be usable (highest index read is 144).
pub const MIN_SPELL_FIELDS: usize = 145;

/// Milliseconds per duration tick.
pub const TICK_MS: i64 = 6000;

/// Positional columns of the spell file.
pub mod spell_field {
    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const YOU_TEXT: usize = 6;
    pub const OTHER_TEXT: usize = 7;
    pub const FADES_TEXT: usize = 8;
    pub const CAST_TIME_MS: usize = 13;
    pub const DURATION_FORMULA: usize = 16;
    pub const DURATION_TICKS: usize = 17;
    pub const SPELL_TYPE: usize = 83;
    pub const ICON_ID: usize = 144;
}

/// Spell type codes for beneficial timed effects.
pub static BUFF_SPELL_TYPES: phf::Set<i32> = phf_set! {
    1i32, 3i32, 4i32, 5i32, 7i32,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellRecord {
    pub id: i64,
    pub name: String,
    pub you_text: String,
    pub other_text: String,
    pub fades_text: String,
    pub cast_time_ms: i64,
    pub duration_formula: i32,
    pub duration_ticks: i64,
    pub spell_type: i32,
    pub icon_id: i64,
}

impl SpellRecord {
    /// Parse one catalog row. `None` for short rows or non-numeric fields.
    pub fn parse_row(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(DELIMITER).collect();
        if parts.len() < MIN_SPELL_FIELDS {
            return None;
        }
        let int = |idx: usize| parts[idx].trim().parse::<i64>().ok();

        Some(Self {
            id: int(spell_field::ID)?,
            name: parts[spell_field::NAME].to_string(),
            you_text: parts[spell_field::YOU_TEXT].to_string(),
            other_text: parts[spell_field::OTHER_TEXT].to_string(),
            fades_text: parts[spell_field::FADES_TEXT].to_string(),
            cast_time_ms: int(spell_field::CAST_TIME_MS)?,
            duration_formula: i32::try_from(int(spell_field::DURATION_FORMULA)?).ok()?,
            duration_ticks: int(spell_field::DURATION_TICKS)?,
            spell_type: i32::try_from(int(spell_field::SPELL_TYPE)?).ok()?,
            icon_id: int(spell_field::ICON_ID)?,
        })
    }

    #[inline]
    pub fn is_buff(&self) -> bool {
        BUFF_SPELL_TYPES.contains(&self.spell_type)
    }

    /// Buff length shown on the overlay; non-positive tick counts mean 0.
    pub fn buff_duration_ms(&self) -> i64 {
        if self.duration_ticks > 0 {
            self.duration_ticks * TICK_MS
        } else {
            0
        }
    }
}

/// Message text -> spell, iterated in first-seen order.
#[derive(Debug, Default)]
struct TextTable {
    entries: Vec<(String, usize)>,
    positions: HashMap<String, usize>,
}

impl TextTable {
    fn insert(&mut self, text: &str, spell: usize) {
        if text.is_empty() {
            return;
        }
        match self.positions.get(text) {
            Some(&pos) => self.entries[pos].1 = spell,
            None => {
                self.positions.insert(text.to_string(), self.entries.len());
                self.entries.push((text.to_string(), spell));
            }
        }
    }

    fn matches<'a>(&'a self, content: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.entries
            .iter()
            .filter(move |(text, _)| content.contains(text.as_str()))
            .map(|(_, spell)| *spell)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default)]
pub struct SpellTable {
    spells: Vec<SpellRecord>,
    /// lowercase name -> index, last row wins
    by_name: HashMap<String, usize>,
    you_texts: TextTable,
    fade_texts: TextTable,
}

impl SpellTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SpellRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = read_catalog(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse catalog text, skipping rows that are short or malformed.
    pub fn parse(content: &str) -> Self {
        Self::from_records(content.lines().filter_map(SpellRecord::parse_row))
    }

    fn insert(&mut self, record: SpellRecord) {
        let idx = self.spells.len();
        self.by_name.insert(record.name.to_lowercase(), idx);
        self.you_texts.insert(&record.you_text, idx);
        self.fade_texts.insert(&record.fades_text, idx);
        self.spells.push(record);
    }

    /// Case-insensitive exact name lookup.
    pub fn by_name(&self, name: &str) -> Option<&SpellRecord> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.spells[idx])
    }

    /// First spell whose fade text occurs in `content`.
    pub fn first_fade_match(&self, content: &str) -> Option<&SpellRecord> {
        self.fade_texts
            .matches(content)
            .next()
            .map(|idx| &self.spells[idx])
    }

    /// Whether any spell's "you" text occurs in `content`.
    pub fn any_effect_match(&self, content: &str) -> bool {
        self.you_texts.matches(content).next().is_some()
    }

    /// First buff-eligible spell whose "you" text occurs in `content`.
    pub fn first_buff_effect_match(&self, content: &str) -> Option<&SpellRecord> {
        self.you_texts
            .matches(content)
            .map(|idx| &self.spells[idx])
            .find(|spell| spell.is_buff())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn effect_text_count(&self) -> usize {
        self.you_texts.len()
    }

    pub fn fade_text_count(&self) -> usize {
        self.fade_texts.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a `^`-delimited row with the given columns set.
    pub(crate) fn spell_row(
        id: i64,
        name: &str,
        you: &str,
        fades: &str,
        cast_ms: i64,
        ticks: i64,
        spell_type: i32,
        icon: i64,
    ) -> String {
        let mut parts = vec![String::from("0"); MIN_SPELL_FIELDS];
        parts[spell_field::ID] = id.to_string();
        parts[spell_field::NAME] = name.to_string();
        parts[spell_field::YOU_TEXT] = you.to_string();
        parts[spell_field::OTHER_TEXT] = String::new();
        parts[spell_field::FADES_TEXT] = fades.to_string();
        parts[spell_field::CAST_TIME_MS] = cast_ms.to_string();
        parts[spell_field::DURATION_FORMULA] = "1".to_string();
        parts[spell_field::DURATION_TICKS] = ticks.to_string();
        parts[spell_field::SPELL_TYPE] = spell_type.to_string();
        parts[spell_field::ICON_ID] = icon.to_string();
        parts.join("^")
    }

    #[test]
    fn parses_positional_fields() {
        let row = spell_row(
            278,
            "Spirit of Wolf",
            "You feel the spirit of wolf enter you.",
            "The spirit of wolf leaves you.",
            4000,
            60,
            5,
            58,
        );
        let spell = SpellRecord::parse_row(&row).unwrap();
        assert_eq!(spell.id, 278);
        assert_eq!(spell.name, "Spirit of Wolf");
        assert_eq!(spell.cast_time_ms, 4000);
        assert_eq!(spell.icon_id, 58);
        assert!(spell.is_buff());
        assert_eq!(spell.buff_duration_ms(), 360_000);
    }

    #[test]
    fn short_and_malformed_rows_are_skipped() {
        let short = vec!["1"; MIN_SPELL_FIELDS - 1].join("^");
        assert!(SpellRecord::parse_row(&short).is_none());

        let mut bad = spell_row(1, "Bad", "", "", 0, 0, 1, 1);
        bad = bad.replacen("1^Bad", "x^Bad", 1);
        assert!(SpellRecord::parse_row(&bad).is_none());

        let content = format!(
            "{short}\n{}\n",
            spell_row(2, "Minor Healing", "You feel better.", "", 1500, 0, 0, 11)
        );
        let table = SpellTable::parse(&content);
        assert_eq!(table.len(), 1);
        assert!(table.by_name("minor healing").is_some());
    }

    #[test]
    fn non_positive_ticks_mean_no_duration() {
        let row = spell_row(3, "Instant", "", "", 0, -1, 1, 1);
        assert_eq!(SpellRecord::parse_row(&row).unwrap().buff_duration_ms(), 0);
    }

    #[test]
    fn name_lookup_is_case_insensitive_and_last_row_wins() {
        let table = SpellTable::parse(&format!(
            "{}\n{}\n",
            spell_row(1, "Flame Lick", "", "", 1000, 0, 0, 10),
            spell_row(2, "Flame Lick", "", "", 1000, 0, 0, 20),
        ));
        assert_eq!(table.by_name("FLAME LICK").unwrap().icon_id, 20);
        assert!(table.by_name("Flame").is_none());
    }

    #[test]
    fn text_tables_keep_first_position_on_replace() {
        let table = SpellTable::parse(&format!(
            "{}\n{}\n{}\n",
            spell_row(1, "Skin like Wood", "Your skin turns hard.", "", 0, 10, 1, 1),
            spell_row(2, "Courage", "You feel", "", 0, 10, 1, 2),
            spell_row(3, "Skin like Rock", "Your skin turns hard.", "", 0, 10, 1, 3),
        ));
        assert_eq!(table.effect_text_count(), 2);
        // both texts match; the replaced entry still comes first
        let spell = table
            .first_buff_effect_match("You feel... Your skin turns hard.")
            .unwrap();
        assert_eq!(spell.name, "Skin like Rock");
    }

    #[test]
    fn buff_match_skips_ineligible_types() {
        let table = SpellTable::parse(&format!(
            "{}\n{}\n",
            spell_row(1, "Root", "Your feet adhere to the ground.", "", 0, 5, 0, 1),
            spell_row(2, "Levitate", "Your feet leave the ground.", "", 0, 5, 7, 2),
        ));
        assert!(table.any_effect_match("Your feet adhere to the ground."));
        assert!(
            table
                .first_buff_effect_match("Your feet adhere to the ground.")
                .is_none()
        );
        assert_eq!(
            table
                .first_buff_effect_match("Your feet leave the ground.")
                .unwrap()
                .name,
            "Levitate"
        );
    }

    #[test]
    fn empty_texts_are_not_registered() {
        let table = SpellTable::parse(&spell_row(1, "Quiet", "", "", 0, 0, 1, 1));
        assert_eq!(table.effect_text_count(), 0);
        assert_eq!(table.fade_text_count(), 0);
        assert!(!table.any_effect_match("anything at all"));
    }
}
