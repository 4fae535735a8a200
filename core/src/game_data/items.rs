//! Item icon table.
//!
//! Maps normalized item names to the icon id used by the public item icon
//! set, so a loot line can be shown with its picture.

use super::{CatalogError, read_catalog};
use hashbrown::HashMap;
use std::path::Path;

const DELIMITER: char = '|';

/// Lowercase and keep only `[a-z0-9 ]`, trimmed.
///
/// Applied to catalog names at load time and to looted names at lookup time
/// so punctuation like apostrophes and hyphens never causes a miss.
pub fn normalize_item_name(name: &str) -> String {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' '))
        .collect();
    normalized.trim().to_string()
}

#[derive(Debug, Default)]
pub struct ItemIconTable {
    /// normalized name -> icon id
    icons: HashMap<String, String>,
}

impl ItemIconTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, icon)` pairs; names are normalized.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = Self::new();
        for (name, icon) in entries {
            table.insert(name, icon);
        }
        table
    }

    /// Load from a `|`-delimited file whose header row names a `name` and an
    /// `icon` column. Rows missing either value are skipped.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = read_catalog(path)?;
        Self::parse(&content).ok_or_else(|| CatalogError::MissingColumns {
            path: path.to_path_buf(),
            columns: "name, icon",
        })
    }

    /// Parse catalog text. `None` when the header lacks the required columns.
    pub fn parse(content: &str) -> Option<Self> {
        let mut lines = content.lines();
        let header: Vec<String> = lines
            .next()?
            .trim_start_matches('\u{feff}')
            .split(DELIMITER)
            .map(|h| h.trim().to_lowercase())
            .collect();

        let name_col = header.iter().position(|h| h == "name")?;
        let icon_col = header.iter().position(|h| h == "icon")?;

        let mut table = Self::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            let (Some(name), Some(icon)) = (fields.get(name_col), fields.get(icon_col)) else {
                continue;
            };
            table.insert(name, icon);
        }
        Some(table)
    }

    fn insert(&mut self, name: &str, icon: &str) {
        let key = normalize_item_name(name);
        let icon = icon.trim();
        if !key.is_empty() && !icon.is_empty() {
            self.icons.insert(key, icon.to_string());
        }
    }

    /// Icon id for an already-normalized name.
    #[inline]
    pub fn icon_for(&self, normalized_name: &str) -> Option<&str> {
        self.icons.get(normalized_name).map(|s| s.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_item_name("  Fine Steel Long-Sword "), "fine steel longsword");
        assert_eq!(normalize_item_name("Tae Ew's Ceremonial Robe"), "tae ews ceremonial robe");
        assert_eq!(normalize_item_name("Bone Chips (x2)"), "bone chips x2");
    }

    #[test]
    fn parses_header_columns_in_any_order() {
        let table = ItemIconTable::parse(
            "id|icon|name\n1001|42|A Pair of Old Boots\n1002|650|Rusty Dagger\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.icon_for("a pair of old boots"), Some("42"));
        assert_eq!(table.icon_for("rusty dagger"), Some("650"));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let table = ItemIconTable::parse("name|icon\nGood Item|7\nNo Icon|\n|12\ntruncated\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.icon_for("good item"), Some("7"));
    }

    #[test]
    fn header_without_required_columns_is_rejected() {
        assert!(ItemIconTable::parse("id|label\n1|x\n").is_none());
        assert!(ItemIconTable::parse("").is_none());
    }

    #[test]
    fn load_from_missing_file_is_an_error() {
        let err = ItemIconTable::load_from_file(Path::new("/no/such/items.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
