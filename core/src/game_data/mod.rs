//! Read-only reference tables loaded from flat catalog files.

mod items;
mod spells;

pub use items::{ItemIconTable, normalize_item_name};
pub use spells::{BUFF_SPELL_TYPES, MIN_SPELL_FIELDS, SpellRecord, SpellTable, TICK_MS, spell_field};

#[cfg(test)]
pub(crate) use spells::tests::spell_row;

use crate::game_log::decode_lossy;
use eqlive_types::{AppConfig, DEFAULT_ITEM_ICON_BASE_URL};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is missing required columns ({columns})")]
    MissingColumns { path: PathBuf, columns: &'static str },
}

/// Read a catalog file, replacing invalid UTF-8 instead of failing.
pub(crate) fn read_catalog(path: &Path) -> Result<String, CatalogError> {
    let bytes = std::fs::read(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_lossy(&bytes).into_owned())
}

/// Everything the classifier looks things up in.
#[derive(Debug)]
pub struct Catalogs {
    pub items: ItemIconTable,
    pub spells: SpellTable,
    pub item_icon_base_url: String,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self {
            items: ItemIconTable::default(),
            spells: SpellTable::default(),
            item_icon_base_url: DEFAULT_ITEM_ICON_BASE_URL.to_string(),
        }
    }
}

impl Catalogs {
    pub fn new(items: ItemIconTable, spells: SpellTable, item_icon_base_url: impl Into<String>) -> Self {
        Self {
            items,
            spells,
            item_icon_base_url: item_icon_base_url.into(),
        }
    }

    /// Load both catalogs named by `config`.
    ///
    /// A catalog that can't be loaded is logged and left empty; nothing
    /// matches against it but the rest of the pipeline keeps running.
    pub fn load(config: &AppConfig) -> Self {
        let items = match ItemIconTable::load_from_file(Path::new(&config.item_catalog)) {
            Ok(items) => {
                tracing::info!(path = %config.item_catalog, entries = items.len(), "Loaded item catalog");
                items
            }
            Err(e) => {
                tracing::error!(error = %e, "Item catalog unavailable, loot will not be shown");
                ItemIconTable::default()
            }
        };

        let spells = match SpellTable::load_from_file(Path::new(&config.spell_catalog)) {
            Ok(spells) => {
                tracing::info!(
                    path = %config.spell_catalog,
                    spells = spells.len(),
                    effects = spells.effect_text_count(),
                    fades = spells.fade_text_count(),
                    "Loaded spell catalog"
                );
                spells
            }
            Err(e) => {
                tracing::error!(error = %e, "Spell catalog unavailable, spells will not be shown");
                SpellTable::default()
            }
        };

        Self::new(items, spells, config.item_icon_base_url.clone())
    }

    /// `<base>/item_<icon>.png`
    pub fn item_icon_url(&self, icon: &str) -> String {
        format!(
            "{}/item_{}.png",
            self.item_icon_base_url.trim_end_matches('/'),
            icon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_catalogs_load_empty() {
        let config = AppConfig {
            item_catalog: "/no/such/items.csv".to_string(),
            spell_catalog: "/no/such/spells.txt".to_string(),
            ..AppConfig::with_log_directory("/logs")
        };
        let catalogs = Catalogs::load(&config);
        assert!(catalogs.items.is_empty());
        assert!(catalogs.spells.is_empty());
    }

    #[test]
    fn loads_both_catalogs_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.csv");
        let spells = dir.path().join("spells.txt");
        std::fs::write(&items, "name|icon\nRusty Dagger|650\n").unwrap();
        std::fs::write(
            &spells,
            spell_row(1, "Minor Shielding", "You feel armored.", "Your shielding fades.", 2500, 20, 1, 7),
        )
        .unwrap();

        let config = AppConfig {
            item_catalog: items.to_string_lossy().into_owned(),
            spell_catalog: spells.to_string_lossy().into_owned(),
            ..AppConfig::with_log_directory(dir.path().to_string_lossy())
        };
        let catalogs = Catalogs::load(&config);
        assert_eq!(catalogs.items.icon_for("rusty dagger"), Some("650"));
        assert_eq!(catalogs.spells.by_name("minor shielding").unwrap().icon_id, 7);
    }

    #[test]
    fn catalog_with_invalid_bytes_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.csv");
        std::fs::write(&items, b"\xef\xbb\xbfname|icon\nRusty Dagger|650\nBroken \xff Gem|777\n").unwrap();

        let table = ItemIconTable::load_from_file(&items).unwrap();
        assert_eq!(table.icon_for("rusty dagger"), Some("650"));
        assert_eq!(table.len(), 2);
        assert_eq!(read_catalog(&items).unwrap().matches('\u{fffd}').count(), 1);
    }

    #[test]
    fn icon_url_joins_base_and_id() {
        let catalogs = Catalogs::new(ItemIconTable::new(), SpellTable::new(), "https://icons.example/");
        assert_eq!(catalogs.item_icon_url("42"), "https://icons.example/item_42.png");
    }
}
