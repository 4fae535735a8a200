//! Shared types for eqlive
//!
//! This crate contains the serializable types shared between the engine
//! (eqlive-core), the server binary and the browser overlays: the outbound
//! event schema and the on-disk configuration.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Outbound Events
// ─────────────────────────────────────────────────────────────────────────────

/// Coin denominations that appear in loot and vendor lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Platinum,
    Gold,
    Silver,
    Copper,
}

impl CoinType {
    /// Parse a lowercase denomination as written in the log.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "platinum" => Some(CoinType::Platinum),
            "gold" => Some(CoinType::Gold),
            "silver" => Some(CoinType::Silver),
            "copper" => Some(CoinType::Copper),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinType::Platinum => "platinum",
            CoinType::Gold => "gold",
            CoinType::Silver => "silver",
            CoinType::Copper => "copper",
        }
    }
}

/// Kill and death counters for the active character.
///
/// Totals cover the whole active log file (seeded by a full scan on attach),
/// session counters cover the lifetime of the process unless a reset policy
/// is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounters {
    pub total_deaths: u64,
    pub session_deaths: u64,
    pub total_kills: u64,
    pub session_kills: u64,
}

/// One message pushed to the display clients.
///
/// Serialized as a flat JSON object with a `type` discriminator. Field names
/// are part of the contract with the overlay pages and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayEvent {
    Status {
        char_name: String,
        current_zone: String,
    },
    Stats {
        total_deaths: u64,
        session_deaths: u64,
        total_kills: u64,
        session_kills: u64,
    },
    Coin {
        #[serde(rename = "coin")]
        coin_type: CoinType,
        count: u64,
    },
    Death,
    Kill,
    Item {
        #[serde(rename = "item")]
        name: String,
        #[serde(rename = "icon")]
        icon_url: String,
    },
    ItemToast {
        #[serde(rename = "item")]
        name: String,
        #[serde(rename = "icon")]
        icon_url: String,
    },
    BagOpen,
    Casting {
        icon_id: i64,
        name: String,
        #[serde(rename = "cast_time")]
        cast_time_ms: i64,
    },
    Interrupted,
    Fizzle {
        icon_id: i64,
        name: String,
    },
    Buff {
        icon_id: i64,
        name: String,
        duration_ms: i64,
    },
    RemoveBuff {
        name: String,
    },
}

impl OverlayEvent {
    pub fn stats(counters: &StatsCounters) -> Self {
        OverlayEvent::Stats {
            total_deaths: counters.total_deaths,
            session_deaths: counters.session_deaths,
            total_kills: counters.total_kills,
            session_kills: counters.session_kills,
        }
    }

    pub fn status(char_name: impl Into<String>, current_zone: impl Into<String>) -> Self {
        OverlayEvent::Status {
            char_name: char_name.into(),
            current_zone: current_zone.into(),
        }
    }

    /// The `type` discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayEvent::Status { .. } => "status",
            OverlayEvent::Stats { .. } => "stats",
            OverlayEvent::Coin { .. } => "coin",
            OverlayEvent::Death => "death",
            OverlayEvent::Kill => "kill",
            OverlayEvent::Item { .. } => "item",
            OverlayEvent::ItemToast { .. } => "item_toast",
            OverlayEvent::BagOpen => "bag_open",
            OverlayEvent::Casting { .. } => "casting",
            OverlayEvent::Interrupted => "interrupted",
            OverlayEvent::Fizzle { .. } => "fizzle",
            OverlayEvent::Buff { .. } => "buff",
            OverlayEvent::RemoveBuff { .. } => "remove_buff",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_ITEM_ICON_BASE_URL: &str =
    "https://raw.githubusercontent.com/nullservices/eqitemicons/refs/heads/main/itemicons";

/// Application configuration, stored as TOML next to the data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing the `eqlog_<character>_<server>.txt` files.
    #[serde(default, alias = "log_dir")]
    pub log_directory: String,

    /// Port for the overlay page server.
    #[serde(default = "default_http_port", alias = "port")]
    pub http_port: u16,

    /// Port for the WebSocket push channel.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// `|`-delimited item table with `name` and `icon` columns.
    #[serde(default = "default_item_catalog")]
    pub item_catalog: String,

    /// `^`-delimited spell table (spells_us.txt layout).
    #[serde(default = "default_spell_catalog")]
    pub spell_catalog: String,

    #[serde(default = "default_item_icon_base_url")]
    pub item_icon_base_url: String,

    /// Directory holding `templates/` and `static/` for the overlay pages.
    #[serde(default = "default_asset_directory")]
    pub asset_directory: String,

    /// How often the log directory is re-checked for a newer log file.
    #[serde(default = "default_rotation_poll_ms")]
    pub rotation_poll_ms: u64,

    /// Idle wait between reads when the tailed file has no new data.
    #[serde(default = "default_tail_poll_ms")]
    pub tail_poll_ms: u64,

    /// Refuse to start when no log file exists yet.
    #[serde(default)]
    pub strict_startup: bool,

    /// Reset session counters whenever the character changes zone.
    #[serde(default)]
    pub reset_session_on_zone: bool,
}

fn default_http_port() -> u16 {
    8000
}

fn default_ws_port() -> u16 {
    6789
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_item_catalog() -> String {
    "data/items_min.csv".to_string()
}

fn default_spell_catalog() -> String {
    "data/spells_us.txt".to_string()
}

fn default_item_icon_base_url() -> String {
    DEFAULT_ITEM_ICON_BASE_URL.to_string()
}

fn default_asset_directory() -> String {
    ".".to_string()
}

fn default_rotation_poll_ms() -> u64 {
    2000
}

fn default_tail_poll_ms() -> u64 {
    100
}

impl AppConfig {
    /// Create a new AppConfig with the specified log directory.
    /// Other fields use their default values.
    pub fn with_log_directory(log_directory: impl Into<String>) -> Self {
        Self {
            log_directory: log_directory.into(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
            bind_address: default_bind_address(),
            item_catalog: default_item_catalog(),
            spell_catalog: default_spell_catalog(),
            item_icon_base_url: default_item_icon_base_url(),
            asset_directory: default_asset_directory(),
            rotation_poll_ms: default_rotation_poll_ms(),
            tail_poll_ms: default_tail_poll_ms(),
            strict_startup: false,
            reset_session_on_zone: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_log_directory(String::new())
    }
}
