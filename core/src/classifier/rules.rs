//! Line classification rules.
//!
//! Each rule looks at one prefix-stripped line, may update the classifier
//! state, and appends the events it recognises. Rules run in the order of
//! [`RULES`]; a rule returning [`Flow::Stop`] ends processing of the line.

use super::state::{CastRecord, ClassifierState};
use crate::game_data::{Catalogs, normalize_item_name};
use eqlive_types::{CoinType, OverlayEvent};
use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Longest gap between "has been slain by" and party experience that still
/// counts as a kill for the player.
pub const GROUP_KILL_WINDOW: Duration = Duration::from_secs(2);

/// How long after "You begin casting" an effect message is attributed to
/// that cast.
pub const CAST_MATCH_WINDOW: Duration = Duration::from_secs(3);

static ZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You have entered (.+?)\.").expect("valid zone pattern"));

static COIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(platinum|gold|silver|copper)").expect("valid coin pattern")
});

static LOOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"You have looted (?:(an?)\s)?(.+?)\.").expect("valid loot pattern")
});

static CAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You begin casting (.+?)\.").expect("valid cast pattern"));

/// Whether later rules still see the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Read-only inputs shared by all rules for one line.
pub struct LineContext<'a> {
    pub content: &'a str,
    pub now: Instant,
    pub char_name: &'a str,
    pub catalogs: &'a Catalogs,
}

pub type Rule = fn(&mut ClassifierState, &LineContext<'_>, &mut Vec<OverlayEvent>) -> Flow;

/// Evaluation order. Zone, currency, death, kill and loot are independent of
/// each other; the spell rules form one chain where the first match wins.
pub const RULES: &[Rule] = &[
    zone_change,
    currency,
    death,
    kill,
    item_loot,
    spell_activity,
];

// ─────────────────────────────────────────────────────────────────────────────
// Independent rules
// ─────────────────────────────────────────────────────────────────────────────

pub fn zone_change(
    state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    if !line.content.contains("You have entered") {
        return Flow::Continue;
    }
    let Some(zone) = ZONE_RE.captures(line.content).and_then(|c| c.get(1)) else {
        return Flow::Continue;
    };
    let zone = zone.as_str();

    if state.last_zone.as_deref() != Some(zone) {
        tracing::info!(character = line.char_name, zone, "Zone changed");
        out.push(OverlayEvent::status(line.char_name, zone));
        state.last_zone = Some(zone.to_string());
    }
    Flow::Continue
}

pub fn currency(
    _state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    let content = line.content;
    let is_coin_line = content.contains("You receive")
        && (content.contains("from the corpse")
            || (content.contains("from") && content.contains("for the")));
    if !is_coin_line {
        return Flow::Continue;
    }

    out.extend(parse_coins(&content.to_lowercase()).map(|(coin_type, count)| {
        tracing::debug!(coin = coin_type.as_str(), count, "Coin received");
        OverlayEvent::Coin { coin_type, count }
    }));
    out.push(OverlayEvent::BagOpen);
    Flow::Continue
}

/// `(denomination, amount)` pairs in the order they appear in `lowered`.
pub fn parse_coins(lowered: &str) -> impl Iterator<Item = (CoinType, u64)> + '_ {
    COIN_RE.captures_iter(lowered).filter_map(|caps| {
        let count = caps.get(1)?.as_str().parse().ok()?;
        let coin_type = CoinType::from_name(caps.get(2)?.as_str())?;
        Some((coin_type, count))
    })
}

pub fn death(
    state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    if line.content.contains("You have been slain by") {
        state.pending_death = true;
        return Flow::Stop;
    }
    if state.pending_death && line.content.contains("You have lost experience.") {
        tracing::info!("Death confirmed");
        state.pending_death = false;
        out.push(OverlayEvent::Death);
    }
    Flow::Continue
}

pub fn kill(
    state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    let content = line.content;
    if content.contains("You have slain") {
        out.push(OverlayEvent::Kill);
    } else if content.contains("has been slain by") {
        state.last_monster_slain_at = Some(line.now);
    } else if content.contains("You gain party experience")
        && let Some(slain_at) = state.last_monster_slain_at.take()
        && line.now.saturating_duration_since(slain_at) <= GROUP_KILL_WINDOW
    {
        tracing::debug!("Group kill credited");
        out.push(OverlayEvent::Kill);
    }
    Flow::Continue
}

pub fn item_loot(
    _state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    let Some(caps) = LOOT_RE.captures(line.content) else {
        return Flow::Continue;
    };
    let Some(name) = caps.get(2) else {
        return Flow::Continue;
    };
    let name = name.as_str().trim_matches(['-', ' ']);
    let article = caps.get(1).map(|a| a.as_str());

    let items = &line.catalogs.items;
    let icon = items.icon_for(&normalize_item_name(name)).or_else(|| {
        article.and_then(|a| items.icon_for(&normalize_item_name(&format!("{a} {name}"))))
    });

    match icon {
        Some(icon) => {
            let icon_url = line.catalogs.item_icon_url(icon);
            tracing::debug!(item = name, %icon_url, "Item looted");
            out.push(OverlayEvent::Item {
                name: name.to_string(),
                icon_url: icon_url.clone(),
            });
            out.push(OverlayEvent::ItemToast {
                name: name.to_string(),
                icon_url,
            });
            out.push(OverlayEvent::BagOpen);
        }
        None => tracing::warn!(item = name, "No icon for looted item"),
    }
    Flow::Continue
}

// ─────────────────────────────────────────────────────────────────────────────
// Spell chain
// ─────────────────────────────────────────────────────────────────────────────

/// Cast start, interrupt, fizzle, buff fade and buff landing. At most one of
/// them applies to a line, checked in that order.
pub fn spell_activity(
    state: &mut ClassifierState,
    line: &LineContext<'_>,
    out: &mut Vec<OverlayEvent>,
) -> Flow {
    let content = line.content;
    let spells = &line.catalogs.spells;

    if content.contains("You begin casting") {
        cast_start(state, line, out);
    } else if content.contains("Your spell is interrupted.") {
        out.push(OverlayEvent::Interrupted);
        state.last_cast = None;
    } else if content.contains("Your spell fizzles!") {
        if let Some(cast) = state.last_cast.take() {
            out.push(OverlayEvent::Fizzle {
                icon_id: cast.icon_id,
                name: cast.name,
            });
        }
    } else if let Some(spell) = spells.first_fade_match(content) {
        out.push(OverlayEvent::RemoveBuff {
            name: spell.name.clone(),
        });
    } else if spells.any_effect_match(content) {
        buff_landed(state, line, out);
    }
    Flow::Continue
}

fn cast_start(state: &mut ClassifierState, line: &LineContext<'_>, out: &mut Vec<OverlayEvent>) {
    let Some(name) = CAST_RE.captures(line.content).and_then(|c| c.get(1)) else {
        return;
    };
    let name = name.as_str().trim();
    let Some(spell) = line.catalogs.spells.by_name(name) else {
        tracing::debug!(spell = name, "Unknown spell cast");
        return;
    };

    state.last_cast = Some(CastRecord {
        name: name.to_string(),
        icon_id: spell.icon_id,
        cast_at: line.now,
    });
    out.push(OverlayEvent::Casting {
        icon_id: spell.icon_id,
        name: name.to_string(),
        cast_time_ms: spell.cast_time_ms,
    });
}

/// A recent cast claims the effect message; only when there is none is the
/// message matched against every buff's text.
fn buff_landed(state: &ClassifierState, line: &LineContext<'_>, out: &mut Vec<OverlayEvent>) {
    let spells = &line.catalogs.spells;

    let in_flight = state
        .last_cast
        .as_ref()
        .filter(|cast| line.now.saturating_duration_since(cast.cast_at) < CAST_MATCH_WINDOW);

    match in_flight {
        Some(cast) => {
            if let Some(spell) = spells.by_name(&cast.name)
                && spell.is_buff()
            {
                out.push(OverlayEvent::Buff {
                    icon_id: cast.icon_id,
                    name: cast.name.clone(),
                    duration_ms: spell.buff_duration_ms(),
                });
            }
        }
        None => {
            if let Some(spell) = spells.first_buff_effect_match(line.content) {
                out.push(OverlayEvent::Buff {
                    icon_id: spell.icon_id,
                    name: spell.name.clone(),
                    duration_ms: spell.buff_duration_ms(),
                });
            }
        }
    }
}
