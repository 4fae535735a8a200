use std::time::Instant;

/// The spell most recently started by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastRecord {
    /// Name as written in the log line
    pub name: String,
    pub icon_id: i64,
    pub cast_at: Instant,
}

/// Cross-line memory of the classifier for one log file.
///
/// Owned by the task tailing that file and replaced with a fresh value when
/// another file becomes active.
#[derive(Debug, Clone, Default)]
pub struct ClassifierState {
    /// "You have been slain by" seen, waiting for the experience loss line
    pub pending_death: bool,
    /// When another player's kill was last announced, for group kill credit
    pub last_monster_slain_at: Option<Instant>,
    pub last_cast: Option<CastRecord>,
    pub last_zone: Option<String>,
}

impl ClassifierState {
    pub fn new() -> Self {
        Self::default()
    }
}
