//! Content source — the collaborator that supplies dynamic strings for
//! spoken prompts and message replies. A pure data source: no control flow,
//! no side effects.

/// Topics the built-in handlers know how to ask for.
pub trait ContentSource: Send + Sync {
    /// Summary of the most recent tournaments.
    fn recent_tournaments(&self) -> Option<String>;
    /// Current top-player rankings.
    fn top_players(&self) -> Option<String>;
    /// Attendance trends.
    fn attendance(&self) -> Option<String>;
}

/// Fixed demo content, used when no live data source is wired in.
#[derive(Debug, Default)]
pub struct StaticContent;

impl ContentSource for StaticContent {
    fn recent_tournaments(&self) -> Option<String> {
        Some(
            "The latest tournament was West Coast Warzone with 256 players. \
             Weekly locals ran in three regions last week."
                .to_string(),
        )
    }

    fn top_players(&self) -> Option<String> {
        Some("The top ranked player is West with 45 recorded wins this season.".to_string())
    }

    fn attendance(&self) -> Option<String> {
        Some("Attendance is trending up: average entrants per event rose to 87.".to_string())
    }
}
