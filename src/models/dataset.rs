//! Stats API datasets the ingester knows how to fetch.

use serde::{Deserialize, Serialize};

/// How many units of work a dataset expands into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetScope {
    /// One request per run (the player index).
    Once,
    /// One request per season.
    PerSeason,
    /// One request per team for the current season.
    PerTeam,
    /// One request per player per season.
    PerPlayerSeason,
    /// One request per player.
    PerPlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dataset {
    /// Player index (`commonallplayers`).
    Players,
    /// League-wide per-player season averages.
    LeaguePlayerStats,
    /// League-wide per-team season averages.
    LeagueTeamStats,
    /// Team game results, one row per team per game.
    TeamGameLog,
    /// Current roster of one team.
    TeamRoster,
    /// Game-by-game lines of one player.
    PlayerGameLog,
    /// Season totals over a player's career.
    PlayerCareer,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::Players,
        Dataset::LeaguePlayerStats,
        Dataset::LeagueTeamStats,
        Dataset::TeamGameLog,
        Dataset::TeamRoster,
        Dataset::PlayerGameLog,
        Dataset::PlayerCareer,
    ];

    /// Stable name stored in the `dataset` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Players => "players",
            Dataset::LeaguePlayerStats => "league-player-stats",
            Dataset::LeagueTeamStats => "league-team-stats",
            Dataset::TeamGameLog => "team-game-log",
            Dataset::TeamRoster => "team-roster",
            Dataset::PlayerGameLog => "player-game-log",
            Dataset::PlayerCareer => "player-career",
        }
    }

    /// Stats API endpoint path segment.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Dataset::Players => "commonallplayers",
            Dataset::LeaguePlayerStats => "leaguedashplayerstats",
            Dataset::LeagueTeamStats => "leaguedashteamstats",
            Dataset::TeamGameLog => "leaguegamelog",
            Dataset::TeamRoster => "commonteamroster",
            Dataset::PlayerGameLog => "playergamelogs",
            Dataset::PlayerCareer => "playercareerstats",
        }
    }

    /// Name of the result set holding this dataset's rows.
    pub fn result_set(&self) -> &'static str {
        match self {
            Dataset::Players => "CommonAllPlayers",
            Dataset::LeaguePlayerStats => "LeagueDashPlayerStats",
            Dataset::LeagueTeamStats => "LeagueDashTeamStats",
            Dataset::TeamGameLog => "LeagueGameLog",
            Dataset::TeamRoster => "CommonTeamRoster",
            Dataset::PlayerGameLog => "PlayerGameLogs",
            Dataset::PlayerCareer => "SeasonTotalsRegularSeason",
        }
    }

    /// Columns that identify a row within its dataset (and season).
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Players => &["PERSON_ID"],
            Dataset::LeaguePlayerStats => &["PLAYER_ID"],
            Dataset::LeagueTeamStats => &["TEAM_ID"],
            Dataset::TeamGameLog => &["GAME_ID", "TEAM_ID"],
            Dataset::TeamRoster => &["TeamID", "PLAYER_ID"],
            Dataset::PlayerGameLog => &["PLAYER_ID", "GAME_ID"],
            Dataset::PlayerCareer => &["PLAYER_ID", "SEASON_ID", "TEAM_ID"],
        }
    }

    pub fn scope(&self) -> DatasetScope {
        match self {
            Dataset::Players => DatasetScope::Once,
            Dataset::LeaguePlayerStats | Dataset::LeagueTeamStats | Dataset::TeamGameLog => {
                DatasetScope::PerSeason
            }
            Dataset::TeamRoster => DatasetScope::PerTeam,
            Dataset::PlayerGameLog => DatasetScope::PerPlayerSeason,
            Dataset::PlayerCareer => DatasetScope::PerPlayer,
        }
    }

    /// Whether rows belong to a single season (career rows span many).
    pub fn is_seasonal(&self) -> bool {
        !matches!(self, Dataset::Players | Dataset::PlayerCareer)
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dataset {
    type Err = String;

    /// Accepts the stored name or the endpoint name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Dataset::ALL
            .into_iter()
            .find(|d| d.as_str() == s || d.endpoint() == s)
            .ok_or_else(|| format!("Unknown dataset '{}'", s))
    }
}
