//! Work planning: which requests a daily or full run makes.

use serde::{Deserialize, Serialize};

use crate::models::{Dataset, DatasetScope, Season, StatRow};

/// League id for the NBA in every stats endpoint.
pub const LEAGUE_ID: &str = "00";

pub const SEASON_TYPE: &str = "Regular Season";

/// The 30 franchise ids (`1610612737` Atlanta .. `1610612766` Charlotte).
pub const TEAM_IDS: std::ops::RangeInclusive<i64> = 1610612737..=1610612766;

/// Daily runs refresh the current season; full runs rebuild history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    #[default]
    Daily,
    Full,
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestMode::Daily => write!(f, "daily"),
            IngestMode::Full => write!(f, "full"),
        }
    }
}

/// One request to the stats API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub dataset: Dataset,
    pub season: Option<Season>,
    /// Team or player id for per-entity datasets.
    pub entity: Option<i64>,
    /// Restrict the player index to the current season.
    #[serde(skip)]
    pub only_current: bool,
}

impl WorkUnit {
    pub fn new(dataset: Dataset, season: Option<Season>, entity: Option<i64>) -> Self {
        Self {
            dataset,
            season,
            entity,
            only_current: false,
        }
    }

    /// Short identifier used in logs and failure reports.
    pub fn label(&self) -> String {
        let mut label = self.dataset.as_str().to_string();
        if let Some(season) = self.season {
            label.push_str(&format!(" {}", season));
        }
        if let Some(entity) = self.entity {
            label.push_str(&format!(" #{}", entity));
        }
        label
    }

    /// Query parameters for this unit's endpoint.
    pub fn params(&self) -> Vec<(String, String)> {
        let season = self.season.map(|s| s.to_string()).unwrap_or_default();
        let entity = self.entity.map(|e| e.to_string()).unwrap_or_default();

        let pairs: Vec<(&str, String)> = match self.dataset {
            Dataset::Players => vec![
                ("LeagueID", LEAGUE_ID.into()),
                ("Season", season),
                (
                    "IsOnlyCurrentSeason",
                    if self.only_current { "1" } else { "0" }.into(),
                ),
            ],
            Dataset::LeaguePlayerStats | Dataset::LeagueTeamStats => {
                let mut pairs = dash_params(season);
                if self.dataset == Dataset::LeaguePlayerStats {
                    for name in PLAYER_DASH_FILTERS {
                        pairs.push((name, String::new()));
                    }
                }
                pairs
            }
            Dataset::TeamGameLog => vec![
                ("Counter", "0".into()),
                ("Direction", "DESC".into()),
                ("LeagueID", LEAGUE_ID.into()),
                ("PlayerOrTeam", "T".into()),
                ("Season", season),
                ("SeasonType", SEASON_TYPE.into()),
                ("Sorter", "DATE".into()),
            ],
            Dataset::TeamRoster => vec![
                ("LeagueID", LEAGUE_ID.into()),
                ("Season", season),
                ("TeamID", entity),
            ],
            Dataset::PlayerGameLog => vec![
                ("LeagueID", LEAGUE_ID.into()),
                ("PlayerID", entity),
                ("Season", season),
                ("SeasonType", SEASON_TYPE.into()),
            ],
            Dataset::PlayerCareer => vec![
                ("LeagueID", LEAGUE_ID.into()),
                ("PerMode", "Totals".into()),
                ("PlayerID", entity),
            ],
        };

        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

// The dash endpoints reject requests that omit any filter, even empty ones.
const DASH_EMPTY_FILTERS: &[&str] = &[
    "Conference",
    "DateFrom",
    "DateTo",
    "Division",
    "GameScope",
    "GameSegment",
    "Location",
    "Outcome",
    "SeasonSegment",
    "ShotClockRange",
    "VsConference",
    "VsDivision",
];

const PLAYER_DASH_FILTERS: &[&str] = &[
    "College",
    "Country",
    "DraftPick",
    "DraftYear",
    "Height",
    "PlayerExperience",
    "PlayerPosition",
    "StarterBench",
    "Weight",
];

fn dash_params(season: String) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("LastNGames", "0".to_string()),
        ("LeagueID", LEAGUE_ID.into()),
        ("MeasureType", "Base".into()),
        ("Month", "0".into()),
        ("OpponentTeamID", "0".into()),
        ("PaceAdjust", "N".into()),
        ("PerMode", "PerGame".into()),
        ("Period", "0".into()),
        ("PlusMinus", "N".into()),
        ("PORound", "0".into()),
        ("Rank", "N".into()),
        ("Season", season),
        ("SeasonType", SEASON_TYPE.into()),
        ("TeamID", "0".into()),
        ("TwoWay", "0".into()),
    ];
    for name in DASH_EMPTY_FILTERS {
        pairs.push((name, String::new()));
    }
    pairs
}

/// Seasons covered by a run.
pub fn seasons(mode: IngestMode, current: Season, history: usize) -> Vec<Season> {
    match mode {
        IngestMode::Daily => vec![current],
        IngestMode::Full => current.recent(history),
    }
}

/// The player index request that seeds every other unit.
pub fn index_unit(mode: IngestMode, current: Season) -> WorkUnit {
    WorkUnit {
        only_current: mode == IngestMode::Daily,
        ..WorkUnit::new(Dataset::Players, Some(current), None)
    }
}

/// A player taken from the index, with the span of seasons they played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlayerRef {
    pub id: i64,
    pub from_year: i32,
    pub to_year: i32,
}

/// Pick the players a run covers from the index rows.
///
/// Daily keeps rostered players; full keeps every player whose career
/// overlaps one of `seasons`. A `max_players` of 0 means no limit.
pub fn select_players(
    mode: IngestMode,
    rows: &[StatRow],
    seasons: &[Season],
    max_players: usize,
) -> Vec<PlayerRef> {
    let mut players: Vec<PlayerRef> = rows
        .iter()
        .filter_map(|row| {
            let id = row.get_i64("PERSON_ID")?;
            let from_year = row.get_i64("FROM_YEAR").unwrap_or(0) as i32;
            let to_year = row.get_i64("TO_YEAR").unwrap_or(0) as i32;
            Some((row, PlayerRef { id, from_year, to_year }))
        })
        .filter(|(row, player)| match mode {
            IngestMode::Daily => row.get_i64("ROSTERSTATUS") == Some(1),
            IngestMode::Full => seasons
                .iter()
                .any(|s| s.overlaps(player.from_year, player.to_year)),
        })
        .map(|(_, player)| player)
        .collect();

    players.sort();
    players.dedup_by_key(|p| p.id);
    if max_players > 0 {
        players.truncate(max_players);
    }
    players
}

/// Expand the run into units, excluding the player index.
pub fn expand_units(
    mode: IngestMode,
    seasons: &[Season],
    current: Season,
    players: &[PlayerRef],
) -> Vec<WorkUnit> {
    let mut units = Vec::new();

    for dataset in Dataset::ALL {
        match dataset.scope() {
            DatasetScope::Once => {}
            DatasetScope::PerSeason => {
                for season in seasons {
                    units.push(WorkUnit::new(dataset, Some(*season), None));
                }
            }
            DatasetScope::PerTeam => {
                for team in TEAM_IDS {
                    units.push(WorkUnit::new(dataset, Some(current), Some(team)));
                }
            }
            DatasetScope::PerPlayerSeason => {
                for player in players {
                    for season in seasons {
                        if mode == IngestMode::Full
                            && !season.overlaps(player.from_year, player.to_year)
                        {
                            continue;
                        }
                        units.push(WorkUnit::new(dataset, Some(*season), Some(player.id)));
                    }
                }
            }
            DatasetScope::PerPlayer => {
                if mode == IngestMode::Full {
                    for player in players {
                        units.push(WorkUnit::new(dataset, None, Some(player.id)));
                    }
                }
            }
        }
    }

    units
}
