//! Map stats API responses onto [`StatRow`]s.
//!
//! Every stats endpoint answers with one or more tabular result sets:
//!
//! ```json
//! {"resultSets": [{"name": "...", "headers": ["A", "B"], "rowSet": [[1, 2]]}]}
//! ```
//!
//! A few endpoints use a single `resultSet` object instead of the array.

use serde_json::{Map, Value};

use crate::error::{IngestError, IngestResult};
use crate::models::{Dataset, Season, StatRow};

/// Turn one response into rows of `dataset`.
///
/// `season` is the season the request was made for. It becomes part of the
/// natural key of seasonal datasets and is injected as `SEASON` when the
/// payload does not carry one.
pub fn transform(dataset: Dataset, season: Option<Season>, body: &Value) -> IngestResult<Vec<StatRow>> {
    let set = find_result_set(dataset, body)?;

    let headers: Vec<&str> = set
        .get("headers")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::data_shape(format!("{}: result set has no headers", dataset)))?
        .iter()
        .map(|h| {
            h.as_str()
                .ok_or_else(|| IngestError::data_shape(format!("{}: non-string header", dataset)))
        })
        .collect::<IngestResult<_>>()?;

    let rows = set
        .get("rowSet")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::data_shape(format!("{}: result set has no rowSet", dataset)))?;

    let row_season = if dataset.is_seasonal() { season } else { None };

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let values = row.as_array().ok_or_else(|| {
                IngestError::data_shape(format!("{}: row {} is not an array", dataset, idx))
            })?;
            if values.len() != headers.len() {
                return Err(IngestError::data_shape(format!(
                    "{}: row {} has {} values for {} headers",
                    dataset,
                    idx,
                    values.len(),
                    headers.len()
                )));
            }

            let mut payload: Map<String, Value> = headers
                .iter()
                .zip(values)
                .map(|(h, v)| (h.to_string(), v.clone()))
                .collect();
            if let Some(season) = row_season {
                payload
                    .entry("SEASON")
                    .or_insert_with(|| Value::String(season.to_string()));
            }

            let natural_key = natural_key(dataset, row_season, &payload)
                .map_err(|column| {
                    IngestError::data_shape(format!(
                        "{}: row {} has no value for key column {}",
                        dataset, idx, column
                    ))
                })?;

            Ok(StatRow {
                dataset,
                natural_key,
                season: row_season,
                payload,
            })
        })
        .collect()
}

fn find_result_set<'a>(dataset: Dataset, body: &'a Value) -> IngestResult<&'a Value> {
    if let Some(sets) = body.get("resultSets") {
        let sets = sets
            .as_array()
            .ok_or_else(|| IngestError::data_shape(format!("{}: resultSets is not an array", dataset)))?;
        if sets.is_empty() {
            return Err(IngestError::data_shape(format!("{}: empty resultSets", dataset)));
        }
        return sets
            .iter()
            .find(|s| s.get("name").and_then(Value::as_str) == Some(dataset.result_set()))
            .ok_or_else(|| {
                IngestError::data_shape(format!(
                    "{}: result set {} not in response",
                    dataset,
                    dataset.result_set()
                ))
            });
    }

    match body.get("resultSet") {
        Some(set) if set.is_object() => Ok(set),
        _ => Err(IngestError::data_shape(format!(
            "{}: response has no result sets",
            dataset
        ))),
    }
}

/// Join the key columns with `:`; on a missing key returns the column name.
fn natural_key(
    dataset: Dataset,
    season: Option<Season>,
    payload: &Map<String, Value>,
) -> Result<String, &'static str> {
    let mut parts = Vec::with_capacity(dataset.key_columns().len() + 1);
    if let Some(season) = season {
        parts.push(season.to_string());
    }
    for &column in dataset.key_columns() {
        let part = match payload.get(column) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(column),
        };
        parts.push(part);
    }
    Ok(parts.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;

    fn team_stats(rows: Value) -> Value {
        json!({
            "resource": "leaguedashteamstats",
            "resultSets": [{
                "name": "LeagueDashTeamStats",
                "headers": ["TEAM_ID", "TEAM_NAME", "W", "L"],
                "rowSet": rows
            }]
        })
    }

    #[test]
    fn test_transform_team_stats() {
        let body = team_stats(json!([
            [1610612747, "Los Angeles Lakers", 50, 32],
            [1610612738, "Boston Celtics", 61, 21]
        ]));
        let rows = transform(Dataset::LeagueTeamStats, Some(Season::new(2024)), &body).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].natural_key, "2024-25:1610612747");
        assert_eq!(rows[0].season, Some(Season::new(2024)));
        assert_eq!(rows[0].payload["W"], json!(50));
        assert_eq!(rows[0].payload["SEASON"], json!("2024-25"));
    }

    #[test]
    fn test_transform_selects_named_set() {
        let body = json!({
            "resultSets": [
                {"name": "CareerTotalsRegularSeason", "headers": ["PLAYER_ID"], "rowSet": [[1]]},
                {
                    "name": "SeasonTotalsRegularSeason",
                    "headers": ["PLAYER_ID", "SEASON_ID", "TEAM_ID", "PTS"],
                    "rowSet": [[2544, "2003-04", 1610612739, 1654], [2544, "2004-05", 1610612739, 2175]]
                }
            ]
        });
        let rows = transform(Dataset::PlayerCareer, None, &body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].natural_key, "2544:2004-05:1610612739");
        assert_eq!(rows[1].season, None);
        assert!(rows[1].payload.get("SEASON").is_none());
    }

    #[test]
    fn test_transform_single_result_set() {
        let body = json!({
            "resultSet": {
                "name": "PlayerGameLogs",
                "headers": ["PLAYER_ID", "GAME_ID", "PTS"],
                "rowSet": [[2544, "0022400001", 21]]
            }
        });
        let rows = transform(Dataset::PlayerGameLog, Some(Season::new(2024)), &body).unwrap();
        assert_eq!(rows[0].natural_key, "2024-25:2544:0022400001");
    }

    #[test]
    fn test_empty_row_set_is_not_an_error() {
        let rows = transform(
            Dataset::LeagueTeamStats,
            Some(Season::new(2024)),
            &team_stats(json!([])),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_shape_errors() {
        let season = Some(Season::new(2024));
        let cases = vec![
            json!({"message": "An error has occurred."}),
            json!({"resultSets": []}),
            json!({"resultSets": [{"name": "Other", "headers": [], "rowSet": []}]}),
            json!({"resultSets": [{"name": "LeagueDashTeamStats", "rowSet": []}]}),
            json!({"resultSets": [{"name": "LeagueDashTeamStats", "headers": ["TEAM_ID"]}]}),
            team_stats(json!([[1610612747, "Lakers"]])),
            team_stats(json!([[null, "Lakers", 1, 2]])),
        ];

        for body in cases {
            let err = transform(Dataset::LeagueTeamStats, season, &body).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::DataShape, "{}", body);
        }
    }
}
