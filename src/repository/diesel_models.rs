//! Diesel ORM models for the `stat_rows` table.

use diesel::prelude::*;

use crate::schema;

/// Stored stats row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::stat_rows)]
pub struct StatRowRecord {
    pub id: i32,
    pub dataset: String,
    pub natural_key: String,
    pub season: Option<String>,
    pub payload: String,
    pub fetched_at: String,
}

/// New stats row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::stat_rows)]
pub struct NewStatRow<'a> {
    pub dataset: &'a str,
    pub natural_key: &'a str,
    pub season: Option<&'a str>,
    pub payload: &'a str,
    pub fetched_at: &'a str,
}
