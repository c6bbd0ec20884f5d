//! Domain models shared by ingestion and storage.

mod dataset;
mod season;
mod stat_row;

pub use dataset::{Dataset, DatasetScope};
pub use season::Season;
pub use stat_row::StatRow;
