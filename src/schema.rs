// Diesel schema for the stats store.

diesel::table! {
    stat_rows (id) {
        id -> Integer,
        dataset -> Text,
        natural_key -> Text,
        season -> Nullable<Text>,
        payload -> Text,
        fetched_at -> Text,
    }
}
