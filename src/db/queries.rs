pub const CREATE_CATEGORIES: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
  name     TEXT PRIMARY KEY,
  position INTEGER NOT NULL
);
"#;

pub const CREATE_TRACKERS: &str = r#"
CREATE TABLE IF NOT EXISTS trackers (
  id       TEXT PRIMARY KEY,
  name     TEXT NOT NULL,
  color    TEXT NOT NULL,
  emoji    TEXT NOT NULL,
  schedule TEXT NOT NULL DEFAULT '',
  category TEXT NOT NULL REFERENCES categories(name)
);
"#;

pub const CREATE_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS records (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  tracker_id TEXT NOT NULL,
  date       TEXT NOT NULL,
  UNIQUE (tracker_id, date)
);
"#;

pub const CREATE_PINNED: &str = r#"
CREATE TABLE IF NOT EXISTS pinned (
  tracker_id TEXT PRIMARY KEY
);
"#;

pub const INDEX_RECORDS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);";

pub const INDEX_TRACKERS_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_trackers_category ON trackers(category);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_CATEGORIES,
        CREATE_TRACKERS,
        CREATE_RECORDS,
        CREATE_PINNED,
        INDEX_RECORDS_DATE,
        INDEX_TRACKERS_CATEGORY,
    ]
}
