pub mod queries;

use crate::model::{DATE_FORMAT, Day, Tracker, TrackerBook, TrackerId, TrackerRecord};
use crate::model::day::parse_schedule;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

struct TrackerRow {
    id: String,
    name: String,
    color: String,
    emoji: String,
    schedule: String,
    category: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite DB")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn add_category(&self, name: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO categories (name, position)
                 SELECT ?1, COALESCE(MAX(position), -1) + 1 FROM categories",
                params![name],
            )
            .with_context(|| format!("Failed to insert category: {name}"))?;

        Ok(())
    }

    pub fn upsert_tracker(&self, tracker: &Tracker, category: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO trackers (id, name, color, emoji, schedule, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id)
                 DO UPDATE SET name=excluded.name, color=excluded.color, emoji=excluded.emoji,
                               schedule=excluded.schedule, category=excluded.category",
                params![
                    tracker.id.to_string(),
                    &tracker.name,
                    &tracker.color,
                    &tracker.emoji,
                    encode_schedule(&tracker.schedule),
                    category
                ],
            )
            .with_context(|| format!("Failed to save tracker: {}", tracker.name))?;

        Ok(())
    }

    /// Removes the tracker together with its completion records and pin.
    pub fn delete_tracker(&mut self, id: TrackerId) -> Result<bool> {
        let id_str = id.to_string();
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        transaction
            .execute("DELETE FROM records WHERE tracker_id = ?1", params![&id_str])
            .context("Failed to delete tracker records")?;
        transaction
            .execute("DELETE FROM pinned WHERE tracker_id = ?1", params![&id_str])
            .context("Failed to delete tracker pin")?;
        let deleted = transaction
            .execute("DELETE FROM trackers WHERE id = ?1", params![&id_str])
            .context("Failed to delete tracker")?;

        transaction
            .commit()
            .context("Failed to commit tracker deletion")?;

        Ok(deleted > 0)
    }

    pub fn load_book(&self) -> Result<TrackerBook> {
        let mut statement = self
            .conn
            .prepare("SELECT name FROM categories ORDER BY position ASC")?;
        let categories = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query categories")?;

        let mut statement = self.conn.prepare(
            "SELECT id, name, color, emoji, schedule, category FROM trackers ORDER BY name ASC",
        )?;
        let rows = statement
            .query_map([], |row| {
                Ok(TrackerRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    emoji: row.get(3)?,
                    schedule: row.get(4)?,
                    category: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query trackers")?;

        let mut book = TrackerBook::new();
        categories
            .iter()
            .try_for_each(|name| book.add_category(name))?;

        rows.into_iter().try_for_each(|row| -> Result<()> {
            let tracker = Tracker::with_id(
                row.id.parse()?,
                &row.name,
                &row.color,
                &row.emoji,
                parse_schedule(&row.schedule)
                    .with_context(|| format!("Corrupt schedule for tracker {}", row.id))?,
            )?;
            book.add_tracker(tracker, &row.category)
        })?;

        Ok(book)
    }

    pub fn load_records(&self) -> Result<Vec<TrackerRecord>> {
        let mut statement = self
            .conn
            .prepare("SELECT tracker_id, date FROM records ORDER BY date ASC, id ASC")?;

        let rows = statement
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query records")?;

        rows.into_iter()
            .map(|(tracker_id, date)| -> Result<TrackerRecord> {
                Ok(TrackerRecord::new(
                    tracker_id.parse()?,
                    NaiveDate::parse_from_str(&date, DATE_FORMAT)
                        .with_context(|| format!("Corrupt record date: {date}"))?,
                ))
            })
            .collect()
    }

    /// Returns `false` when the tracker was already completed that day.
    pub fn add_record(&self, record: &TrackerRecord) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO records (tracker_id, date) VALUES (?1, ?2)",
                params![
                    record.tracker_id.to_string(),
                    record.date.format(DATE_FORMAT).to_string()
                ],
            )
            .context("Failed to insert record")?;

        Ok(inserted > 0)
    }

    pub fn remove_record(&self, tracker_id: TrackerId, date: NaiveDate) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM records WHERE tracker_id = ?1 AND date = ?2",
                params![tracker_id.to_string(), date.format(DATE_FORMAT).to_string()],
            )
            .context("Failed to delete record")?;

        Ok(deleted > 0)
    }

    pub fn latest_record_date(&self) -> Result<Option<NaiveDate>> {
        let date = self
            .conn
            .query_row("SELECT MAX(date) FROM records", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()
            .context("Failed to query latest record")?
            .flatten();

        date.map(|value| {
            NaiveDate::parse_from_str(&value, DATE_FORMAT)
                .with_context(|| format!("Corrupt record date: {value}"))
        })
        .transpose()
    }

    pub fn pinned_ids(&self) -> Result<HashSet<TrackerId>> {
        let mut statement = self.conn.prepare("SELECT tracker_id FROM pinned")?;
        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query pinned trackers")?;

        rows.iter().map(|raw| raw.parse()).collect()
    }

    pub fn set_pinned(&self, id: TrackerId, pinned: bool) -> Result<()> {
        let statement = if pinned {
            "INSERT OR IGNORE INTO pinned (tracker_id) VALUES (?1)"
        } else {
            "DELETE FROM pinned WHERE tracker_id = ?1"
        };

        self.conn
            .execute(statement, params![id.to_string()])
            .context("Failed to update pinned trackers")?;

        Ok(())
    }
}

fn encode_schedule(schedule: &BTreeSet<Day>) -> String {
    schedule
        .iter()
        .map(|day| day.full_name())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::model::{Day, Tracker, TrackerRecord};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date")
    }

    fn seeded() -> (Database, Tracker) {
        let database = Database::open_in_memory().expect("in-memory db");
        database.add_category("Home").expect("category");
        let tracker = Tracker::new(
            "Water plants",
            "#FF881E",
            "🌿",
            [Day::Monday, Day::Friday].into_iter().collect(),
        )
        .expect("tracker");
        database.upsert_tracker(&tracker, "Home").expect("tracker saved");

        (database, tracker)
    }

    #[test]
    fn category_names_are_unique() {
        let (database, _) = seeded();

        assert!(database.add_category("Home").is_err());
        database.add_category("Health").expect("second category");

        let book = database.load_book().expect("book");
        let names = book
            .categories()
            .iter()
            .map(|category| category.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Home", "Health"]);
    }

    #[test]
    fn loaded_tracker_keeps_schedule_and_category() {
        let (database, tracker) = seeded();

        let book = database.load_book().expect("book");

        assert_eq!(book.tracker(tracker.id), Some(&tracker));
        assert_eq!(
            book.category_of(tracker.id).map(|category| category.name.as_str()),
            Some("Home")
        );
    }

    #[test]
    fn one_record_per_tracker_and_day() {
        let (database, tracker) = seeded();
        let record = TrackerRecord::new(tracker.id, date(1));

        assert!(database.add_record(&record).expect("first insert"));
        assert!(!database.add_record(&record).expect("second insert"));
        assert_eq!(database.load_records().expect("records"), vec![record]);

        assert!(database.remove_record(tracker.id, date(1)).expect("remove"));
        assert!(!database.remove_record(tracker.id, date(1)).expect("remove again"));
        assert!(database.load_records().expect("records").is_empty());
    }

    #[test]
    fn deleting_tracker_drops_records_and_pin() {
        let (mut database, tracker) = seeded();
        database
            .add_record(&TrackerRecord::new(tracker.id, date(5)))
            .expect("record");
        database.set_pinned(tracker.id, true).expect("pin");

        assert!(database.delete_tracker(tracker.id).expect("delete"));

        assert!(database.load_book().expect("book").is_empty());
        assert!(database.load_records().expect("records").is_empty());
        assert!(database.pinned_ids().expect("pins").is_empty());
        assert_eq!(database.latest_record_date().expect("latest"), None);
    }

    #[test]
    fn pins_toggle() {
        let (database, tracker) = seeded();

        database.set_pinned(tracker.id, true).expect("pin");
        database.set_pinned(tracker.id, true).expect("pin twice");
        assert!(database.pinned_ids().expect("pins").contains(&tracker.id));

        database.set_pinned(tracker.id, false).expect("unpin");
        assert!(database.pinned_ids().expect("pins").is_empty());
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("db").join("habits.db");

        {
            let database = Database::open(&path).expect("open");
            database.add_category("Home").expect("category");
        }

        let reopened = Database::open(&path).expect("reopen");
        assert!(reopened.load_book().expect("book").category("Home").is_some());
    }
}
