use crate::db::Database;
use crate::filter::{self, CategorySection, SearchScope, TrackerFilter};
use crate::model::{Day, Tracker, TrackerBook, TrackerId, TrackerRecord};
use crate::stats::{self, IdealDayRule, Stats};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub search_scope: SearchScope,
    pub ideal_day_rule: IdealDayRule,
}

#[derive(Debug, Clone)]
pub struct ViewQuery {
    pub date: NaiveDate,
    pub today: NaiveDate,
    pub filter: TrackerFilter,
    pub search: Option<String>,
}

/// Everything a front end renders for one screen, recomputed on request.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard<'a> {
    pub date: NaiveDate,
    pub sections: Vec<CategorySection<'a>>,
    pub stats: Stats,
}

/// Store-backed tracker state.
///
/// Every mutation writes through to the database and reloads the snapshot.
/// Views are derived on demand with [`TrackerService::dashboard`], nothing is
/// cached between calls.
pub struct TrackerService {
    database: Database,
    options: ViewOptions,
    book: TrackerBook,
    records: Vec<TrackerRecord>,
    pinned: HashSet<TrackerId>,
}

impl TrackerService {
    pub fn new(database: Database, options: ViewOptions) -> Result<Self> {
        let mut service = Self {
            database,
            options,
            book: TrackerBook::new(),
            records: Vec::new(),
            pinned: HashSet::new(),
        };
        service.reload()?;

        Ok(service)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.book = self.database.load_book()?;
        self.records = self.database.load_records()?;
        self.pinned = self.database.pinned_ids()?;

        Ok(())
    }

    pub fn book(&self) -> &TrackerBook {
        &self.book
    }

    pub fn records(&self) -> &[TrackerRecord] {
        &self.records
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        let mut staged = self.book.clone();
        staged.add_category(name)?;

        self.database.add_category(name)?;
        self.book = staged;
        info!(category = name, "category added");

        Ok(())
    }

    pub fn add_tracker(&mut self, tracker: Tracker, category: &str) -> Result<()> {
        let mut staged = self.book.clone();
        staged.add_tracker(tracker.clone(), category)?;

        self.database.upsert_tracker(&tracker, category)?;
        self.book = staged;
        info!(tracker = %tracker.id, name = %tracker.name, category, "tracker added");

        Ok(())
    }

    /// Replaces a tracker by id. `category` of `None` keeps the current one.
    pub fn update_tracker(&mut self, tracker: Tracker, category: Option<&str>) -> Result<()> {
        let category = match category {
            Some(name) => name.to_string(),
            None => self
                .book
                .category_of(tracker.id)
                .map(|current| current.name.clone())
                .with_context(|| format!("Unknown tracker: {}", tracker.id))?,
        };

        let mut staged = self.book.clone();
        staged.update_tracker(tracker.clone(), &category)?;

        self.database.upsert_tracker(&tracker, &category)?;
        self.book = staged;
        info!(tracker = %tracker.id, name = %tracker.name, category = %category, "tracker updated");

        Ok(())
    }

    pub fn delete_tracker(&mut self, id: TrackerId) -> Result<Tracker> {
        let removed = self
            .book
            .tracker(id)
            .cloned()
            .with_context(|| format!("Unknown tracker: {id}"))?;

        self.database.delete_tracker(id)?;
        self.reload()?;
        info!(tracker = %id, name = %removed.name, "tracker deleted");

        Ok(removed)
    }

    /// Marks `id` done on `date`. Returns `false` if it already was.
    pub fn complete(&mut self, id: TrackerId, date: NaiveDate, today: NaiveDate) -> Result<bool> {
        let tracker = self
            .book
            .tracker(id)
            .with_context(|| format!("Unknown tracker: {id}"))?;

        if date > today {
            bail!("Cannot complete {} on a future date: {date}", tracker.name);
        }
        if !tracker.is_active_on(Day::of(date)) {
            bail!(
                "{} is not scheduled on {} ({date})",
                tracker.name,
                Day::of(date)
            );
        }

        let inserted = self.database.add_record(&TrackerRecord::new(id, date))?;
        self.records = self.database.load_records()?;
        info!(tracker = %id, date = %date, inserted, "tracker completed");

        Ok(inserted)
    }

    /// Removes the completion of `id` on `date`. Returns `false` if there was none.
    pub fn uncomplete(&mut self, id: TrackerId, date: NaiveDate) -> Result<bool> {
        if self.book.tracker(id).is_none() {
            bail!("Unknown tracker: {id}");
        }

        let removed = self.database.remove_record(id, date)?;
        self.records = self.database.load_records()?;
        info!(tracker = %id, date = %date, removed, "tracker completion removed");

        Ok(removed)
    }

    /// Flips the pin state and returns the new one.
    pub fn toggle_pin(&mut self, id: TrackerId) -> Result<bool> {
        if self.book.tracker(id).is_none() {
            bail!("Unknown tracker: {id}");
        }

        let pinned = !self.is_pinned(id);
        self.database.set_pinned(id, pinned)?;
        self.pinned = self.database.pinned_ids()?;
        info!(tracker = %id, pinned, "tracker pin toggled");

        Ok(pinned)
    }

    pub fn is_pinned(&self, id: TrackerId) -> bool {
        self.pinned.contains(&id)
    }

    pub fn is_completed(&self, id: TrackerId, date: NaiveDate) -> bool {
        self.records
            .iter()
            .any(|record| record.tracker_id == id && record.date == date)
    }

    pub fn completion_count(&self, id: TrackerId) -> usize {
        self.records
            .iter()
            .filter(|record| record.tracker_id == id)
            .count()
    }

    pub fn tracker_count(&self) -> usize {
        self.book.len()
    }

    pub fn stats(&self) -> Stats {
        stats::compute_with_rule(
            self.book.trackers(),
            &self.records,
            self.options.ideal_day_rule,
        )
    }

    pub fn dashboard(&self, query: &ViewQuery) -> Dashboard<'_> {
        let date = query.filter.effective_date(query.date, query.today);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let sections = match (search, self.options.search_scope) {
            (Some(text), SearchScope::All) => filter::by_name(filter::sections(&self.book), text),
            (Some(text), SearchScope::Date) => filter::by_name(
                filter::apply(&self.book, &self.records, date, query.filter),
                text,
            ),
            (None, _) => filter::apply(&self.book, &self.records, date, query.filter),
        };

        Dashboard {
            date,
            sections: filter::pin_sections(sections, |id| self.is_pinned(id)),
            stats: self.stats(),
        }
    }
}
