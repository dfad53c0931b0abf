pub mod day;

pub use day::Day;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "#33CF69";
pub const DEFAULT_EMOJI: &str = "🙂";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(Uuid);

impl TrackerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to address a tracker from the command line.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TrackerId {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .with_context(|| format!("Invalid tracker id: {raw}"))
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub schedule: BTreeSet<Day>,
}

impl Tracker {
    pub fn new(name: &str, color: &str, emoji: &str, schedule: BTreeSet<Day>) -> Result<Self> {
        Self::with_id(TrackerId::new(), name, color, emoji, schedule)
    }

    pub fn with_id(
        id: TrackerId,
        name: &str,
        color: &str,
        emoji: &str,
        schedule: BTreeSet<Day>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Tracker name must not be empty");
        }

        let emoji = emoji.trim();
        if emoji.is_empty() {
            bail!("Tracker emoji must not be empty");
        }

        Ok(Self {
            id,
            name: name.to_string(),
            color: normalize_color(color)?,
            emoji: emoji.to_string(),
            schedule,
        })
    }

    /// An empty schedule marks a one-off event.
    /// Display label used in command output, e.g. `🌱 Water plants`.
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.name)
    }

    pub fn is_event(&self) -> bool {
        self.schedule.is_empty()
    }

    /// Events are eligible on every day.
    pub fn is_active_on(&self, day: Day) -> bool {
        self.is_event() || self.schedule.contains(&day)
    }
}

fn normalize_color(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Invalid color: {raw}. Example: #FF881E");
    }

    Ok(format!("#{}", hex.to_uppercase()))
}

/// Completion of a tracker on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub tracker_id: TrackerId,
    pub date: NaiveDate,
}

impl TrackerRecord {
    pub fn new(tracker_id: TrackerId, date: NaiveDate) -> Self {
        Self { tracker_id, date }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub name: String,
    pub tracker_ids: BTreeSet<TrackerId>,
}

/// Trackers keyed by id, with categories referring to them by id.
///
/// Each tracker sits in exactly one category. Moving a tracker between
/// categories only rewrites id sets, the tracker value itself is stored once.
#[derive(Debug, Clone, Default)]
pub struct TrackerBook {
    trackers: HashMap<TrackerId, Tracker>,
    categories: Vec<TrackerCategory>,
}

impl TrackerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &[TrackerCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&TrackerCategory> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn trackers(&self) -> impl Iterator<Item = &Tracker> {
        self.trackers.values()
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.trackers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn category_of(&self, id: TrackerId) -> Option<&TrackerCategory> {
        self.categories
            .iter()
            .find(|category| category.tracker_ids.contains(&id))
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Category name must not be empty");
        }
        if self.category(name).is_some() {
            bail!("Category already exists: {name}");
        }

        self.categories.push(TrackerCategory {
            name: name.to_string(),
            tracker_ids: BTreeSet::new(),
        });

        Ok(())
    }

    pub fn add_tracker(&mut self, tracker: Tracker, category: &str) -> Result<()> {
        if self.trackers.contains_key(&tracker.id) {
            bail!("Tracker already exists: {}", tracker.id);
        }

        self.category_mut(category)?.tracker_ids.insert(tracker.id);
        self.trackers.insert(tracker.id, tracker);

        Ok(())
    }

    /// Replaces the tracker with the same id and moves it to `category`.
    pub fn update_tracker(&mut self, tracker: Tracker, category: &str) -> Result<()> {
        if !self.trackers.contains_key(&tracker.id) {
            bail!("Unknown tracker: {}", tracker.id);
        }

        self.category_mut(category)?;
        self.categories.iter_mut().for_each(|entry| {
            entry.tracker_ids.remove(&tracker.id);
        });
        self.category_mut(category)?.tracker_ids.insert(tracker.id);
        self.trackers.insert(tracker.id, tracker);

        Ok(())
    }

    pub fn remove_tracker(&mut self, id: TrackerId) -> Result<Tracker> {
        let removed = self
            .trackers
            .remove(&id)
            .with_context(|| format!("Unknown tracker: {id}"))?;

        self.categories.iter_mut().for_each(|category| {
            category.tracker_ids.remove(&id);
        });

        Ok(removed)
    }

    /// Looks a tracker up by full id, unique id prefix or case-insensitive name.
    pub fn resolve(&self, raw: &str) -> Result<&Tracker> {
        if let Ok(id) = raw.parse::<TrackerId>() {
            return self
                .tracker(id)
                .with_context(|| format!("Unknown tracker: {raw}"));
        }

        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            bail!("Tracker reference must not be empty");
        }

        let by_name = self
            .trackers
            .values()
            .filter(|tracker| tracker.name.to_lowercase() == needle)
            .collect::<Vec<_>>();
        let candidates = if by_name.is_empty() {
            self.trackers
                .values()
                .filter(|tracker| tracker.id.0.simple().to_string().starts_with(&needle))
                .collect::<Vec<_>>()
        } else {
            by_name
        };

        match candidates.as_slice() {
            [tracker] => Ok(*tracker),
            [] => bail!("Unknown tracker: {raw}"),
            _ => bail!("Ambiguous tracker reference: {raw} matches {} trackers", candidates.len()),
        }
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut TrackerCategory> {
        self.categories
            .iter_mut()
            .find(|category| category.name == name)
            .with_context(|| format!("Unknown category: {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{Day, Tracker, TrackerBook};
    use std::collections::BTreeSet;

    fn tracker(name: &str, days: &[Day]) -> Tracker {
        Tracker::new(name, "#ff881e", "🌱", days.iter().copied().collect()).expect("valid tracker")
    }

    #[test]
    fn label_uses_emoji_and_name_not_reference() {
        let mut book = TrackerBook::new();
        book.add_category("Home").expect("category");
        let plants = tracker("Water plants", &[Day::Friday]);
        let prefix = plants.id.short();
        book.add_tracker(plants, "Home").expect("add");

        let resolved = book.resolve(&prefix[..4]).expect("resolved by prefix");

        assert_eq!(resolved.label(), "🌱 Water plants");
    }

    #[test]
    fn tracker_validation() {
        assert!(Tracker::new("  ", "#FFFFFF", "🌱", BTreeSet::new()).is_err());
        assert!(Tracker::new("Run", "blue", "🌱", BTreeSet::new()).is_err());
        assert!(Tracker::new("Run", "#FFFFFF", "", BTreeSet::new()).is_err());

        let created = tracker("  Run ", &[]);
        assert_eq!(created.name, "Run");
        assert_eq!(created.color, "#FF881E");
    }

    #[test]
    fn event_is_active_every_day() {
        let event = tracker("Dentist", &[]);
        let habit = tracker("Gym", &[Day::Monday]);

        assert!(Day::ALL.iter().all(|day| event.is_active_on(*day)));
        assert!(habit.is_active_on(Day::Monday));
        assert!(!habit.is_active_on(Day::Tuesday));
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let mut book = TrackerBook::new();
        book.add_category("Home").expect("first insert");

        assert!(book.add_category("Home").is_err());
        assert!(book.add_category(" ").is_err());
    }

    #[test]
    fn update_moves_tracker_between_categories() {
        let mut book = TrackerBook::new();
        book.add_category("Home").expect("category");
        book.add_category("Health").expect("category");

        let original = tracker("Water plants", &[Day::Friday]);
        let id = original.id;
        book.add_tracker(original.clone(), "Home").expect("add");

        let renamed = Tracker {
            name: "Water garden".to_string(),
            ..original
        };
        book.update_tracker(renamed, "Health").expect("update");

        assert_eq!(book.len(), 1);
        assert_eq!(book.category_of(id).map(|c| c.name.as_str()), Some("Health"));
        assert!(book.category("Home").expect("home").tracker_ids.is_empty());
        assert_eq!(book.tracker(id).map(|t| t.name.as_str()), Some("Water garden"));
    }

    #[test]
    fn add_to_unknown_category_fails() {
        let mut book = TrackerBook::new();

        assert!(book.add_tracker(tracker("Read", &[]), "Missing").is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn resolve_by_name_and_prefix() {
        let mut book = TrackerBook::new();
        book.add_category("Home").expect("category");
        let created = tracker("Read", &[Day::Sunday]);
        let id = created.id;
        book.add_tracker(created, "Home").expect("add");

        assert_eq!(book.resolve("read").expect("by name").id, id);
        assert_eq!(book.resolve(&id.short()).expect("by prefix").id, id);
        assert_eq!(book.resolve(&id.to_string()).expect("by id").id, id);
        assert!(book.resolve("write").is_err());
    }

    #[test]
    fn remove_clears_category_membership() {
        let mut book = TrackerBook::new();
        book.add_category("Home").expect("category");
        let created = tracker("Read", &[]);
        let id = created.id;
        book.add_tracker(created, "Home").expect("add");

        book.remove_tracker(id).expect("remove");

        assert!(book.category_of(id).is_none());
        assert!(book.remove_tracker(id).is_err());
    }
}
