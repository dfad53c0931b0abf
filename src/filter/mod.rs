use crate::model::{Day, Tracker, TrackerBook, TrackerId, TrackerRecord};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const PINNED_SECTION: &str = "Pinned";

/// A category heading with the trackers that survived filtering.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySection<'a> {
    pub name: String,
    pub trackers: Vec<&'a Tracker>,
}

impl CategorySection<'_> {
    pub fn contains(&self, id: TrackerId) -> bool {
        self.trackers.iter().any(|tracker| tracker.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    Uncompleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TrackerFilter {
    #[default]
    All,
    Today,
    Completed,
    Uncompleted,
}

impl TrackerFilter {
    /// `Today` ignores the selected date and jumps to the current one.
    pub fn effective_date(self, selected: NaiveDate, today: NaiveDate) -> NaiveDate {
        match self {
            TrackerFilter::Today => today,
            _ => selected,
        }
    }
}

impl fmt::Display for TrackerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackerFilter::All => "all",
            TrackerFilter::Today => "today",
            TrackerFilter::Completed => "completed",
            TrackerFilter::Uncompleted => "uncompleted",
        };
        f.write_str(name)
    }
}

/// Which tracker set a free-text search runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Every tracker, regardless of the selected date.
    #[default]
    All,
    /// Only trackers shown for the selected date and filter.
    Date,
}

impl FromStr for SearchScope {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Ok(SearchScope::All),
            "date" => Ok(SearchScope::Date),
            _ => bail!("search_scope must be all/date"),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::All => f.write_str("all"),
            SearchScope::Date => f.write_str("date"),
        }
    }
}

/// Every category with its trackers, skipping empty categories.
pub fn sections(book: &TrackerBook) -> Vec<CategorySection<'_>> {
    book.categories()
        .iter()
        .filter_map(|category| {
            let mut trackers = category
                .tracker_ids
                .iter()
                .filter_map(|id| book.tracker(*id))
                .collect::<Vec<_>>();
            trackers.sort_by(|left, right| {
                left.name
                    .cmp(&right.name)
                    .then_with(|| left.id.cmp(&right.id))
            });

            (!trackers.is_empty()).then(|| CategorySection {
                name: category.name.clone(),
                trackers,
            })
        })
        .collect()
}

pub fn active_trackers(book: &TrackerBook, on_date: NaiveDate) -> Vec<CategorySection<'_>> {
    let day = Day::of(on_date);
    retain(sections(book), |tracker| tracker.is_active_on(day))
}

pub fn by_completion<'a>(
    sections: Vec<CategorySection<'a>>,
    on_date: NaiveDate,
    records: &[TrackerRecord],
    want: Completion,
) -> Vec<CategorySection<'a>> {
    let completed = records
        .iter()
        .filter(|record| record.date == on_date)
        .map(|record| record.tracker_id)
        .collect::<HashSet<_>>();

    retain(sections, |tracker| {
        completed.contains(&tracker.id) == (want == Completion::Completed)
    })
}

/// Case-insensitive substring match on tracker names. A blank query keeps everything.
pub fn by_name<'a>(sections: Vec<CategorySection<'a>>, query: &str) -> Vec<CategorySection<'a>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return sections;
    }

    retain(sections, |tracker| {
        tracker.name.to_lowercase().contains(&needle)
    })
}

pub fn apply<'a>(
    book: &'a TrackerBook,
    records: &[TrackerRecord],
    on_date: NaiveDate,
    filter: TrackerFilter,
) -> Vec<CategorySection<'a>> {
    let active = active_trackers(book, on_date);

    match filter {
        TrackerFilter::All | TrackerFilter::Today => active,
        TrackerFilter::Completed => by_completion(active, on_date, records, Completion::Completed),
        TrackerFilter::Uncompleted => {
            by_completion(active, on_date, records, Completion::Uncompleted)
        }
    }
}

/// Moves trackers accepted by `is_pinned` into a leading [`PINNED_SECTION`].
pub fn pin_sections<'a, P>(sections: Vec<CategorySection<'a>>, is_pinned: P) -> Vec<CategorySection<'a>>
where
    P: Fn(TrackerId) -> bool,
{
    let pinned = sections
        .iter()
        .flat_map(|section| section.trackers.iter().copied())
        .filter(|tracker| is_pinned(tracker.id))
        .collect::<Vec<_>>();

    if pinned.is_empty() {
        return sections;
    }

    let rest = retain(sections, |tracker| !is_pinned(tracker.id));

    std::iter::once(CategorySection {
        name: PINNED_SECTION.to_string(),
        trackers: pinned,
    })
    .chain(rest)
    .collect()
}

pub fn tracker_count(sections: &[CategorySection<'_>]) -> usize {
    sections.iter().map(|section| section.trackers.len()).sum()
}

fn retain<'a, F>(sections: Vec<CategorySection<'a>>, keep: F) -> Vec<CategorySection<'a>>
where
    F: Fn(&Tracker) -> bool,
{
    sections
        .into_iter()
        .filter_map(|mut section| {
            section.trackers.retain(|tracker| keep(tracker));
            (!section.trackers.is_empty()).then_some(section)
        })
        .collect()
}
