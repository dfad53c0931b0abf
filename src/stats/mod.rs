use crate::model::{Day, Tracker, TrackerId, TrackerRecord};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub best_streak: usize,
    pub ideal_days: usize,
    pub total_completions: usize,
    pub average_per_day: usize,
}

impl Stats {
    pub fn is_empty(&self) -> bool {
        self.total_completions == 0
    }

    pub fn rows(&self) -> [(&'static str, usize); 4] {
        [
            ("Best streak", self.best_streak),
            ("Ideal days", self.ideal_days),
            ("Trackers completed", self.total_completions),
            ("Average per day", self.average_per_day),
        ]
    }
}

/// How the number of completed trackers on a day is compared with the number
/// scheduled for its weekday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdealDayRule {
    #[default]
    AtLeast,
    Exact,
}

impl IdealDayRule {
    fn is_ideal(self, completed: usize, scheduled: usize) -> bool {
        match self {
            IdealDayRule::AtLeast => completed >= scheduled,
            IdealDayRule::Exact => completed == scheduled,
        }
    }
}

impl FromStr for IdealDayRule {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "at_least" | ">=" => Ok(IdealDayRule::AtLeast),
            "exact" | "==" => Ok(IdealDayRule::Exact),
            _ => bail!("ideal_day_rule must be at_least/exact"),
        }
    }
}

impl fmt::Display for IdealDayRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdealDayRule::AtLeast => f.write_str("at_least"),
            IdealDayRule::Exact => f.write_str("exact"),
        }
    }
}

pub fn compute<'a, I>(trackers: I, records: &[TrackerRecord]) -> Stats
where
    I: IntoIterator<Item = &'a Tracker>,
{
    compute_with_rule(trackers, records, IdealDayRule::default())
}

/// Aggregates completion statistics over a full snapshot.
///
/// Records pointing at trackers missing from `trackers` still count towards
/// the total and the per-day average, but are left out of streaks and ideal days.
pub fn compute_with_rule<'a, I>(trackers: I, records: &[TrackerRecord], rule: IdealDayRule) -> Stats
where
    I: IntoIterator<Item = &'a Tracker>,
{
    let total_completions = records.len();
    if total_completions == 0 {
        return Stats::default();
    }

    let known = trackers.into_iter().collect::<Vec<_>>();
    let known_ids = known.iter().map(|tracker| tracker.id).collect::<HashSet<_>>();

    let scheduled_by_day = known.iter().fold(
        HashMap::<Day, HashSet<TrackerId>>::new(),
        |mut acc, tracker| {
            tracker.schedule.iter().for_each(|day| {
                acc.entry(*day).or_default().insert(tracker.id);
            });
            acc
        },
    );

    let known_records = records
        .iter()
        .filter(|record| known_ids.contains(&record.tracker_id))
        .collect::<Vec<_>>();

    let completed_by_date = known_records.iter().fold(
        BTreeMap::<NaiveDate, HashSet<TrackerId>>::new(),
        |mut acc, record| {
            acc.entry(record.date).or_default().insert(record.tracker_id);
            acc
        },
    );
    let dates_by_tracker = known_records.iter().fold(
        HashMap::<TrackerId, BTreeSet<NaiveDate>>::new(),
        |mut acc, record| {
            acc.entry(record.tracker_id).or_default().insert(record.date);
            acc
        },
    );

    let best_streak = dates_by_tracker
        .values()
        .map(longest_run)
        .max()
        .unwrap_or_default();

    let ideal_days = completed_by_date
        .iter()
        .filter(|(date, completed)| {
            let scheduled = scheduled_by_day
                .get(&Day::of(**date))
                .map(HashSet::len)
                .unwrap_or_default();
            rule.is_ideal(completed.len(), scheduled)
        })
        .count();

    let active_days = records
        .iter()
        .map(|record| record.date)
        .collect::<HashSet<_>>()
        .len();
    let average_per_day = total_completions.checked_div(active_days).unwrap_or_default();

    Stats {
        best_streak,
        ideal_days,
        total_completions,
        average_per_day,
    }
}

/// Longest run of consecutive calendar days in a sorted date set.
fn longest_run(dates: &BTreeSet<NaiveDate>) -> usize {
    let (best, _, _) = dates.iter().fold(
        (0_usize, 0_usize, None::<NaiveDate>),
        |(best, current, previous), date| {
            let current = match previous.and_then(|day| day.succ_opt()) {
                Some(next) if next == *date => current + 1,
                _ => 1,
            };
            (best.max(current), current, Some(*date))
        },
    );

    best
}

#[cfg(test)]
mod tests {
    use super::{IdealDayRule, Stats, compute, compute_with_rule};
    use crate::model::{Day, Tracker, TrackerId, TrackerRecord};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date")
    }

    fn tracker(name: &str, days: &[Day]) -> Tracker {
        Tracker::new(name, "#AE1EF6", "🔥", days.iter().copied().collect()).expect("valid tracker")
    }

    fn records(id: TrackerId, days: &[u32]) -> Vec<TrackerRecord> {
        days.iter()
            .map(|day| TrackerRecord::new(id, date(*day)))
            .collect()
    }

    #[test]
    fn empty_records_yield_zeros() {
        let trackers = vec![tracker("Read", &[Day::Monday])];

        assert_eq!(compute(&trackers, &[]), Stats::default());
        assert_eq!(compute(std::iter::empty::<&Tracker>(), &[]), Stats::default());
    }

    #[test]
    fn consecutive_days_form_one_streak() {
        let read = tracker("Read", &Day::ALL);
        let stats = compute([&read], &records(read.id, &[3, 1, 5, 2, 4]));

        assert_eq!(stats.best_streak, 5);
        assert_eq!(stats.total_completions, 5);
    }

    #[test]
    fn gap_resets_streak() {
        let read = tracker("Read", &Day::ALL);
        let stats = compute([&read], &records(read.id, &[1, 3]));

        assert_eq!(stats.best_streak, 1);
    }

    #[test]
    fn best_streak_is_max_across_trackers() {
        let read = tracker("Read", &Day::ALL);
        let run = tracker("Run", &Day::ALL);
        let mut all = records(read.id, &[1, 2, 4]);
        all.extend(records(run.id, &[10, 11, 12, 20]));

        let stats = compute([&read, &run], &all);

        assert_eq!(stats.best_streak, 3);
        assert_eq!(stats.total_completions, 7);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let read = tracker("Read", &Day::ALL);
        let all = vec![
            TrackerRecord::new(read.id, NaiveDate::from_ymd_opt(2024, 2, 28).expect("date")),
            TrackerRecord::new(read.id, NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")),
            TrackerRecord::new(read.id, NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")),
        ];

        assert_eq!(compute([&read], &all).best_streak, 3);
    }

    #[test]
    fn ideal_days_compare_against_weekday_schedule() {
        // 2024-01-01 is a Monday, 2024-01-03 a Wednesday.
        let a = tracker("A", &[Day::Monday]);
        let b = tracker("B", &[Day::Monday, Day::Wednesday]);
        let mut all = records(a.id, &[1]);
        all.extend(records(b.id, &[1, 3]));

        let stats = compute([&a, &b], &all);

        assert_eq!(stats.ideal_days, 2);
    }

    #[test]
    fn partial_day_is_not_ideal() {
        let a = tracker("A", &[Day::Monday]);
        let b = tracker("B", &[Day::Monday]);

        let stats = compute([&a, &b], &records(a.id, &[1]));

        assert_eq!(stats.ideal_days, 0);
    }

    #[test]
    fn exact_rule_rejects_over_completion() {
        let habit = tracker("Habit", &[Day::Monday]);
        let event = tracker("Event", &[]);
        let mut all = records(habit.id, &[1]);
        all.extend(records(event.id, &[1]));

        let trackers = [&habit, &event];
        assert_eq!(compute_with_rule(trackers, &all, IdealDayRule::AtLeast).ideal_days, 1);
        assert_eq!(compute_with_rule(trackers, &all, IdealDayRule::Exact).ideal_days, 0);
    }

    #[test]
    fn event_on_unscheduled_weekday_depends_on_rule() {
        // 2024-01-02 is a Tuesday, nothing is scheduled on it.
        let habit = tracker("Habit", &[Day::Monday]);
        let event = tracker("Event", &[]);
        let all = records(event.id, &[2]);

        let trackers = [&habit, &event];
        assert_eq!(compute_with_rule(trackers, &all, IdealDayRule::AtLeast).ideal_days, 1);
        assert_eq!(compute_with_rule(trackers, &all, IdealDayRule::Exact).ideal_days, 0);
    }

    #[test]
    fn duplicate_records_count_once_per_day_for_ideal() {
        let habit = tracker("Habit", &[Day::Monday]);
        let all = records(habit.id, &[1, 1]);

        let stats = compute([&habit], &all);

        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.ideal_days, 1);
        assert_eq!(stats.best_streak, 1);
    }

    #[test]
    fn average_uses_integer_division() {
        let read = tracker("Read", &Day::ALL);
        let run = tracker("Run", &Day::ALL);
        let walk = tracker("Walk", &Day::ALL);
        let mut all = records(read.id, &[1, 2, 3, 4]);
        all.extend(records(run.id, &[1, 2, 3, 4]));
        all.extend(records(walk.id, &[1, 2]));

        let stats = compute([&read, &run, &walk], &all);

        assert_eq!(stats.total_completions, 10);
        assert_eq!(stats.average_per_day, 2);
    }

    #[test]
    fn unknown_tracker_records_only_count_in_totals() {
        let read = tracker("Read", &[Day::Monday]);
        let ghost = TrackerId::new();
        let mut all = records(read.id, &[8]);
        all.extend(records(ghost, &[1, 2, 3]));

        let stats = compute([&read], &all);

        assert_eq!(stats.total_completions, 4);
        assert_eq!(stats.best_streak, 1);
        assert_eq!(stats.ideal_days, 1);
        assert_eq!(stats.average_per_day, 1);
    }
}
