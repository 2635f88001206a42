use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::calendar::{add_days, days_between, week_start, weekday_index};

/// Cosmetic appointment category. Drives icon and colour choices in a
/// presentation layer, never behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Birthday,
    Dentist,
    Doctor,
    NoteTask,
    Travel,
    Manicure,
    Hairdresser,
    Supermarket,
    Visit,
    Medicine,
    Exercise,
    WorkMeeting,
    Studies,
    Default,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Birthday => "Birthday",
            Category::Dentist => "Dentist",
            Category::Doctor => "Doctor",
            Category::NoteTask => "Note/Task",
            Category::Travel => "Travel",
            Category::Manicure => "Manicure",
            Category::Hairdresser => "Hairdresser",
            Category::Supermarket => "Supermarket",
            Category::Visit => "Visit",
            Category::Medicine => "Medicine",
            Category::Exercise => "Exercise",
            Category::WorkMeeting => "Work meeting",
            Category::Studies => "Studies",
            Category::Default => "General",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every N units of the frequency. Values below 1 are treated as 1.
    pub interval: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Weekday indices (0 = Sunday .. 6 = Saturday); only meaningful for
    /// weekly rules. Empty means "the anchor's own weekday".
    #[serde(default)]
    pub days_of_week: Vec<u8>,
}

/// Where a persisted appointment record came from. Replaces the historical
/// boolean-flag-plus-id-prefix convention with a typed tag; the generated
/// ids themselves keep the `med-{reminder}-...` format for log
/// compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentSource {
    Manual,
    Medicine { reminder_id: String },
}

impl Default for AppointmentSource {
    fn default() -> Self {
        Self::Manual
    }
}

/// The canonical, persisted record defining a (possibly recurring) event.
/// `date` is the series anchor; concrete occurrences are computed, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterAppointment {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub date: NaiveDate,
    /// Local clock time, `HH:MM`.
    pub start_time: String,
    /// May equal `start_time` for point-in-time events.
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub source: AppointmentSource,
}

impl MasterAppointment {
    pub fn is_medicine(&self) -> bool {
        matches!(self.source, AppointmentSource::Medicine { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceKind {
    /// A non-recurring appointment on its own date.
    Single,
    /// One concrete instance of a recurring series.
    Recurring,
    /// A dose instance persisted by bulk medicine materialization.
    MedicineMaterialized,
    /// A dose instance computed on demand from a continuous reminder.
    MedicineContinuous,
}

/// An ephemeral projection of a master appointment onto one concrete date.
/// Owned by whichever computation produced it; never mutated, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub master_id: String,
    pub date: NaiveDate,
    pub title: String,
    pub category: Category,
    pub start_time: String,
    pub end_time: String,
    pub kind: OccurrenceKind,
}

impl PartialEq for Occurrence {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.date == other.date
    }
}

impl Eq for Occurrence {}

impl PartialOrd for Occurrence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Occurrence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.start_time.cmp(&other.start_time))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Hard ceiling on the day-by-day walk: five years of daily steps. Hitting
/// it truncates the result instead of looping.
const WALK_CEILING_DAYS: u32 = 365 * 5;

/// Expands a master appointment into the concrete occurrences whose dates
/// fall inside the inclusive `[view_start, view_end]` window.
///
/// Recurring series are walked one calendar day at a time from the anchor,
/// with a per-frequency membership test deciding which visited days emit an
/// occurrence. The walk never special-cases advancement, so short months and
/// leap days fall out of the membership test alone.
pub fn generate_occurrences(
    master: &MasterAppointment,
    view_start: NaiveDate,
    view_end: NaiveDate,
) -> Vec<Occurrence> {
    let Some(rule) = &master.recurrence else {
        if master.date >= view_start && master.date <= view_end {
            return vec![occurrence_on(master, master.date, false)];
        }
        return Vec::new();
    };

    let walk_end = match rule.end_date {
        Some(rule_end) => rule_end.min(view_end),
        None => view_end,
    };

    let interval = i64::from(rule.interval.max(1));
    let mut occurrences = Vec::new();
    let mut day = master.date;
    let mut steps = 0u32;

    while day <= walk_end {
        if steps >= WALK_CEILING_DAYS {
            tracing::warn!(
                master = %master.id,
                "recurrence walk hit the iteration ceiling, truncating"
            );
            break;
        }
        steps += 1;

        if day >= view_start && rule_matches(rule, interval, master.date, day) {
            occurrences.push(occurrence_on(master, day, true));
        }

        day = add_days(day, 1);
    }

    occurrences
}

fn rule_matches(rule: &RecurrenceRule, interval: i64, anchor: NaiveDate, day: NaiveDate) -> bool {
    match rule.frequency {
        Frequency::Daily => days_between(anchor, day) % interval == 0,
        Frequency::Weekly => {
            let weeks = days_between(week_start(anchor), week_start(day)) / 7;
            if weeks < 0 || weeks % interval != 0 {
                return false;
            }
            if rule.days_of_week.is_empty() {
                // Producers are expected to select at least one weekday;
                // fall back to the anchor's weekday rather than matching
                // nothing forever.
                weekday_index(day) == weekday_index(anchor)
            } else {
                rule.days_of_week.contains(&weekday_index(day))
            }
        }
        Frequency::Monthly => {
            let months = i64::from(day.year() - anchor.year()) * 12
                + i64::from(day.month()) - i64::from(anchor.month());
            // Same day-of-month only: months without that day simply skip.
            months >= 0 && months % interval == 0 && day.day() == anchor.day()
        }
        Frequency::Yearly => {
            let years = i64::from(day.year() - anchor.year());
            years >= 0
                && years % interval == 0
                && day.month() == anchor.month()
                && day.day() == anchor.day()
        }
    }
}

fn occurrence_on(master: &MasterAppointment, date: NaiveDate, in_series: bool) -> Occurrence {
    let kind = if master.is_medicine() {
        OccurrenceKind::MedicineMaterialized
    } else if in_series {
        OccurrenceKind::Recurring
    } else {
        OccurrenceKind::Single
    };
    let id = if in_series {
        format!("{}_{}", master.id, date)
    } else {
        master.id.clone()
    };
    Occurrence {
        id,
        master_id: master.id.clone(),
        date,
        title: master.title.clone(),
        category: master.category,
        start_time: master.start_time.clone(),
        end_time: master.end_time.clone(),
        kind,
    }
}
