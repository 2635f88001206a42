use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::agenda::{
    AppointmentSource, Category, MasterAppointment, Occurrence, OccurrenceKind,
};
use crate::calendar::{add_days, clock_slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoseFrequency {
    Daily,
    /// Accepted as data, expands to nothing; the stride semantics are not
    /// defined yet.
    EveryXDays,
    /// Accepted as data, expands to nothing, same as `EveryXDays`.
    SpecificDays,
}

/// A medicine dosing schedule. Independent of appointments, but its doses
/// interleave with appointment occurrences in every view and in the
/// notification scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineReminder {
    pub id: String,
    pub name: String,
    pub dosage: String,
    /// Clock times (`HH:MM`), one dose instance per listed time per active
    /// day.
    pub times: Vec<String>,
    pub frequency: DoseFrequency,
    #[serde(default)]
    pub every_x_days: Option<u32>,
    #[serde(default)]
    pub specific_days: Vec<u8>,
    pub start_date: NaiveDate,
    /// Absent + daily = continuous: expanded on demand, never persisted.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl MedicineReminder {
    pub fn is_continuous(&self) -> bool {
        matches!(self.frequency, DoseFrequency::Daily) && self.end_date.is_none()
    }

    /// Whether any dose is scheduled for `day`.
    pub fn active_on(&self, day: NaiveDate) -> bool {
        if day < self.start_date {
            return false;
        }
        match self.frequency {
            DoseFrequency::Daily => self.end_date.map_or(true, |end| day <= end),
            DoseFrequency::EveryXDays | DoseFrequency::SpecificDays => false,
        }
    }

    pub fn dose_title(&self) -> String {
        format!("{} ({})", self.name, self.dosage)
    }
}

/// Upper bound on bulk materialization, counted in dose instances across
/// all days and times. Hitting it truncates the batch.
pub const MATERIALIZE_CAP: usize = 1000;

/// Bulk path: expand a bounded reminder into persisted appointment records,
/// one per listed time per day from `start_date` through `end_date`.
///
/// Continuous reminders (daily, no end date) return nothing here; they are
/// expanded per view window by [`continuous_doses`]. Re-running this after
/// an edit requires the caller to retract the previous batch first.
pub fn materialize(reminder: &MedicineReminder) -> Vec<MasterAppointment> {
    let Some(end) = reminder.end_date else {
        return Vec::new();
    };

    match reminder.frequency {
        DoseFrequency::Daily => {}
        DoseFrequency::EveryXDays | DoseFrequency::SpecificDays => {
            tracing::debug!(
                reminder = %reminder.id,
                frequency = ?reminder.frequency,
                "dose frequency not supported yet, nothing materialized"
            );
            return Vec::new();
        }
    }

    let mut generated = Vec::new();
    let mut day = reminder.start_date;
    while day <= end {
        for time in &reminder.times {
            if generated.len() >= MATERIALIZE_CAP {
                tracing::warn!(
                    reminder = %reminder.id,
                    cap = MATERIALIZE_CAP,
                    "dose materialization hit the instance cap, truncating"
                );
                return generated;
            }
            generated.push(MasterAppointment {
                id: format!("med-{}-{}-{}", reminder.id, day, clock_slot(time)),
                title: reminder.dose_title(),
                category: Category::Medicine,
                date: day,
                start_time: time.clone(),
                end_time: time.clone(),
                location: None,
                notes: Some(format!(
                    "Take {}, dosage: {}.",
                    reminder.name, reminder.dosage
                )),
                recurrence: None,
                source: AppointmentSource::Medicine {
                    reminder_id: reminder.id.clone(),
                },
            });
        }
        day = add_days(day, 1);
    }
    generated
}

/// On-demand path: dose occurrences of a continuous reminder inside the
/// inclusive `[view_start, view_end]` window. The `med-cont-` id prefix
/// keeps these distinct from bulk-materialized instances so merging
/// consumers can dedup by id.
pub fn continuous_doses(
    reminder: &MedicineReminder,
    view_start: NaiveDate,
    view_end: NaiveDate,
) -> Vec<Occurrence> {
    if !reminder.is_continuous() {
        return Vec::new();
    }

    let mut doses = Vec::new();
    let mut day = view_start.max(reminder.start_date);
    while day <= view_end {
        for time in &reminder.times {
            doses.push(Occurrence {
                id: format!("med-cont-{}-{}-{}", reminder.id, day, clock_slot(time)),
                master_id: reminder.id.clone(),
                date: day,
                title: reminder.dose_title(),
                category: Category::Medicine,
                start_time: time.clone(),
                end_time: time.clone(),
                kind: OccurrenceKind::MedicineContinuous,
            });
        }
        day = add_days(day, 1);
    }
    doses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reminder(times: &[&str], end_date: Option<NaiveDate>) -> MedicineReminder {
        MedicineReminder {
            id: "med-1".to_string(),
            name: "Amoxicillin".to_string(),
            dosage: "500mg".to_string(),
            times: times.iter().map(|t| t.to_string()).collect(),
            frequency: DoseFrequency::Daily,
            every_x_days: None,
            specific_days: Vec::new(),
            start_date: date(2024, 1, 1),
            end_date,
        }
    }

    #[test]
    fn continuous_reminder_is_never_materialized() {
        let continuous = reminder(&["08:00", "20:00"], None);
        assert!(continuous.is_continuous());
        assert!(materialize(&continuous).is_empty());
    }

    #[test]
    fn continuous_doses_cover_each_window_day_per_time() {
        let continuous = reminder(&["08:00", "20:00"], None);
        let doses = continuous_doses(&continuous, date(2024, 1, 5), date(2024, 1, 5));
        assert_eq!(doses.len(), 2);
        assert_eq!(doses[0].id, "med-cont-med-1-2024-01-05-0800");
        assert_eq!(doses[1].id, "med-cont-med-1-2024-01-05-2000");
        assert_eq!(doses[0].kind, OccurrenceKind::MedicineContinuous);

        let week = continuous_doses(&continuous, date(2024, 1, 1), date(2024, 1, 7));
        assert_eq!(week.len(), 14);
    }

    #[test]
    fn continuous_doses_start_no_earlier_than_start_date() {
        let mut continuous = reminder(&["08:00"], None);
        continuous.start_date = date(2024, 1, 4);
        let doses = continuous_doses(&continuous, date(2024, 1, 1), date(2024, 1, 7));
        assert_eq!(doses.len(), 4);
        assert_eq!(doses[0].date, date(2024, 1, 4));
    }

    #[test]
    fn bounded_reminder_materializes_day_times_instances() {
        let bounded = reminder(&["08:00", "20:00"], Some(date(2024, 1, 7)));
        let generated = materialize(&bounded);
        assert_eq!(generated.len(), 14);
        assert_eq!(generated[0].id, "med-med-1-2024-01-01-0800");
        assert!(generated.iter().all(|a| matches!(
            a.source,
            AppointmentSource::Medicine { ref reminder_id } if reminder_id == "med-1"
        )));
        assert!(generated.iter().all(|a| a.recurrence.is_none()));
    }

    #[test]
    fn materialization_truncates_at_the_cap() {
        // Two years of three daily doses would be ~2200 instances.
        let bounded = reminder(&["08:00", "14:00", "20:00"], Some(date(2025, 12, 31)));
        let generated = materialize(&bounded);
        assert_eq!(generated.len(), MATERIALIZE_CAP);
    }

    #[test]
    fn inverted_range_materializes_nothing() {
        let mut bounded = reminder(&["08:00"], Some(date(2023, 12, 1)));
        bounded.start_date = date(2024, 1, 1);
        assert!(materialize(&bounded).is_empty());
    }

    #[test]
    fn unsupported_frequencies_expand_to_nothing() {
        let mut every_other = reminder(&["08:00"], Some(date(2024, 1, 7)));
        every_other.frequency = DoseFrequency::EveryXDays;
        every_other.every_x_days = Some(2);
        assert!(materialize(&every_other).is_empty());
        assert!(continuous_doses(&every_other, date(2024, 1, 1), date(2024, 1, 7)).is_empty());
        assert!(!every_other.active_on(date(2024, 1, 3)));
    }

    #[test]
    fn active_on_respects_start_and_end_bounds() {
        let bounded = reminder(&["08:00"], Some(date(2024, 1, 10)));
        assert!(!bounded.active_on(date(2023, 12, 31)));
        assert!(bounded.active_on(date(2024, 1, 1)));
        assert!(bounded.active_on(date(2024, 1, 10)));
        assert!(!bounded.active_on(date(2024, 1, 11)));

        let continuous = reminder(&["08:00"], None);
        assert!(continuous.active_on(date(2030, 6, 1)));
    }
}
