use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::agenda::{generate_occurrences, Category, MasterAppointment};
use crate::calendar::{add_days, clock_slot, parse_clock, ClockParseError};
use crate::medicine::MedicineReminder;
use crate::notifications::AppNotification;

/// Appointment pre-day reminders fire once "now" has passed this hour of
/// the day before the occurrence.
pub const PRE_DAY_REMINDER_HOUR: u32 = 9;

/// A dose reminder stays due for this long past its scheduled instant;
/// after that it is stale and never fires.
pub const DOSE_WINDOW_MINUTES: i64 = 5;

fn pre_day_trigger(now: NaiveDateTime) -> NaiveDateTime {
    now.date()
        .and_time(NaiveTime::from_hms_opt(PRE_DAY_REMINDER_HOUR, 0, 0).unwrap())
}

/// Pre-day appointment reminders: for every occurrence falling on tomorrow,
/// a notification becomes due once `now` has passed today 09:00. The dedup
/// key `app-{master}-{date}-pre` names the logical (appointment, day)
/// instant; keys already in `existing` are skipped.
pub fn appointment_reminders(
    appointments: &[MasterAppointment],
    existing: &HashSet<String>,
    now: NaiveDateTime,
) -> Vec<AppNotification> {
    let trigger = pre_day_trigger(now);
    if now < trigger {
        return Vec::new();
    }

    let tomorrow = add_days(now.date(), 1);
    let mut due = Vec::new();

    for master in appointments {
        // Materialized doses notify through the medicine path.
        if master.is_medicine() {
            continue;
        }
        for occurrence in generate_occurrences(master, tomorrow, tomorrow) {
            let key = format!("app-{}-{}-pre", occurrence.master_id, occurrence.date);
            if existing.contains(&key) {
                continue;
            }
            due.push(AppNotification {
                id: key,
                source_id: occurrence.master_id.clone(),
                title: format!("Reminder for tomorrow: {}", occurrence.title),
                message: format!("{} at {}", occurrence.title, occurrence.start_time),
                category: occurrence.category,
                trigger_at: trigger,
                viewed: false,
            });
        }
    }

    due
}

/// Same-day medicine dose reminders: each listed time of a reminder active
/// today is due while `now` sits inside `[dose, dose + 5min)`. One record
/// with a malformed time must not starve the rest, so each candidate is
/// evaluated independently and failures are logged and skipped.
pub fn medicine_reminders(
    reminders: &[MedicineReminder],
    existing: &HashSet<String>,
    now: NaiveDateTime,
) -> Vec<AppNotification> {
    let today = now.date();
    let mut due = Vec::new();

    for reminder in reminders {
        if !reminder.active_on(today) {
            continue;
        }
        for time in &reminder.times {
            match dose_notification(reminder, time, existing, now) {
                Ok(Some(notification)) => due.push(notification),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        reminder = %reminder.id,
                        time = %time,
                        %err,
                        "skipping dose with unparseable time"
                    );
                }
            }
        }
    }

    due
}

fn dose_notification(
    reminder: &MedicineReminder,
    time: &str,
    existing: &HashSet<String>,
    now: NaiveDateTime,
) -> Result<Option<AppNotification>, ClockParseError> {
    let dose_at = now.date().and_time(parse_clock(time)?);
    if now < dose_at || now >= dose_at + Duration::minutes(DOSE_WINDOW_MINUTES) {
        return Ok(None);
    }

    let key = format!("med-{}-{}-{}", reminder.id, now.date(), clock_slot(time));
    if existing.contains(&key) {
        return Ok(None);
    }

    Ok(Some(AppNotification {
        id: key,
        source_id: reminder.id.clone(),
        title: format!("Medicine time: {}", reminder.name),
        message: format!("Take {} of {}", reminder.dosage, reminder.name),
        category: Category::Medicine,
        trigger_at: dose_at,
        viewed: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::{AppointmentSource, Frequency, RecurrenceRule};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn appointment(date: &str) -> MasterAppointment {
        MasterAppointment {
            id: "appt-1".to_string(),
            title: "Dentist".to_string(),
            category: Category::Dentist,
            date: date.parse().expect("valid date"),
            start_time: "14:00".to_string(),
            end_time: "15:00".to_string(),
            location: None,
            notes: None,
            recurrence: None,
            source: AppointmentSource::Manual,
        }
    }

    fn med(times: &[&str]) -> MedicineReminder {
        MedicineReminder {
            id: "med-1".to_string(),
            name: "Ibuprofen".to_string(),
            dosage: "200mg".to_string(),
            times: times.iter().map(|t| t.to_string()).collect(),
            frequency: crate::medicine::DoseFrequency::Daily,
            every_x_days: None,
            specific_days: Vec::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
        }
    }

    #[test]
    fn pre_day_reminder_fires_after_nine_with_nine_oclock_trigger() {
        let appointments = vec![appointment("2024-03-10")];
        let due = appointment_reminders(&appointments, &HashSet::new(), at(2024, 3, 9, 9, 0, 1));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "app-appt-1-2024-03-10-pre");
        assert_eq!(due[0].trigger_at, at(2024, 3, 9, 9, 0, 0));
        assert!(due[0].message.contains("14:00"));
    }

    #[test]
    fn pre_day_reminder_waits_for_nine_oclock() {
        let appointments = vec![appointment("2024-03-10")];
        let due = appointment_reminders(&appointments, &HashSet::new(), at(2024, 3, 9, 8, 59, 59));
        assert!(due.is_empty());
    }

    #[test]
    fn pre_day_reminder_ignores_appointments_not_tomorrow() {
        let appointments = vec![appointment("2024-03-12")];
        let due = appointment_reminders(&appointments, &HashSet::new(), at(2024, 3, 9, 10, 0, 0));
        assert!(due.is_empty());
    }

    #[test]
    fn pre_day_reminder_covers_recurring_occurrences() {
        let mut weekly = appointment("2024-01-01"); // a Monday
        weekly.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            end_date: None,
            days_of_week: vec![1],
        });
        // 2024-03-04 is a Monday; checking on Sunday the 3rd.
        let due = appointment_reminders(&[weekly], &HashSet::new(), at(2024, 3, 3, 9, 30, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "app-appt-1-2024-03-04-pre");
    }

    #[test]
    fn pre_day_reminder_dedups_against_existing_keys() {
        let appointments = vec![appointment("2024-03-10")];
        let existing: HashSet<String> = ["app-appt-1-2024-03-10-pre".to_string()].into();
        let due = appointment_reminders(&appointments, &existing, at(2024, 3, 9, 9, 0, 1));
        assert!(due.is_empty());
    }

    #[test]
    fn pre_day_reminder_skips_materialized_doses() {
        let mut dose = appointment("2024-03-10");
        dose.source = AppointmentSource::Medicine {
            reminder_id: "med-1".to_string(),
        };
        let due = appointment_reminders(&[dose], &HashSet::new(), at(2024, 3, 9, 10, 0, 0));
        assert!(due.is_empty());
    }

    #[test]
    fn dose_fires_inside_the_five_minute_window() {
        let reminders = vec![med(&["08:00"])];

        let before = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 7, 59, 59));
        assert!(before.is_empty());

        let on_time = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 8, 0, 0));
        assert_eq!(on_time.len(), 1);
        assert_eq!(on_time[0].id, "med-med-1-2024-01-05-0800");
        assert_eq!(on_time[0].trigger_at, at(2024, 1, 5, 8, 0, 0));

        let late = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 8, 4, 59));
        assert_eq!(late.len(), 1);

        let too_late = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 8, 5, 0));
        assert!(too_late.is_empty());
    }

    #[test]
    fn dose_dedups_against_existing_keys() {
        let reminders = vec![med(&["08:00"])];
        let existing: HashSet<String> = ["med-med-1-2024-01-05-0800".to_string()].into();
        let due = medicine_reminders(&reminders, &existing, at(2024, 1, 5, 8, 1, 0));
        assert!(due.is_empty());
    }

    #[test]
    fn dose_before_start_date_never_fires() {
        let reminders = vec![med(&["08:00"])];
        let due = medicine_reminders(&reminders, &HashSet::new(), at(2023, 12, 31, 8, 1, 0));
        assert!(due.is_empty());
    }

    #[test]
    fn malformed_dose_time_is_skipped_without_starving_the_rest() {
        let reminders = vec![med(&["bogus", "08:00"])];
        let due = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 8, 1, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "med-med-1-2024-01-05-0800");
    }

    #[test]
    fn each_listed_time_fires_independently() {
        let reminders = vec![med(&["08:00", "20:00"])];
        let morning = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 8, 2, 0));
        assert_eq!(morning.len(), 1);
        let evening = medicine_reminders(&reminders, &HashSet::new(), at(2024, 1, 5, 20, 2, 0));
        assert_eq!(evening.len(), 1);
        assert_ne!(morning[0].id, evening[0].id);
    }
}
