use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::agenda::{generate_occurrences, MasterAppointment, Occurrence, RecurrenceRule};
use crate::calendar::{parse_clock, view_range, ViewMode};
use crate::clock::{Clock, SystemClock};
use crate::medicine::{self, MedicineReminder};
use crate::notifications::{AlertSink, AppNotification};
use crate::scheduler;
use crate::store::{
    AppointmentStore, MedicineStore, MemoryAppointmentStore, MemoryMedicineStore,
    MemoryNotificationLog, MemoryShoppingStore, NotificationLog, ShoppingItem, ShoppingStore,
};

/// Everything a renderer needs for one view window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgendaSnapshot {
    pub occurrences: Vec<Occurrence>,
    pub unviewed: Vec<AppNotification>,
}

/// The assistant façade: owns the injected stores and clock, and carries
/// every read/write path so callers never touch a store directly.
pub struct AssistantService {
    appointments: Arc<dyn AppointmentStore>,
    medicines: Arc<dyn MedicineStore>,
    shopping: Arc<dyn ShoppingStore>,
    notifications: Arc<dyn NotificationLog>,
    clock: Arc<dyn Clock>,
    alert_sink: Option<Box<dyn AlertSink>>,
}

pub struct AssistantServiceBuilder {
    appointments: Option<Arc<dyn AppointmentStore>>,
    medicines: Option<Arc<dyn MedicineStore>>,
    shopping: Option<Arc<dyn ShoppingStore>>,
    notifications: Option<Arc<dyn NotificationLog>>,
    clock: Option<Arc<dyn Clock>>,
    alert_sink: Option<Box<dyn AlertSink>>,
}

impl AssistantServiceBuilder {
    pub fn new() -> Self {
        Self {
            appointments: None,
            medicines: None,
            shopping: None,
            notifications: None,
            clock: None,
            alert_sink: None,
        }
    }

    pub fn with_appointment_store(mut self, store: Arc<dyn AppointmentStore>) -> Self {
        self.appointments = Some(store);
        self
    }

    pub fn with_medicine_store(mut self, store: Arc<dyn MedicineStore>) -> Self {
        self.medicines = Some(store);
        self
    }

    pub fn with_shopping_store(mut self, store: Arc<dyn ShoppingStore>) -> Self {
        self.shopping = Some(store);
        self
    }

    pub fn with_notification_log(mut self, log: Arc<dyn NotificationLog>) -> Self {
        self.notifications = Some(log);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_alert_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn build(self) -> AssistantService {
        AssistantService {
            appointments: self
                .appointments
                .unwrap_or_else(|| Arc::new(MemoryAppointmentStore::new())),
            medicines: self
                .medicines
                .unwrap_or_else(|| Arc::new(MemoryMedicineStore::new())),
            shopping: self
                .shopping
                .unwrap_or_else(|| Arc::new(MemoryShoppingStore::new())),
            notifications: self
                .notifications
                .unwrap_or_else(|| Arc::new(MemoryNotificationLog::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            alert_sink: self.alert_sink,
        }
    }
}

impl Default for AssistantServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistantService {
    pub fn builder() -> AssistantServiceBuilder {
        AssistantServiceBuilder::new()
    }

    // ----- appointments -----

    pub fn add_appointment(&self, appointment: MasterAppointment) -> Result<()> {
        validate_appointment(&appointment)?;
        self.appointments.upsert(appointment);
        Ok(())
    }

    /// Replaces the whole master record; editing a single occurrence of a
    /// series is not supported.
    pub fn update_appointment(&self, appointment: MasterAppointment) -> Result<()> {
        validate_appointment(&appointment)?;
        self.appointments.upsert(appointment);
        Ok(())
    }

    pub fn delete_appointment(&self, id: &str) {
        self.appointments.delete_by_id(id);
    }

    pub fn appointment_by_id(&self, id: &str) -> Option<MasterAppointment> {
        self.appointments
            .list()
            .into_iter()
            .find(|appointment| appointment.id == id)
    }

    pub fn appointments(&self) -> Vec<MasterAppointment> {
        self.appointments.list()
    }

    // ----- medicine reminders -----

    pub fn add_medicine_reminder(&self, reminder: MedicineReminder) -> Result<()> {
        validate_medicine(&reminder)?;
        self.medicines.upsert(reminder.clone());
        self.regenerate_doses(&reminder);
        Ok(())
    }

    /// Retracts every previously materialized dose for this reminder before
    /// regenerating, so an edit leaves neither duplicates nor orphans.
    pub fn update_medicine_reminder(&self, reminder: MedicineReminder) -> Result<()> {
        validate_medicine(&reminder)?;
        self.medicines.upsert(reminder.clone());
        self.regenerate_doses(&reminder);
        Ok(())
    }

    pub fn delete_medicine_reminder(&self, id: &str) {
        self.medicines.delete_by_id(id);
        self.retract_doses(id);
    }

    pub fn medicine_reminders(&self) -> Vec<MedicineReminder> {
        self.medicines.list()
    }

    fn regenerate_doses(&self, reminder: &MedicineReminder) {
        self.retract_doses(&reminder.id);
        for dose in medicine::materialize(reminder) {
            self.appointments.upsert(dose);
        }
    }

    fn retract_doses(&self, reminder_id: &str) {
        for appointment in self.appointments.list() {
            if let crate::agenda::AppointmentSource::Medicine { reminder_id: source } =
                &appointment.source
            {
                if source == reminder_id {
                    self.appointments.delete_by_id(&appointment.id);
                }
            }
        }
    }

    // ----- shopping list -----

    pub fn add_shopping_item(&self, item: ShoppingItem) -> Result<()> {
        if item.text.trim().is_empty() {
            return Err(anyhow!("shopping item text is empty"));
        }
        self.shopping.upsert(item);
        Ok(())
    }

    pub fn rename_shopping_item(&self, id: &str, text: &str) -> Result<()> {
        let mut item = self
            .shopping_item(id)
            .ok_or_else(|| anyhow!("unknown shopping item `{id}`"))?;
        item.text = text.trim().to_string();
        self.shopping.upsert(item);
        Ok(())
    }

    pub fn toggle_shopping_item(&self, id: &str) -> Result<()> {
        let mut item = self
            .shopping_item(id)
            .ok_or_else(|| anyhow!("unknown shopping item `{id}`"))?;
        item.completed = !item.completed;
        self.shopping.upsert(item);
        Ok(())
    }

    pub fn delete_shopping_item(&self, id: &str) {
        self.shopping.delete_by_id(id);
    }

    pub fn clear_completed_shopping_items(&self) {
        for item in self.shopping.list() {
            if item.completed {
                self.shopping.delete_by_id(&item.id);
            }
        }
    }

    pub fn shopping_items(&self) -> Vec<ShoppingItem> {
        self.shopping.list()
    }

    fn shopping_item(&self, id: &str) -> Option<ShoppingItem> {
        self.shopping.list().into_iter().find(|item| item.id == id)
    }

    // ----- views -----

    /// All occurrences inside the window a `(anchor, mode)` view requests:
    /// appointment expansions merged with continuous medicine doses,
    /// deduplicated by instance id, sorted.
    pub fn occurrences(&self, anchor: NaiveDate, mode: ViewMode) -> Vec<Occurrence> {
        let (view_start, view_end) = view_range(anchor, mode);
        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for master in self.appointments.list() {
            for occurrence in generate_occurrences(&master, view_start, view_end) {
                if seen.insert(occurrence.id.clone()) {
                    merged.push(occurrence);
                }
            }
        }
        for reminder in self.medicines.list() {
            for dose in medicine::continuous_doses(&reminder, view_start, view_end) {
                if seen.insert(dose.id.clone()) {
                    merged.push(dose);
                }
            }
        }

        merged.sort();
        merged
    }

    pub fn agenda_snapshot(&self, anchor: NaiveDate, mode: ViewMode) -> AgendaSnapshot {
        AgendaSnapshot {
            occurrences: self.occurrences(anchor, mode),
            unviewed: self.unviewed_notifications(),
        }
    }

    // ----- notifications -----

    /// One poll tick: collect newly due appointment and medicine
    /// notifications, dedup against the persisted log, append, and play the
    /// audible alert at most once if anything landed while the host is
    /// visible. Returns the appended notifications.
    pub fn poll_reminders(&self) -> Vec<AppNotification> {
        let now = self.clock.now();
        let existing: HashSet<String> = self
            .notifications
            .list()
            .into_iter()
            .map(|notification| notification.id)
            .collect();

        let mut due =
            scheduler::appointment_reminders(&self.appointments.list(), &existing, now);
        due.extend(scheduler::medicine_reminders(
            &self.medicines.list(),
            &existing,
            now,
        ));

        // The due check ran against a snapshot; re-check the log and the
        // batch itself before appending.
        let persisted: HashSet<String> = self
            .notifications
            .list()
            .into_iter()
            .map(|notification| notification.id)
            .collect();
        let mut batch = HashSet::new();
        due.retain(|notification| {
            !persisted.contains(&notification.id) && batch.insert(notification.id.clone())
        });

        if !due.is_empty() {
            tracing::info!(count = due.len(), "new reminders due");
            self.notifications.append(due.clone());
            if let Some(sink) = &self.alert_sink {
                if sink.foreground() {
                    sink.play_alert();
                }
            }
        }
        due
    }

    pub fn notifications(&self) -> Vec<AppNotification> {
        self.notifications.list()
    }

    pub fn unviewed_notifications(&self) -> Vec<AppNotification> {
        self.notifications
            .list()
            .into_iter()
            .filter(|notification| !notification.viewed)
            .collect()
    }

    pub fn mark_notification_viewed(&self, id: &str) {
        self.notifications.mark_viewed(id);
    }

    pub fn mark_all_notifications_viewed(&self) {
        self.notifications.mark_all_viewed();
    }
}

fn validate_appointment(appointment: &MasterAppointment) -> Result<()> {
    if appointment.id.trim().is_empty() {
        return Err(anyhow!("appointment id is empty"));
    }
    if appointment.title.trim().is_empty() {
        return Err(anyhow!("appointment title is empty"));
    }
    parse_clock(&appointment.start_time)?;
    parse_clock(&appointment.end_time)?;
    if let Some(rule) = &appointment.recurrence {
        validate_rule(rule)?;
    }
    Ok(())
}

fn validate_rule(rule: &RecurrenceRule) -> Result<()> {
    if matches!(rule.frequency, crate::agenda::Frequency::Weekly) && rule.days_of_week.is_empty() {
        return Err(anyhow!("weekly rule needs at least one selected weekday"));
    }
    if let Some(&day) = rule.days_of_week.iter().find(|&&day| day > 6) {
        return Err(anyhow!("weekday index {day} out of range 0..=6"));
    }
    Ok(())
}

fn validate_medicine(reminder: &MedicineReminder) -> Result<()> {
    if reminder.id.trim().is_empty() {
        return Err(anyhow!("medicine reminder id is empty"));
    }
    if reminder.name.trim().is_empty() {
        return Err(anyhow!("medicine reminder name is empty"));
    }
    if reminder.times.is_empty() {
        return Err(anyhow!("medicine reminder has no dose times"));
    }
    for time in &reminder.times {
        parse_clock(time)?;
    }
    Ok(())
}
