use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::agenda::MasterAppointment;
use crate::medicine::MedicineReminder;
use crate::notifications::AppNotification;

/// A shopping list entry. Plain keyed data; no recurrence, no temporal
/// logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Keyed persistence contract for master appointments. The core only
/// assumes list-in/list-out semantics; the actual storage mechanism lives
/// with the caller.
pub trait AppointmentStore: Send + Sync {
    fn list(&self) -> Vec<MasterAppointment>;
    fn upsert(&self, appointment: MasterAppointment);
    /// Removes the record with `id`. Occurrences are never persisted, so
    /// there are no stored back-references to chase today.
    fn delete_by_id(&self, id: &str);
}

pub trait MedicineStore: Send + Sync {
    fn list(&self) -> Vec<MedicineReminder>;
    fn upsert(&self, reminder: MedicineReminder);
    fn delete_by_id(&self, id: &str);
}

pub trait ShoppingStore: Send + Sync {
    fn list(&self) -> Vec<ShoppingItem>;
    fn upsert(&self, item: ShoppingItem);
    fn delete_by_id(&self, id: &str);
}

/// The persisted notification log. Dedup by id is the scheduler's
/// responsibility; keeping the list ordered newest-trigger-first is the
/// log's.
pub trait NotificationLog: Send + Sync {
    fn list(&self) -> Vec<AppNotification>;
    fn append(&self, notifications: Vec<AppNotification>);
    fn mark_viewed(&self, id: &str);
    fn mark_all_viewed(&self);
}

#[derive(Default)]
pub struct MemoryAppointmentStore {
    items: RwLock<Vec<MasterAppointment>>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<MasterAppointment>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

impl AppointmentStore for MemoryAppointmentStore {
    fn list(&self) -> Vec<MasterAppointment> {
        self.items.read().clone()
    }

    fn upsert(&self, appointment: MasterAppointment) {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == appointment.id) {
            Some(existing) => *existing = appointment,
            None => items.push(appointment),
        }
    }

    fn delete_by_id(&self, id: &str) {
        self.items.write().retain(|item| item.id != id);
    }
}

#[derive(Default)]
pub struct MemoryMedicineStore {
    items: RwLock<Vec<MedicineReminder>>,
}

impl MemoryMedicineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<MedicineReminder>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

impl MedicineStore for MemoryMedicineStore {
    fn list(&self) -> Vec<MedicineReminder> {
        self.items.read().clone()
    }

    fn upsert(&self, reminder: MedicineReminder) {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == reminder.id) {
            Some(existing) => *existing = reminder,
            None => items.push(reminder),
        }
    }

    fn delete_by_id(&self, id: &str) {
        self.items.write().retain(|item| item.id != id);
    }
}

#[derive(Default)]
pub struct MemoryShoppingStore {
    items: RwLock<Vec<ShoppingItem>>,
}

impl MemoryShoppingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ShoppingItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

impl ShoppingStore for MemoryShoppingStore {
    fn list(&self) -> Vec<ShoppingItem> {
        self.items.read().clone()
    }

    fn upsert(&self, item: ShoppingItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    fn delete_by_id(&self, id: &str) {
        self.items.write().retain(|item| item.id != id);
    }
}

#[derive(Default)]
pub struct MemoryNotificationLog {
    items: RwLock<Vec<AppNotification>>,
}

impl MemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<AppNotification>) -> Self {
        let log = Self {
            items: RwLock::new(items),
        };
        log.items
            .write()
            .sort_by(|a, b| b.trigger_at.cmp(&a.trigger_at));
        log
    }
}

impl NotificationLog for MemoryNotificationLog {
    fn list(&self) -> Vec<AppNotification> {
        self.items.read().clone()
    }

    fn append(&self, notifications: Vec<AppNotification>) {
        let mut items = self.items.write();
        items.extend(notifications);
        items.sort_by(|a, b| b.trigger_at.cmp(&a.trigger_at));
    }

    fn mark_viewed(&self, id: &str) {
        let mut items = self.items.write();
        if let Some(notification) = items.iter_mut().find(|item| item.id == id) {
            notification.viewed = true;
        }
    }

    fn mark_all_viewed(&self) {
        for notification in self.items.write().iter_mut() {
            notification.viewed = true;
        }
    }
}
