use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lembra_domain::agenda::MasterAppointment;
use lembra_domain::medicine::MedicineReminder;
use lembra_domain::notifications::AppNotification;
use lembra_domain::store::{
    MemoryAppointmentStore, MemoryMedicineStore, MemoryNotificationLog, MemoryShoppingStore,
    ShoppingItem,
};
use lembra_domain::{AssistantService, AssistantServiceBuilder};

/// The whole persisted application state, one JSON document with the same
/// fixed keys the records have always been stored under.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub appointments: Vec<MasterAppointment>,
    #[serde(rename = "medicineReminders", default)]
    pub medicine_reminders: Vec<MedicineReminder>,
    #[serde(rename = "shoppingListItems", default)]
    pub shopping_items: Vec<ShoppingItem>,
    #[serde(default)]
    pub notifications: Vec<AppNotification>,
}

impl AppState {
    /// A missing file is an empty state, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)
            .with_context(|| format!("writing state file {}", path.display()))?;
        Ok(())
    }

    /// Seed a service builder with in-memory stores holding this state.
    pub fn seed(self, builder: AssistantServiceBuilder) -> AssistantServiceBuilder {
        builder
            .with_appointment_store(Arc::new(MemoryAppointmentStore::with_items(
                self.appointments,
            )))
            .with_medicine_store(Arc::new(MemoryMedicineStore::with_items(
                self.medicine_reminders,
            )))
            .with_shopping_store(Arc::new(MemoryShoppingStore::with_items(
                self.shopping_items,
            )))
            .with_notification_log(Arc::new(MemoryNotificationLog::with_items(
                self.notifications,
            )))
    }

    /// Snapshot the service's stores back into a serializable state.
    pub fn snapshot(service: &AssistantService) -> Self {
        Self {
            appointments: service.appointments(),
            medicine_reminders: service.medicine_reminders(),
            shopping_items: service.shopping_items(),
            notifications: service.notifications(),
        }
    }
}
