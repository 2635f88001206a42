use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use lembra_domain::notifications::AlertSink;
use lembra_domain::AssistantService;

use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) state_file: PathBuf,
    pub(crate) poll_secs: u64,
    pub(crate) run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("LEMBRA_STATE_FILE") {
            if !path.trim().is_empty() {
                config.state_file = PathBuf::from(path);
            }
        }
        if let Ok(secs) = std::env::var("LEMBRA_POLL_SECS") {
            if let Ok(value) = secs.trim().parse::<u64>() {
                if value > 0 {
                    config.poll_secs = value;
                }
            }
        }
        if std::env::var("LEMBRA_ONCE").is_ok() {
            config.run_once = true;
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("lembra.json"),
            poll_secs: 60,
            run_once: false,
        }
    }
}

/// Rings the terminal bell for new reminders. A stand-in for a platform
/// audio adapter; a headless process counts as foreground.
struct TerminalAlert;

impl AlertSink for TerminalAlert {
    fn foreground(&self) -> bool {
        true
    }

    fn play_alert(&self) {
        print!("\x07");
        let _ = std::io::stdout().flush();
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    info!(state_file = %config.state_file.display(), poll_secs = config.poll_secs, "starting");

    let state = AppState::load(&config.state_file)?;
    let service = state
        .seed(AssistantService::builder())
        .with_alert_sink(Box::new(TerminalAlert))
        .build();

    loop {
        poll_and_persist(&service, &config)?;
        if config.run_once {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(config.poll_secs));
    }
}

fn poll_and_persist(service: &AssistantService, config: &AppConfig) -> Result<()> {
    let fired = service.poll_reminders();
    for notification in &fired {
        info!(id = %notification.id, title = %notification.title, "reminder fired");
    }
    if !fired.is_empty() {
        AppState::snapshot(service).save(&config.state_file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lembra_domain::agenda::{AppointmentSource, Category, MasterAppointment};

    #[test]
    fn default_config_polls_every_minute() {
        let config = AppConfig::default();
        assert_eq!(config.poll_secs, 60);
        assert_eq!(config.state_file, PathBuf::from("lembra.json"));
        assert!(!config.run_once);
    }

    #[test]
    fn empty_poll_leaves_the_state_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let mut state = AppState::default();
        state.appointments.push(MasterAppointment {
            id: "a1".to_string(),
            title: "Dentist".to_string(),
            category: Category::Dentist,
            // Far in the past, so a real-clock poll never fires for it.
            date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            start_time: "14:00".to_string(),
            end_time: "15:00".to_string(),
            location: None,
            notes: None,
            recurrence: None,
            source: AppointmentSource::Manual,
        });
        state.save(&path).expect("save seed state");

        let service = AppState::load(&path)
            .expect("load state")
            .seed(AssistantService::builder())
            .build();
        let config = AppConfig {
            state_file: path.clone(),
            poll_secs: 60,
            run_once: true,
        };

        poll_and_persist(&service, &config).expect("poll");
        // Nothing fired for a year-2000 appointment, so the seed file is
        // untouched and still loads.
        let reloaded = AppState::load(&path).expect("reload state");
        assert_eq!(reloaded.appointments.len(), 1);
        assert!(reloaded.notifications.is_empty());
    }
}
