//! The repository facade: authoritative in-memory collections for
//! medications, schedules, intakes and reminders, persisted as one JSON
//! blob each, plus the reminder/intake reconciliation logic built on top.
//!
//! All mutation funnels through this type. Consumers read current
//! snapshots or subscribe to a collection's watch channel; they never
//! touch storage directly.

mod collection;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::domains::medication::{
    Medication, MedicationIntake, MedicationReminder, MedicationSchedule,
};
use crate::error::Result;
use crate::interfaces::platform::Platform;
use crate::interfaces::storage::FileStorage;
use crate::schedule;
use collection::{next_id, Collection};

pub const MEDICATIONS_FILE: &str = "medications.json";
pub const SCHEDULES_FILE: &str = "medication_schedules.json";
pub const INTAKES_FILE: &str = "medication_intakes.json";
pub const REMINDERS_FILE: &str = "medication_reminders.json";

pub struct MedicationRepository {
    medications: Collection<Medication>,
    schedules: Collection<MedicationSchedule>,
    intakes: Collection<MedicationIntake>,
    reminders: Collection<MedicationReminder>,
    platform: Arc<dyn Platform>,
}

impl MedicationRepository {
    /// Builds the repository over the given storage and loads all four
    /// collections. Unreadable blobs load as empty collections.
    pub async fn new(storage: Arc<dyn FileStorage>, platform: Arc<dyn Platform>) -> Self {
        let repo = Self {
            medications: Collection::new(MEDICATIONS_FILE, storage.clone()),
            schedules: Collection::new(SCHEDULES_FILE, storage.clone()),
            intakes: Collection::new(INTAKES_FILE, storage.clone()),
            reminders: Collection::new(REMINDERS_FILE, storage),
            platform,
        };
        repo.medications.load().await;
        repo.schedules.load().await;
        repo.intakes.load().await;
        repo.reminders.load().await;
        repo
    }

    // ===== Medications =====

    /// All medications, sorted by their earliest schedule time; medications
    /// without a schedule sort last.
    pub fn get_all_medications(&self) -> Vec<Medication> {
        let schedules = self.schedules.snapshot();
        let mut medications = self.medications.snapshot();
        medications.sort_by_key(|medication| {
            schedules
                .iter()
                .filter(|s| s.medication_id == medication.id)
                .map(|s| s.time.clone())
                .min()
                .unwrap_or_else(|| schedule::NO_SCHEDULE_SORT_KEY.to_string())
        });
        medications
    }

    pub fn subscribe_medications(&self) -> watch::Receiver<Vec<Medication>> {
        self.medications.subscribe()
    }

    pub fn get_medication_by_id(&self, id: i64) -> Option<Medication> {
        self.medications.snapshot().into_iter().find(|m| m.id == id)
    }

    pub async fn insert_medication(&self, name: &str, description: Option<&str>) -> Result<i64> {
        let now = schedule::now_ts();
        let name = name.to_string();
        let description = description.map(str::to_string);
        self.medications
            .mutate(move |records| {
                let id = next_id(records.iter().map(|m| m.id));
                records.push(Medication {
                    id,
                    name,
                    description,
                    created_at: now,
                    updated_at: now,
                });
                id
            })
            .await
    }

    pub async fn update_medication(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let now = schedule::now_ts();
        let name = name.to_string();
        let description = description.map(str::to_string);
        self.medications
            .mutate(move |records| {
                for medication in records.iter_mut().filter(|m| m.id == id) {
                    medication.name = name.clone();
                    medication.description = description.clone();
                    medication.updated_at = now;
                }
            })
            .await
    }

    /// Deletes a medication and cascades to its schedules and intakes.
    /// Three independent collection mutations; there is no cross-collection
    /// transaction.
    pub async fn delete_medication(&self, id: i64) -> Result<()> {
        self.medications
            .mutate(move |records| records.retain(|m| m.id != id))
            .await?;
        self.schedules
            .mutate(move |records| records.retain(|s| s.medication_id != id))
            .await?;
        self.intakes
            .mutate(move |records| records.retain(|i| i.medication_id != id))
            .await?;
        Ok(())
    }

    // ===== Schedules =====

    /// All schedules sorted by time; "HH:MM" strings sort correctly as text.
    pub fn get_all_schedules(&self) -> Vec<MedicationSchedule> {
        let mut schedules = self.schedules.snapshot();
        schedules.sort_by(|a, b| a.time.cmp(&b.time));
        schedules
    }

    pub fn subscribe_schedules(&self) -> watch::Receiver<Vec<MedicationSchedule>> {
        self.schedules.subscribe()
    }

    pub fn get_schedules_for_medication(&self, medication_id: i64) -> Vec<MedicationSchedule> {
        let mut schedules: Vec<_> = self
            .schedules
            .snapshot()
            .into_iter()
            .filter(|s| s.medication_id == medication_id)
            .collect();
        schedules.sort_by(|a, b| a.time.cmp(&b.time));
        schedules
    }

    pub fn get_schedule_by_id(&self, id: i64) -> Option<MedicationSchedule> {
        self.schedules.snapshot().into_iter().find(|s| s.id == id)
    }

    /// Inserts a schedule, then creates today's reminder if today is one of
    /// its weekdays and registers the platform notification. Reminders for
    /// future days are not pre-created; an external daily trigger re-runs
    /// reminder creation.
    pub async fn insert_schedule(
        &self,
        medication_id: i64,
        time: &str,
        days_of_week: &str,
    ) -> Result<i64> {
        let now = schedule::now_ts();
        let time_owned = time.to_string();
        let days_owned = days_of_week.to_string();
        let id = self
            .schedules
            .mutate(move |records| {
                let id = next_id(records.iter().map(|s| s.id));
                records.push(MedicationSchedule {
                    id,
                    medication_id,
                    time: time_owned,
                    days_of_week: days_owned,
                    created_at: now,
                    updated_at: now,
                });
                id
            })
            .await?;

        self.create_today_reminder_if_due(medication_id, id, time, days_of_week)
            .await?;
        self.register_platform_notification(medication_id, time, days_of_week);
        Ok(id)
    }

    /// Updates a schedule's time and weekdays, re-running the today-reminder
    /// and platform notification hooks so the active reminder stays
    /// consistent with the edit.
    pub async fn update_schedule(&self, id: i64, time: &str, days_of_week: &str) -> Result<()> {
        let now = schedule::now_ts();
        let medication_id = self.get_schedule_by_id(id).map(|s| s.medication_id);

        let time_owned = time.to_string();
        let days_owned = days_of_week.to_string();
        self.schedules
            .mutate(move |records| {
                for s in records.iter_mut().filter(|s| s.id == id) {
                    s.time = time_owned.clone();
                    s.days_of_week = days_owned.clone();
                    s.updated_at = now;
                }
            })
            .await?;

        if let Some(medication_id) = medication_id {
            self.create_today_reminder_if_due(medication_id, id, time, days_of_week)
                .await?;
            self.register_platform_notification(medication_id, time, days_of_week);
        }
        Ok(())
    }

    /// Deletes a schedule and cascades to its intakes.
    pub async fn delete_schedule(&self, id: i64) -> Result<()> {
        self.schedules
            .mutate(move |records| records.retain(|s| s.id != id))
            .await?;
        self.intakes
            .mutate(move |records| records.retain(|i| i.schedule_id != id))
            .await?;
        Ok(())
    }

    // ===== Intakes =====

    pub fn get_all_intakes(&self) -> Vec<MedicationIntake> {
        let mut intakes = self.intakes.snapshot();
        intakes.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        intakes
    }

    pub fn subscribe_intakes(&self) -> watch::Receiver<Vec<MedicationIntake>> {
        self.intakes.subscribe()
    }

    /// Intakes whose scheduled date falls in `start..=end` (inclusive
    /// "YYYY-MM-DD" string comparison), sorted by scheduled time.
    pub fn get_intakes_for_date_range(&self, start: &str, end: &str) -> Vec<MedicationIntake> {
        let mut intakes: Vec<_> = self
            .intakes
            .snapshot()
            .into_iter()
            .filter(|i| i.scheduled_date.as_str() >= start && i.scheduled_date.as_str() <= end)
            .collect();
        intakes.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        intakes
    }

    pub fn get_intakes_for_schedule_and_date(
        &self,
        schedule_id: i64,
        date: &str,
    ) -> Vec<MedicationIntake> {
        let mut intakes: Vec<_> = self
            .intakes
            .snapshot()
            .into_iter()
            .filter(|i| i.schedule_id == schedule_id && i.scheduled_date == date)
            .collect();
        intakes.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        intakes
    }

    /// Records a dose event. Always appends; recording twice for the same
    /// occurrence is allowed and the not-taken queries only test presence.
    pub async fn record_intake(
        &self,
        medication_id: i64,
        schedule_id: i64,
        scheduled_time: &str,
        scheduled_date: &str,
        taken: bool,
    ) -> Result<i64> {
        let taken_at = schedule::now_ts();
        let scheduled_time = scheduled_time.to_string();
        let scheduled_date = scheduled_date.to_string();
        self.intakes
            .mutate(move |records| {
                let id = next_id(records.iter().map(|i| i.id));
                records.push(MedicationIntake {
                    id,
                    medication_id,
                    schedule_id,
                    taken_at,
                    scheduled_time,
                    scheduled_date,
                    acknowledged: false,
                    taken,
                });
                id
            })
            .await
    }

    pub async fn acknowledge_intake(&self, id: i64) -> Result<()> {
        self.intakes
            .mutate(move |records| {
                for intake in records.iter_mut().filter(|i| i.id == id) {
                    intake.acknowledged = true;
                }
            })
            .await
    }

    pub async fn delete_intake(&self, id: i64) -> Result<()> {
        self.intakes
            .mutate(move |records| records.retain(|i| i.id != id))
            .await
    }

    // ===== Reminders =====

    /// All reminders newer than the retention window, sorted by scheduled
    /// time. Stale reminders drop out of the view but stay on disk.
    pub fn get_all_reminders(&self, now: i64) -> Vec<MedicationReminder> {
        let cutoff = now - schedule::REMINDER_RETENTION_SECS;
        let mut reminders: Vec<_> = self
            .reminders
            .snapshot()
            .into_iter()
            .filter(|r| r.reminder_time > cutoff)
            .collect();
        reminders.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        reminders
    }

    pub fn subscribe_reminders(&self) -> watch::Receiver<Vec<MedicationReminder>> {
        self.reminders.subscribe()
    }

    /// Unacknowledged reminders that are due at `now` and not stale.
    pub fn get_active_reminders(&self, now: i64) -> Vec<MedicationReminder> {
        let cutoff = now - schedule::REMINDER_RETENTION_SECS;
        let mut reminders: Vec<_> = self
            .reminders
            .snapshot()
            .into_iter()
            .filter(|r| !r.acknowledged && r.reminder_time <= now && r.reminder_time > cutoff)
            .collect();
        reminders.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        reminders
    }

    /// Due reminders at `now`, acknowledged or not, excluding stale ones.
    pub fn get_reminders_for_current_time(&self, now: i64) -> Vec<MedicationReminder> {
        let cutoff = now - schedule::REMINDER_RETENTION_SECS;
        let mut reminders: Vec<_> = self
            .reminders
            .snapshot()
            .into_iter()
            .filter(|r| r.reminder_time <= now && r.reminder_time > cutoff)
            .collect();
        reminders.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        reminders
    }

    pub fn get_reminders_for_date_range(&self, start: &str, end: &str) -> Vec<MedicationReminder> {
        let mut reminders: Vec<_> = self
            .reminders
            .snapshot()
            .into_iter()
            .filter(|r| r.scheduled_date.as_str() >= start && r.scheduled_date.as_str() <= end)
            .collect();
        reminders.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        reminders
    }

    /// Creates a reminder for one scheduled occurrence, firing
    /// [`schedule::REMINDER_LEAD_SECS`] before the scheduled instant or
    /// immediately if that instant is already close or past.
    ///
    /// Idempotent: an existing unacknowledged reminder for the same
    /// `(medication, schedule, time, date)` is returned unchanged instead
    /// of duplicated.
    pub async fn create_reminder(
        &self,
        medication_id: i64,
        schedule_id: i64,
        scheduled_time: &str,
        scheduled_date: &str,
    ) -> Result<i64> {
        let duplicate_of = |r: &MedicationReminder| {
            r.medication_id == medication_id
                && r.schedule_id == schedule_id
                && r.scheduled_time == scheduled_time
                && r.scheduled_date == scheduled_date
                && !r.acknowledged
        };
        if let Some(existing) = self.reminders.snapshot().iter().find(|r| duplicate_of(r)) {
            return Ok(existing.id);
        }

        let now = schedule::now_ts();
        // Resolve against the stored schedule's own time when it exists;
        // the parameters are the fallback for a since-deleted schedule.
        let time = self
            .get_schedule_by_id(schedule_id)
            .map(|s| s.time)
            .unwrap_or_else(|| scheduled_time.to_string());
        let reminder_time = match schedule::occurrence_epoch(&time, scheduled_date) {
            Ok(at) => schedule::reminder_instant(at, now),
            Err(e) => {
                debug!(schedule_id, error = %e, "unresolvable occurrence, reminding now");
                now
            }
        };

        let scheduled_time = scheduled_time.to_string();
        let scheduled_date = scheduled_date.to_string();
        self.reminders
            .mutate(move |records| {
                // Re-check under the write lock; a racing creator wins.
                if let Some(existing) = records.iter().find(|r| {
                    r.medication_id == medication_id
                        && r.schedule_id == schedule_id
                        && r.scheduled_time == scheduled_time
                        && r.scheduled_date == scheduled_date
                        && !r.acknowledged
                }) {
                    return existing.id;
                }
                let id = next_id(records.iter().map(|r| r.id));
                records.push(MedicationReminder {
                    id,
                    medication_id,
                    schedule_id,
                    reminder_time,
                    scheduled_time,
                    scheduled_date,
                    acknowledged: false,
                });
                id
            })
            .await
    }

    pub async fn acknowledge_reminder(&self, id: i64) -> Result<()> {
        self.reminders
            .mutate(move |records| {
                for reminder in records.iter_mut().filter(|r| r.id == id) {
                    reminder.acknowledged = true;
                }
            })
            .await
    }

    pub async fn delete_reminder(&self, id: i64) -> Result<()> {
        self.reminders
            .mutate(move |records| records.retain(|r| r.id != id))
            .await
    }

    // ===== Overdue detection =====

    /// Number of schedules due today with no recorded intake, overdue by at
    /// least the grace period. Badge consumers use this; it does not join
    /// against medication existence, so a schedule whose medication is gone
    /// still counts.
    pub fn count_medications_not_taken_for_today(&self, now: i64) -> usize {
        self.not_taken_schedules(now).len()
    }

    /// The `(medication, schedule)` pairs behind the count, for dialog-style
    /// consumers. Schedules whose medication no longer exists are omitted
    /// here, since there is no row to render without one.
    pub fn get_medications_not_taken_for_today(
        &self,
        now: i64,
    ) -> Vec<(Medication, MedicationSchedule)> {
        let medications = self.medications.snapshot();
        self.not_taken_schedules(now)
            .into_iter()
            .filter_map(|s| {
                medications
                    .iter()
                    .find(|m| m.id == s.medication_id)
                    .cloned()
                    .map(|m| (m, s))
            })
            .collect()
    }

    /// Recomputes the not-taken count and pushes it to the platform badge.
    pub fn update_badge(&self, now: i64) {
        let count = self.count_medications_not_taken_for_today(now);
        self.platform.set_badge_count(count);
    }

    /// Schedules due on `now`'s local calendar date with no recorded intake
    /// for that date, already past the grace window. A schedule with an
    /// unparseable time or weekday set is skipped, never reported.
    fn not_taken_schedules(&self, now: i64) -> Vec<MedicationSchedule> {
        let today = schedule::local_date_of(now);
        let today_str = schedule::date_string(today);
        let day_index = schedule::day_of_week_index(today);

        let intakes_today: Vec<_> = self
            .intakes
            .snapshot()
            .into_iter()
            .filter(|i| i.scheduled_date == today_str)
            .collect();

        self.schedules
            .snapshot()
            .into_iter()
            .filter(|s| {
                let due_today = schedule::parse_days_of_week(&s.days_of_week)
                    .map(|days| days.contains(&day_index))
                    .unwrap_or(false);
                if !due_today {
                    return false;
                }
                if intakes_today.iter().any(|i| i.schedule_id == s.id) {
                    return false;
                }
                match schedule::occurrence_epoch(&s.time, &today_str) {
                    Ok(at) => now >= at + schedule::GRACE_PERIOD_SECS,
                    Err(_) => false,
                }
            })
            .collect()
    }

    // ===== Hooks =====

    /// Creates today's reminder for a schedule whose weekday set includes
    /// today. Malformed weekday sets skip the hook.
    async fn create_today_reminder_if_due(
        &self,
        medication_id: i64,
        schedule_id: i64,
        time: &str,
        days_of_week: &str,
    ) -> Result<()> {
        let today = schedule::local_date_of(schedule::now_ts());
        let Ok(days) = schedule::parse_days_of_week(days_of_week) else {
            return Ok(());
        };
        if days.contains(&schedule::day_of_week_index(today)) {
            self.create_reminder(
                medication_id,
                schedule_id,
                time,
                &schedule::date_string(today),
            )
            .await?;
        }
        Ok(())
    }

    /// Hands a schedule to the platform notification capability. Missing
    /// medication or malformed time/weekdays skip the hook.
    fn register_platform_notification(&self, medication_id: i64, time: &str, days_of_week: &str) {
        let Some(medication) = self.get_medication_by_id(medication_id) else {
            return;
        };
        let Ok((hour, minute)) = schedule::parse_time(time) else {
            return;
        };
        let Ok(days) = schedule::parse_days_of_week(days_of_week) else {
            return;
        };
        self.platform
            .schedule_medication_notification(&medication.name, hour, minute, &days);
    }
}
