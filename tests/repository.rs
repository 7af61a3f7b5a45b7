use std::sync::{Arc, Mutex};

use medminder::interfaces::platform::{NullPlatform, Platform};
use medminder::providers::memory::InMemoryStorage;
use medminder::repository::MedicationRepository;
use medminder::schedule;

// 2026-06-15 is a Monday.
const MONDAY: &str = "2026-06-15";
const EVERY_DAY: &str = "1,2,3,4,5,6,7";

async fn new_repo() -> (Arc<InMemoryStorage>, MedicationRepository) {
    let storage = Arc::new(InMemoryStorage::new());
    let repo = MedicationRepository::new(storage.clone(), Arc::new(NullPlatform)).await;
    (storage, repo)
}

#[derive(Default)]
struct RecordingPlatform {
    badge: Mutex<Vec<usize>>,
    notifications: Mutex<Vec<(String, u32, u32, Vec<u8>)>>,
}

impl Platform for RecordingPlatform {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_badge_count(&self, count: usize) {
        self.badge.lock().unwrap().push(count);
    }

    fn schedule_medication_notification(
        &self,
        medication_name: &str,
        hour: u32,
        minute: u32,
        days_of_week: &[u8],
    ) {
        self.notifications.lock().unwrap().push((
            medication_name.to_string(),
            hour,
            minute,
            days_of_week.to_vec(),
        ));
    }
}

#[tokio::test]
async fn ids_are_max_plus_one_and_not_reused() {
    let (_, repo) = new_repo().await;
    assert_eq!(repo.insert_medication("a", None).await.unwrap(), 1);
    assert_eq!(repo.insert_medication("b", None).await.unwrap(), 2);
    assert_eq!(repo.insert_medication("c", None).await.unwrap(), 3);

    repo.delete_medication(2).await.unwrap();
    assert_eq!(repo.insert_medication("d", None).await.unwrap(), 4);
}

#[tokio::test]
async fn update_medication_rewrites_fields() {
    let (_, repo) = new_repo().await;
    let id = repo.insert_medication("aspirin", None).await.unwrap();
    repo.update_medication(id, "ibuprofen", Some("200mg"))
        .await
        .unwrap();

    let medication = repo.get_medication_by_id(id).unwrap();
    assert_eq!(medication.name, "ibuprofen");
    assert_eq!(medication.description.as_deref(), Some("200mg"));
    assert!(medication.updated_at >= medication.created_at);
}

#[tokio::test]
async fn deleting_a_medication_cascades_to_schedules_and_intakes() {
    let (_, repo) = new_repo().await;
    let med_a = repo.insert_medication("a", None).await.unwrap();
    let med_b = repo.insert_medication("b", None).await.unwrap();
    let sched_a = repo
        .insert_schedule(med_a, "08:00", EVERY_DAY)
        .await
        .unwrap();
    let sched_b = repo
        .insert_schedule(med_b, "09:00", EVERY_DAY)
        .await
        .unwrap();
    repo.record_intake(med_a, sched_a, "08:00", MONDAY, true)
        .await
        .unwrap();
    repo.record_intake(med_b, sched_b, "09:00", MONDAY, true)
        .await
        .unwrap();

    repo.delete_medication(med_a).await.unwrap();

    assert!(repo.get_medication_by_id(med_a).is_none());
    let schedules = repo.get_all_schedules();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].id, sched_b);
    let intakes = repo.get_all_intakes();
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].medication_id, med_b);
}

#[tokio::test]
async fn deleting_a_schedule_cascades_to_its_intakes() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    let sched_1 = repo.insert_schedule(med, "08:00", EVERY_DAY).await.unwrap();
    let sched_2 = repo.insert_schedule(med, "20:00", EVERY_DAY).await.unwrap();
    repo.record_intake(med, sched_1, "08:00", MONDAY, true)
        .await
        .unwrap();
    repo.record_intake(med, sched_2, "20:00", MONDAY, true)
        .await
        .unwrap();

    repo.delete_schedule(sched_1).await.unwrap();

    assert!(repo.get_schedule_by_id(sched_1).is_none());
    let intakes = repo.get_all_intakes();
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].schedule_id, sched_2);
}

#[tokio::test]
async fn create_reminder_is_idempotent_while_unacknowledged() {
    let (_, repo) = new_repo().await;
    let first = repo.create_reminder(1, 10, "09:00", MONDAY).await.unwrap();
    let second = repo.create_reminder(1, 10, "09:00", MONDAY).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.subscribe_reminders().borrow().len(), 1);

    // Acknowledging frees the slot for a fresh reminder.
    repo.acknowledge_reminder(first).await.unwrap();
    let third = repo.create_reminder(1, 10, "09:00", MONDAY).await.unwrap();
    assert_ne!(first, third);
    assert_eq!(repo.subscribe_reminders().borrow().len(), 2);
}

#[tokio::test]
async fn reminder_fires_with_lead_time_for_future_occurrences() {
    let (_, repo) = new_repo().await;
    let now = schedule::now_ts();
    let date = schedule::date_string(schedule::local_date_of(now + 2 * 86_400));
    repo.create_reminder(1, 10, "09:00", &date).await.unwrap();

    let reminders = repo.subscribe_reminders().borrow().clone();
    let expected = schedule::occurrence_epoch("09:00", &date).unwrap() - 300;
    assert_eq!(reminders[0].reminder_time, expected);
}

#[tokio::test]
async fn reminder_for_past_occurrence_fires_now() {
    let (_, repo) = new_repo().await;
    let now = schedule::now_ts();
    let date = schedule::date_string(schedule::local_date_of(now - 2 * 86_400));
    repo.create_reminder(1, 10, "09:00", &date).await.unwrap();

    let reminders = repo.subscribe_reminders().borrow().clone();
    assert!(reminders[0].reminder_time >= now);
    assert!(reminders[0].reminder_time <= schedule::now_ts());
}

#[tokio::test]
async fn reminder_with_unparseable_time_falls_back_to_now() {
    let (_, repo) = new_repo().await;
    let before = schedule::now_ts();
    repo.create_reminder(1, 10, "soon", MONDAY).await.unwrap();

    let reminders = repo.subscribe_reminders().borrow().clone();
    assert!(reminders[0].reminder_time >= before);
    assert!(reminders[0].reminder_time <= schedule::now_ts());
}

#[tokio::test]
async fn inserting_a_schedule_creates_a_reminder_for_today() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    let sched = repo.insert_schedule(med, "09:00", EVERY_DAY).await.unwrap();

    let today = schedule::date_string(schedule::local_date_of(schedule::now_ts()));
    let reminders = repo.subscribe_reminders().borrow().clone();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].schedule_id, sched);
    assert_eq!(reminders[0].scheduled_date, today);

    // Re-saving the same schedule must not duplicate the reminder.
    repo.update_schedule(sched, "09:00", EVERY_DAY).await.unwrap();
    assert_eq!(repo.subscribe_reminders().borrow().len(), 1);
}

#[tokio::test]
async fn grace_window_boundary_is_inclusive_at_ten_minutes() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    repo.insert_schedule(med, "09:00", EVERY_DAY).await.unwrap();

    let scheduled = schedule::occurrence_epoch("09:00", MONDAY).unwrap();
    assert_eq!(repo.count_medications_not_taken_for_today(scheduled + 599), 0);
    assert_eq!(repo.count_medications_not_taken_for_today(scheduled + 600), 1);
}

#[tokio::test]
async fn any_same_day_intake_clears_the_not_taken_state() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    let sched = repo.insert_schedule(med, "09:00", EVERY_DAY).await.unwrap();

    // Even a not-taken record counts as a response for the occurrence.
    repo.record_intake(med, sched, "09:00", MONDAY, false)
        .await
        .unwrap();

    let scheduled = schedule::occurrence_epoch("09:00", MONDAY).unwrap();
    assert_eq!(repo.count_medications_not_taken_for_today(scheduled + 600), 0);
}

#[tokio::test]
async fn unparseable_schedule_time_never_counts_as_overdue() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    repo.insert_schedule(med, "9am", EVERY_DAY).await.unwrap();

    let late = schedule::occurrence_epoch("23:00", MONDAY).unwrap();
    assert_eq!(repo.count_medications_not_taken_for_today(late), 0);
    assert!(repo.get_medications_not_taken_for_today(late).is_empty());
}

#[tokio::test]
async fn count_matches_pair_list_when_all_medications_exist() {
    let (_, repo) = new_repo().await;
    let med_a = repo.insert_medication("a", None).await.unwrap();
    let med_b = repo.insert_medication("b", None).await.unwrap();
    repo.insert_schedule(med_a, "08:00", EVERY_DAY).await.unwrap();
    repo.insert_schedule(med_b, "09:00", EVERY_DAY).await.unwrap();

    let now = schedule::occurrence_epoch("09:00", MONDAY).unwrap() + 600;
    let pairs = repo.get_medications_not_taken_for_today(now);
    assert_eq!(repo.count_medications_not_taken_for_today(now), pairs.len());
    assert_eq!(pairs.len(), 2);
}

#[tokio::test]
async fn orphaned_schedule_counts_but_renders_no_pair() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    repo.insert_schedule(med, "08:00", EVERY_DAY).await.unwrap();
    // Schedule pointing at a medication that was never created.
    repo.insert_schedule(999, "09:00", EVERY_DAY).await.unwrap();

    let now = schedule::occurrence_epoch("09:00", MONDAY).unwrap() + 600;
    assert_eq!(repo.count_medications_not_taken_for_today(now), 2);
    let pairs = repo.get_medications_not_taken_for_today(now);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0.id, med);
}

#[tokio::test]
async fn schedules_sort_by_time() {
    let (_, repo) = new_repo().await;
    let med = repo.insert_medication("a", None).await.unwrap();
    repo.insert_schedule(med, "14:00", EVERY_DAY).await.unwrap();
    repo.insert_schedule(med, "09:30", EVERY_DAY).await.unwrap();
    repo.insert_schedule(med, "23:00", EVERY_DAY).await.unwrap();

    let times: Vec<_> = repo
        .get_all_schedules()
        .into_iter()
        .map(|s| s.time)
        .collect();
    assert_eq!(times, vec!["09:30", "14:00", "23:00"]);
}

#[tokio::test]
async fn medications_sort_by_earliest_schedule_time() {
    let (_, repo) = new_repo().await;
    let late = repo.insert_medication("late", None).await.unwrap();
    let early = repo.insert_medication("early", None).await.unwrap();
    let unscheduled = repo.insert_medication("unscheduled", None).await.unwrap();
    repo.insert_schedule(late, "10:00", EVERY_DAY).await.unwrap();
    repo.insert_schedule(late, "21:00", EVERY_DAY).await.unwrap();
    repo.insert_schedule(early, "08:00", EVERY_DAY).await.unwrap();

    let order: Vec<_> = repo.get_all_medications().into_iter().map(|m| m.id).collect();
    assert_eq!(order, vec![early, late, unscheduled]);
}

#[tokio::test]
async fn reminders_drop_out_of_views_after_a_day_but_stay_stored() {
    let (_, repo) = new_repo().await;
    let now = schedule::now_ts();
    let date = schedule::date_string(schedule::local_date_of(now + 2 * 86_400));
    repo.create_reminder(1, 10, "09:00", &date).await.unwrap();

    let reminder_time = repo.subscribe_reminders().borrow()[0].reminder_time;
    assert_eq!(repo.get_all_reminders(reminder_time + 1).len(), 1);
    assert!(repo
        .get_all_reminders(reminder_time + 24 * 3600 + 1)
        .is_empty());
    // Still present in the raw collection.
    assert_eq!(repo.subscribe_reminders().borrow().len(), 1);
}

#[tokio::test]
async fn acknowledged_reminders_leave_the_active_view() {
    let (_, repo) = new_repo().await;
    let now = schedule::now_ts();
    let date = schedule::date_string(schedule::local_date_of(now - 86_400));
    let id = repo.create_reminder(1, 10, "09:00", &date).await.unwrap();

    let at = schedule::now_ts() + 10;
    assert_eq!(repo.get_active_reminders(at).len(), 1);

    repo.acknowledge_reminder(id).await.unwrap();
    assert!(repo.get_active_reminders(at).is_empty());
    // Acknowledged reminders still show in the unfiltered due view.
    assert_eq!(repo.get_reminders_for_current_time(at).len(), 1);
}

#[tokio::test]
async fn acknowledge_intake_flips_the_flag() {
    let (_, repo) = new_repo().await;
    let id = repo
        .record_intake(1, 10, "09:00", MONDAY, true)
        .await
        .unwrap();
    assert!(!repo.get_all_intakes()[0].acknowledged);

    repo.acknowledge_intake(id).await.unwrap();
    assert!(repo.get_all_intakes()[0].acknowledged);
}

#[tokio::test]
async fn duplicate_same_day_intakes_are_allowed() {
    let (_, repo) = new_repo().await;
    let first = repo
        .record_intake(1, 10, "09:00", MONDAY, true)
        .await
        .unwrap();
    let second = repo
        .record_intake(1, 10, "09:00", MONDAY, true)
        .await
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(repo.get_all_intakes().len(), 2);
}

#[tokio::test]
async fn date_range_queries_are_inclusive() {
    let (_, repo) = new_repo().await;
    repo.record_intake(1, 10, "09:00", "2026-06-14", true)
        .await
        .unwrap();
    repo.record_intake(1, 10, "09:00", "2026-06-15", true)
        .await
        .unwrap();
    repo.record_intake(1, 10, "09:00", "2026-06-16", true)
        .await
        .unwrap();

    let hits = repo.get_intakes_for_date_range("2026-06-14", "2026-06-15");
    assert_eq!(hits.len(), 2);

    let hits = repo.get_intakes_for_schedule_and_date(10, "2026-06-16");
    assert_eq!(hits.len(), 1);

    repo.create_reminder(1, 10, "09:00", "2026-06-15").await.unwrap();
    repo.create_reminder(1, 10, "09:00", "2026-06-20").await.unwrap();
    let hits = repo.get_reminders_for_date_range("2026-06-15", "2026-06-19");
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn round_trip_reload_reproduces_every_collection() {
    let (storage, repo) = new_repo().await;
    let med = repo.insert_medication("a", Some("desc")).await.unwrap();
    let sched = repo.insert_schedule(med, "09:00", "1,3,5").await.unwrap();
    repo.record_intake(med, sched, "09:00", MONDAY, true)
        .await
        .unwrap();
    repo.create_reminder(med, sched, "09:00", MONDAY).await.unwrap();

    let reloaded = MedicationRepository::new(storage, Arc::new(NullPlatform)).await;
    assert_eq!(
        repo.subscribe_medications().borrow().clone(),
        reloaded.subscribe_medications().borrow().clone()
    );
    assert_eq!(
        repo.subscribe_schedules().borrow().clone(),
        reloaded.subscribe_schedules().borrow().clone()
    );
    assert_eq!(
        repo.subscribe_intakes().borrow().clone(),
        reloaded.subscribe_intakes().borrow().clone()
    );
    assert_eq!(
        repo.subscribe_reminders().borrow().clone(),
        reloaded.subscribe_reminders().borrow().clone()
    );
}

#[tokio::test]
async fn corrupt_blob_loads_as_an_empty_collection() {
    use medminder::interfaces::storage::FileStorage;
    use medminder::repository::MEDICATIONS_FILE;

    let storage = Arc::new(InMemoryStorage::new());
    storage
        .write_text(MEDICATIONS_FILE, "not json at all")
        .await
        .unwrap();

    let repo = MedicationRepository::new(storage, Arc::new(NullPlatform)).await;
    assert!(repo.get_all_medications().is_empty());
    // The collection is usable again after recovery.
    assert_eq!(repo.insert_medication("a", None).await.unwrap(), 1);
}

#[tokio::test]
async fn subscribers_observe_each_published_snapshot() {
    let (_, repo) = new_repo().await;
    let mut rx = repo.subscribe_medications();
    assert!(rx.borrow_and_update().is_empty());

    repo.insert_medication("a", None).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().len(), 1);
}

#[tokio::test]
async fn platform_hooks_receive_parsed_schedule_and_badge_count() {
    let storage = Arc::new(InMemoryStorage::new());
    let platform = Arc::new(RecordingPlatform::default());
    let repo = MedicationRepository::new(storage, platform.clone()).await;

    let med = repo.insert_medication("aspirin", None).await.unwrap();
    repo.insert_schedule(med, "08:30", "3,5").await.unwrap();
    {
        let notifications = platform.notifications.lock().unwrap();
        assert_eq!(
            notifications.as_slice(),
            &[("aspirin".to_string(), 8, 30, vec![3, 5])]
        );
    }

    // A malformed time skips the notification hook entirely.
    repo.insert_schedule(med, "8.30", "3,5").await.unwrap();
    assert_eq!(platform.notifications.lock().unwrap().len(), 1);

    repo.insert_schedule(med, "09:00", EVERY_DAY).await.unwrap();
    let now = schedule::occurrence_epoch("09:00", MONDAY).unwrap() + 600;
    repo.update_badge(now);
    assert_eq!(platform.badge.lock().unwrap().last(), Some(&1));
}
