/// Platform-specific notification capabilities the repository calls
/// outward. Only some targets implement them; everything else gets
/// [`NullPlatform`].
pub trait Platform: Send + Sync {
    fn name(&self) -> &str;

    /// Sets the app icon badge. A count of 0 hides the badge.
    fn set_badge_count(&self, count: usize);

    /// Registers an OS-level recurring notification for a medication.
    /// `days_of_week` uses 1..=7 where 1 is Monday.
    fn schedule_medication_notification(
        &self,
        medication_name: &str,
        hour: u32,
        minute: u32,
        days_of_week: &[u8],
    );
}

/// No-op capability for targets without native notifications.
pub struct NullPlatform;

impl Platform for NullPlatform {
    fn name(&self) -> &str {
        "null"
    }

    fn set_badge_count(&self, _count: usize) {}

    fn schedule_medication_notification(
        &self,
        _medication_name: &str,
        _hour: u32,
        _minute: u32,
        _days_of_week: &[u8],
    ) {
    }
}
