//! Backup and maintenance window scheduling.
//!
//! Offsets are minutes since midnight UTC. Formatting is plain 24-hour
//! arithmetic and does not wrap across midnight; callers pick hour bounds
//! that keep both windows inside one day.

use rand::Rng;
use thiserror::Error;

/// Gap between the end of the backup window and the maintenance window.
pub const MAINTENANCE_BUFFER_MINUTES: u32 = 1;

/// Errors raised when a backup window cannot be drawn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no backup start fits between hours {start_hour} and {end_hour} with {window_minutes} minute windows")]
    EmptyRange {
        start_hour: u32,
        end_hour: u32,
        window_minutes: u32,
    },
}

/// Draw a backup start offset.
///
/// The upper bound is `|end - start| * 60 - window`, so the default
/// policy (3, 9, 30) draws from `[180, 330)`.
pub fn random_backup_start<R: Rng + ?Sized>(
    rng: &mut R,
    start_hour: u32,
    end_hour: u32,
    window_minutes: u32,
) -> Result<u32, ScheduleError> {
    let min = start_hour * 60;
    let max = (end_hour.abs_diff(start_hour) * 60).saturating_sub(window_minutes);
    if max <= min {
        return Err(ScheduleError::EmptyRange {
            start_hour,
            end_hour,
            window_minutes,
        });
    }
    Ok(rng.gen_range(min..max))
}

/// `HH:MM-HH:MM` for a window starting at `offset`.
pub fn format_backup_window(offset: u32, window_minutes: u32) -> String {
    let end = offset + window_minutes;
    format!(
        "{:02}:{:02}-{:02}:{:02}",
        offset / 60,
        offset % 60,
        end / 60,
        end % 60
    )
}

/// `Day:HH:MM-Day:HH:MM`, starting one minute after the backup window
/// that starts at `backup_offset` ends.
pub fn format_maintenance_window(backup_offset: u32, window_minutes: u32, day: &str) -> String {
    let start = backup_offset + window_minutes + MAINTENANCE_BUFFER_MINUTES;
    let end = start + window_minutes;
    format!(
        "{day}:{:02}:{:02}-{day}:{:02}:{:02}",
        start / 60,
        start % 60,
        end / 60,
        end % 60
    )
}

/// A drawn backup window and the maintenance window derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub backup_start: u32,
    pub window_minutes: u32,
    pub maintenance_day: String,
}

impl ScheduleWindow {
    /// Draw a window with the given policy.
    pub fn draw<R: Rng + ?Sized>(
        rng: &mut R,
        start_hour: u32,
        end_hour: u32,
        window_minutes: u32,
        maintenance_day: &str,
    ) -> Result<Self, ScheduleError> {
        let backup_start = random_backup_start(rng, start_hour, end_hour, window_minutes)?;
        Ok(Self {
            backup_start,
            window_minutes,
            maintenance_day: maintenance_day.to_string(),
        })
    }

    pub fn backup_window(&self) -> String {
        format_backup_window(self.backup_start, self.window_minutes)
    }

    pub fn maintenance_window(&self) -> String {
        format_maintenance_window(self.backup_start, self.window_minutes, &self.maintenance_day)
    }

    /// Minute the maintenance window starts.
    pub fn maintenance_start(&self) -> u32 {
        self.backup_start + self.window_minutes + MAINTENANCE_BUFFER_MINUTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_backup_window_fixture() {
        assert_eq!(format_backup_window(311, 30), "05:11-05:41");
    }

    #[test]
    fn test_maintenance_window_fixture() {
        assert_eq!(
            format_maintenance_window(311, 30, "Thu"),
            "Thu:05:42-Thu:06:12"
        );
    }

    #[test]
    fn test_random_start_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let start = random_backup_start(&mut rng, 3, 9, 30).unwrap();
            assert!((180..330).contains(&start), "{start} out of range");
        }
    }

    #[test]
    fn test_random_start_is_reproducible() {
        let a = random_backup_start(&mut StdRng::seed_from_u64(42), 3, 9, 30).unwrap();
        let b = random_backup_start(&mut StdRng::seed_from_u64(42), 3, 9, 30).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = random_backup_start(&mut rng, 3, 4, 30).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::EmptyRange {
                start_hour: 3,
                end_hour: 4,
                window_minutes: 30
            }
        );
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let window = ScheduleWindow::draw(&mut rng, 3, 9, 30, "Thu").unwrap();
            assert_eq!(
                window.maintenance_start(),
                window.backup_start + window.window_minutes + 1
            );
        }
    }

    #[test]
    fn test_hour_boundary_is_not_wrapped() {
        // Documented edge case: no day wraparound.
        assert_eq!(format_backup_window(23 * 60 + 50, 30), "23:50-24:20");
    }
}
