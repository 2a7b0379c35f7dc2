use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// Compute the next UTC instant at which the daily slot `at` (wall-clock time
/// in `offset`) fires, strictly *after* `from`.
///
/// Returns `None` only when the local date/time cannot be represented.
pub fn compute_next_fire(
    at: NaiveTime,
    offset: FixedOffset,
    from: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let local_now = from.with_timezone(&offset);

    // Build today's candidate at HH:MM:SS local time.
    let candidate = offset
        .from_local_datetime(&local_now.date_naive().and_time(at))
        .single()?;

    let next = if candidate > local_now {
        candidate
    } else {
        // Today's slot has passed, advance to tomorrow.
        candidate + Duration::days(1)
    };
    Some(next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shanghai() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn fires_later_today() {
        // 06:00 local on Oct 18 == 22:00 UTC on Oct 17.
        let from = utc(2026, 10, 17, 22, 0, 0);
        let at = NaiveTime::from_hms_opt(6, 59, 58).unwrap();
        assert_eq!(
            compute_next_fire(at, shanghai(), from),
            Some(utc(2026, 10, 17, 22, 59, 58))
        );
    }

    #[test]
    fn passed_slot_moves_to_tomorrow() {
        // 08:00 local on Oct 18.
        let from = utc(2026, 10, 18, 0, 0, 0);
        let at = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert_eq!(
            compute_next_fire(at, shanghai(), from),
            Some(utc(2026, 10, 18, 23, 0, 0))
        );
    }

    #[test]
    fn exact_slot_time_is_not_refired() {
        let at = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let from = utc(2026, 10, 17, 23, 0, 0); // 07:00:00 local
        let next = compute_next_fire(at, shanghai(), from).unwrap();
        assert_eq!(next - from, Duration::days(1));
    }

    #[test]
    fn local_date_not_utc_date_is_used() {
        // 23:30 UTC Oct 17 is 07:30 local Oct 18; a 23:45 local slot is the
        // same local day.
        let from = utc(2026, 10, 17, 23, 30, 0);
        let at = NaiveTime::from_hms_opt(23, 45, 0).unwrap();
        assert_eq!(
            compute_next_fire(at, shanghai(), from),
            Some(utc(2026, 10, 18, 15, 45, 0))
        );
    }
}
