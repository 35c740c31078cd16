use time::{Duration, PrimitiveDateTime};

/// Hard deadline of one session: the per-student duration clock, capped by
/// the exam's declared end when there is one. Blocking never pauses this
/// clock.
pub(crate) fn session_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    exam_ends_at: Option<PrimitiveDateTime>,
) -> PrimitiveDateTime {
    let by_duration = started_at + Duration::minutes(duration_minutes as i64);
    match exam_ends_at {
        Some(end) if end < by_duration => end,
        _ => by_duration,
    }
}

pub(crate) fn is_overdue(
    now: PrimitiveDateTime,
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    exam_ends_at: Option<PrimitiveDateTime>,
) -> bool {
    now > session_deadline(started_at, duration_minutes, exam_ends_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn deadline_from_duration_alone() {
        let started = datetime!(2026-03-09 09:00);
        assert_eq!(session_deadline(started, 60, None), datetime!(2026-03-09 10:00));
    }

    #[test]
    fn exam_end_caps_the_duration_clock() {
        let started = datetime!(2026-03-09 09:30);
        let end = datetime!(2026-03-09 10:00);
        assert_eq!(session_deadline(started, 60, Some(end)), end);
    }

    #[test]
    fn later_exam_end_does_not_extend_the_clock() {
        let started = datetime!(2026-03-09 09:00);
        let end = datetime!(2026-03-09 12:00);
        assert_eq!(session_deadline(started, 60, Some(end)), datetime!(2026-03-09 10:00));
    }

    #[test]
    fn session_started_ninety_minutes_ago_with_sixty_minute_exam_is_overdue() {
        let started = datetime!(2026-03-09 09:00);
        let now = datetime!(2026-03-09 10:30);
        assert!(is_overdue(now, started, 60, None));
    }

    #[test]
    fn session_at_exact_deadline_is_not_overdue() {
        let started = datetime!(2026-03-09 09:00);
        let now = datetime!(2026-03-09 10:00);
        assert!(!is_overdue(now, started, 60, None));
    }
}
