use chrono::{DateTime, Duration, NaiveTime, Utc};
use timesheet_domain::{CoreError, CoreResult, User};

/// A caller-supplied time qualifier on a toggle command. Exactly one may be
/// present; the adapter parsing `-m N` / `+m N` / `HH:MM` is responsible
/// for rejecting a mix (§6), so this type only ever carries zero or one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpec {
    /// Signed minute offset from now (`-m N` is "N minutes ago").
    MinuteOffset(i64),
    /// 24-hour local time, applied to today's local date.
    AbsoluteLocal(NaiveTime),
}

/// Resolve a [`TimeSpec`] (or its absence) to a UTC instant and validate it
/// against the absolute bound (§4.1, default ±12h).
///
/// # Errors
///
/// Returns `CoreError::InvalidRequest` if the resolved instant falls
/// outside `[now - bound, now + bound]`.
pub fn resolve(
    user: &User,
    time_spec: Option<TimeSpec>,
    now: DateTime<Utc>,
    bound: Duration,
) -> CoreResult<DateTime<Utc>> {
    let resolved = match time_spec {
        None => now,
        Some(TimeSpec::MinuteOffset(minutes)) => now + Duration::minutes(minutes),
        Some(TimeSpec::AbsoluteLocal(time)) => resolve_absolute_local(user, time, now),
    };

    let delta = resolved - now;
    if delta > bound || delta < -bound {
        return Err(CoreError::invalid_request(format!(
            "resolved time is {delta} from now, outside the allowed {bound} window"
        )));
    }

    Ok(resolved)
}

/// Convert `time` (today's local date, per `user.utc_offset_minutes`) to a
/// UTC instant. If the result is in the future relative to `now`, wrap back
/// one local day — the resolution to spec.md's open question on `HH:MM`
/// backfill (see `DESIGN.md`).
fn resolve_absolute_local(user: &User, time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_today = user.local_date(now);
    let local_naive = local_today.and_time(time);
    let candidate = DateTime::<Utc>::from_naive_utc_and_offset(local_naive, Utc)
        - Duration::minutes(i64::from(user.utc_offset_minutes));

    if candidate > now {
        candidate - Duration::days(1)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(offset_minutes: i32) -> User {
        User::new(1, offset_minutes, false)
    }

    #[test]
    fn minute_offset_is_added_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 17, 0).unwrap();
        let t = resolve(
            &user(0),
            Some(TimeSpec::MinuteOffset(-17)),
            now,
            Duration::hours(12),
        )
        .unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn absolute_local_converts_with_offset() {
        // local = UTC + 120 minutes; local 16:00 on 2026-01-01 => UTC 14:00.
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 18, 0, 0).unwrap();
        let t = resolve(
            &user(120),
            Some(TimeSpec::AbsoluteLocal(
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            )),
            now,
            Duration::hours(12),
        )
        .unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn absolute_local_in_future_wraps_back_one_day() {
        // now is 01:00 UTC local date local=UTC+0; requesting 23:00 local
        // would be later today, which is in the future, so it wraps to
        // yesterday's 23:00.
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 1, 0, 0).unwrap();
        let t = resolve(
            &user(0),
            Some(TimeSpec::AbsoluteLocal(
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            )),
            now,
            Duration::hours(12),
        )
        .unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap());
    }

    #[test]
    fn out_of_bound_offset_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let result = resolve(
            &user(0),
            Some(TimeSpec::MinuteOffset(-13 * 60)),
            now,
            Duration::hours(12),
        );
        assert!(result.is_err());
    }
}
