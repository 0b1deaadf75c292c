//! Recurrence expansion for recurring events.
//!
//! A recurrence rule is expanded into concrete occurrence instances *before*
//! batching, so the gateway payload carries the full schedule. The end date
//! is inclusive: an occurrence starting exactly on `repeat_until` is kept.

use chrono::{Duration, Months, NaiveTime, TimeZone, Utc};

use herald_common::error::AppError;
use herald_common::types::{EventFields, Recurrence};

/// Expand an event's recurrence rule into concrete occurrences.
///
/// - A non-recurring event yields exactly one occurrence (itself).
/// - An all-day occurrence's window is normalized to its calendar day
///   (00:00:00 through 23:59:59 UTC).
/// - A timed occurrence keeps the original duration, shifted onto the new
///   start date.
///
/// A rule whose `repeat_until` predates the first start yields a validation
/// error rather than an empty schedule.
pub fn expand_occurrences(fields: &EventFields) -> Result<Vec<EventFields>, AppError> {
    let Some(rule) = fields.recurrence else {
        return Ok(vec![normalize(fields)?]);
    };

    if fields.starts_at.date_naive() > rule.repeat_until {
        return Err(AppError::Validation(format!(
            "Recurrence end date {} precedes the first occurrence on {}",
            rule.repeat_until,
            fields.starts_at.date_naive()
        )));
    }

    let mut occurrences = Vec::new();
    for k in 0.. {
        let start = match rule.frequency {
            Recurrence::Weekly => fields.starts_at + Duration::weeks(k),
            Recurrence::BiWeekly => fields.starts_at + Duration::weeks(2 * k),
            Recurrence::Monthly => fields
                .starts_at
                .checked_add_months(Months::new(k as u32))
                .ok_or_else(|| {
                    AppError::Validation("Recurrence overflows the calendar".to_string())
                })?,
        };
        if start.date_naive() > rule.repeat_until {
            break;
        }
        let mut occurrence = normalize(fields)?;
        shift_to(&mut occurrence, start)?;
        occurrences.push(occurrence);
    }

    Ok(occurrences)
}

/// Produce a single occurrence from the template fields, with the recurrence
/// rule stripped (each instance stands alone).
fn normalize(fields: &EventFields) -> Result<EventFields, AppError> {
    let mut occurrence = fields.clone();
    occurrence.recurrence = None;
    if occurrence.all_day {
        clamp_to_day(&mut occurrence)?;
    }
    Ok(occurrence)
}

/// Move an occurrence onto a new start instant, preserving its duration
/// (timed) or its whole-day window (all-day).
fn shift_to(
    occurrence: &mut EventFields,
    new_start: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    if occurrence.all_day {
        occurrence.starts_at = new_start;
        occurrence.ends_at = new_start;
        clamp_to_day(occurrence)
    } else {
        let duration = occurrence.ends_at - occurrence.starts_at;
        occurrence.starts_at = new_start;
        occurrence.ends_at = new_start + duration;
        Ok(())
    }
}

/// Normalize an all-day occurrence's window to its calendar day.
fn clamp_to_day(occurrence: &mut EventFields) -> Result<(), AppError> {
    let day = occurrence.starts_at.date_naive();
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| AppError::Internal("Invalid end-of-day time".to_string()))?;
    occurrence.starts_at = Utc.from_utc_datetime(&start);
    occurrence.ends_at = Utc.from_utc_datetime(&end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use herald_common::types::RecurrenceRule;

    fn event(
        start: &str,
        end: &str,
        all_day: bool,
        recurrence: Option<RecurrenceRule>,
    ) -> EventFields {
        EventFields {
            title: "All hands".to_string(),
            location: Some("Canteen".to_string()),
            description: None,
            starts_at: start.parse().unwrap(),
            ends_at: end.parse().unwrap(),
            all_day,
            recurrence,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_non_recurring_event_is_single_occurrence() {
        let fields = event(
            "2024-03-05T09:00:00Z",
            "2024-03-05T10:30:00Z",
            false,
            None,
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].starts_at, fields.starts_at);
        assert_eq!(occurrences[0].ends_at, fields.ends_at);
    }

    #[test]
    fn test_weekly_all_day_inclusive_end() {
        let fields = event(
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00Z",
            true,
            Some(RecurrenceRule {
                frequency: Recurrence::Weekly,
                repeat_until: date("2024-01-15"),
            }),
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        assert_eq!(occurrences.len(), 3);
        let days: Vec<NaiveDate> = occurrences.iter().map(|o| o.starts_at.date_naive()).collect();
        assert_eq!(
            days,
            vec![date("2024-01-01"), date("2024-01-08"), date("2024-01-15")]
        );
    }

    #[test]
    fn test_all_day_window_normalized_to_calendar_day() {
        let fields = event(
            "2024-01-01T14:23:00Z",
            "2024-01-01T15:00:00Z",
            true,
            None,
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        let o = &occurrences[0];
        assert_eq!(
            o.starts_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            o.ends_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_timed_occurrence_preserves_duration() {
        let fields = event(
            "2024-01-01T09:00:00Z",
            "2024-01-01T10:30:00Z",
            false,
            Some(RecurrenceRule {
                frequency: Recurrence::Weekly,
                repeat_until: date("2024-01-08"),
            }),
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        assert_eq!(occurrences.len(), 2);
        let second = &occurrences[1];
        assert_eq!(
            second.starts_at,
            Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
        );
        assert_eq!(second.ends_at - second.starts_at, Duration::minutes(90));
    }

    #[test]
    fn test_biweekly_skips_alternate_weeks() {
        let fields = event(
            "2024-01-01T09:00:00Z",
            "2024-01-01T10:00:00Z",
            false,
            Some(RecurrenceRule {
                frequency: Recurrence::BiWeekly,
                repeat_until: date("2024-02-01"),
            }),
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        let days: Vec<NaiveDate> = occurrences.iter().map(|o| o.starts_at.date_naive()).collect();
        assert_eq!(
            days,
            vec![date("2024-01-01"), date("2024-01-15"), date("2024-01-29")]
        );
    }

    #[test]
    fn test_monthly_advances_by_calendar_month() {
        let fields = event(
            "2024-01-31T09:00:00Z",
            "2024-01-31T10:00:00Z",
            false,
            Some(RecurrenceRule {
                frequency: Recurrence::Monthly,
                repeat_until: date("2024-03-31"),
            }),
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        let days: Vec<NaiveDate> = occurrences.iter().map(|o| o.starts_at.date_naive()).collect();
        // chrono clamps Jan 31 + 1 month to Feb 29 in a leap year.
        assert_eq!(
            days,
            vec![date("2024-01-31"), date("2024-02-29"), date("2024-03-31")]
        );
    }

    #[test]
    fn test_occurrences_carry_no_recurrence_rule() {
        let fields = event(
            "2024-01-01T09:00:00Z",
            "2024-01-01T10:00:00Z",
            false,
            Some(RecurrenceRule {
                frequency: Recurrence::Weekly,
                repeat_until: date("2024-01-15"),
            }),
        );
        let occurrences = expand_occurrences(&fields).unwrap();
        assert!(occurrences.iter().all(|o| o.recurrence.is_none()));
    }

    #[test]
    fn test_end_before_start_is_validation_error() {
        let fields = event(
            "2024-05-01T09:00:00Z",
            "2024-05-01T10:00:00Z",
            false,
            Some(RecurrenceRule {
                frequency: Recurrence::Weekly,
                repeat_until: date("2024-04-01"),
            }),
        );
        assert!(matches!(
            expand_occurrences(&fields),
            Err(AppError::Validation(_))
        ));
    }
}
