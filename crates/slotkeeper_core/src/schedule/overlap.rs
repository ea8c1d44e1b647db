//! Interval overlap predicates.
//!
//! # Invariants
//! - Intervals touching at a single boundary point do not overlap.
//! - `overlaps(a, b) == overlaps(b, a)`.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use crate::model::event::{TimeOfDayWindow, WeekdaySet};
use crate::schedule::time::{time_of_day, SECONDS_PER_DAY};

// A one-off longer than a week covers every weekday; more slices add nothing.
const MAX_DAY_SLICES: usize = 8;

/// Strict interval intersection over values of the same unit.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn windows_overlap(a: &TimeOfDayWindow, b: &TimeOfDayWindow) -> bool {
    overlaps(a.start, a.end, b.start, b.end)
}

/// Part of a one-off event that falls on a single UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySlice {
    pub weekday: Weekday,
    pub window: TimeOfDayWindow,
}

impl DaySlice {
    /// Whether this slice collides with a weekly `window` repeating on `days`.
    pub fn hits_weekly(&self, days: &WeekdaySet, window: &TimeOfDayWindow) -> bool {
        days.contains(self.weekday) && windows_overlap(&self.window, window)
    }
}

/// Splits `[start, end]` at UTC midnights.
///
/// A slice ending at the following midnight gets `window.end == 86400`. A
/// zero-length span yields one zero-length slice.
pub fn day_slices(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DaySlice> {
    let mut slices = Vec::new();
    let mut cursor = start;
    loop {
        let day_start = cursor
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(cursor);
        let next_midnight = day_start + Duration::days(1);
        let slice_end = end.min(next_midnight);
        let end_offset = if slice_end == next_midnight {
            SECONDS_PER_DAY
        } else {
            time_of_day(slice_end)
        };
        slices.push(DaySlice {
            weekday: cursor.weekday(),
            window: TimeOfDayWindow::new(time_of_day(cursor), end_offset),
        });

        if slice_end >= end || slices.len() >= MAX_DAY_SLICES {
            break;
        }
        cursor = slice_end;
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    // Containment-based three-clause form of the same predicate.
    fn three_clause(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
        (a_start <= b_start && a_end > b_start)
            || (a_start < b_end && a_end >= b_end)
            || (a_start > b_start && a_end < b_end)
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn boundary_touch_is_not_overlap() {
        assert!(!overlaps(10, 20, 20, 30));
        assert!(!overlaps(20, 30, 10, 20));
        assert!(overlaps(10, 20, 19, 30));
        assert!(overlaps(10, 20, 10, 20));
        assert!(overlaps(10, 40, 20, 30));
    }

    #[test]
    fn matches_three_clause_form_on_every_small_interval() {
        for a_start in 0..8 {
            for a_end in (a_start + 1)..9 {
                for b_start in 0..8 {
                    for b_end in (b_start + 1)..9 {
                        assert_eq!(
                            overlaps(a_start, a_end, b_start, b_end),
                            three_clause(a_start, a_end, b_start, b_end),
                            "a=[{a_start},{a_end}] b=[{b_start},{b_end}]"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn same_day_span_is_one_slice() {
        let slices = day_slices(at(7, 9, 30), at(7, 10, 30));
        assert_eq!(
            slices,
            vec![DaySlice {
                weekday: Weekday::Mon,
                window: TimeOfDayWindow::new(34_200, 37_800),
            }]
        );
    }

    #[test]
    fn midnight_crossing_span_splits_per_day() {
        let slices = day_slices(at(7, 23, 0), at(8, 1, 0));
        assert_eq!(
            slices,
            vec![
                DaySlice {
                    weekday: Weekday::Mon,
                    window: TimeOfDayWindow::new(82_800, SECONDS_PER_DAY),
                },
                DaySlice {
                    weekday: Weekday::Tue,
                    window: TimeOfDayWindow::new(0, 3_600),
                },
            ]
        );
    }

    #[test]
    fn span_ending_at_midnight_stays_on_its_day() {
        let slices = day_slices(at(7, 22, 0), at(8, 0, 0));
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].weekday, Weekday::Mon);
        assert_eq!(slices[0].window.end, SECONDS_PER_DAY);
    }

    #[test]
    fn long_span_is_capped() {
        let slices = day_slices(at(1, 0, 0), at(31, 0, 0));
        assert_eq!(slices.len(), MAX_DAY_SLICES);
    }

    #[test]
    fn zero_length_span_yields_point_slice() {
        let slices = day_slices(at(9, 12, 0), at(9, 12, 0));
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].window, TimeOfDayWindow::new(43_200, 43_200));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..1000, b in 0i64..1000, c in 0i64..1000, d in 0i64..1000) {
            prop_assert_eq!(overlaps(a, b, c, d), overlaps(c, d, a, b));
        }

        #[test]
        fn overlap_matches_three_clause_form(
            a_start in 0i64..86_400,
            a_len in 1i64..86_400,
            b_start in 0i64..86_400,
            b_len in 1i64..86_400,
        ) {
            let (a_end, b_end) = (a_start + a_len, b_start + b_len);
            prop_assert_eq!(
                overlaps(a_start, a_end, b_start, b_end),
                three_clause(a_start, a_end, b_start, b_end)
            );
        }

        #[test]
        fn slices_cover_the_span(start in 0i64..(365 * 86_400), len in 0i64..(3 * 86_400)) {
            let base = at(1, 0, 0);
            let from = base + Duration::seconds(start);
            let to = from + Duration::seconds(len);
            let slices = day_slices(from, to);
            let covered: i64 = slices
                .iter()
                .map(|slice| i64::from(slice.window.end - slice.window.start))
                .sum();
            prop_assert_eq!(covered, len);
            prop_assert_eq!(slices[0].weekday, from.weekday());
        }
    }
}
