// src/process/month.rs
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// First and last instant (second resolution) of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let last = next_first.pred_opt()?;
        Some(Self {
            year,
            month,
            start: first.and_hms_opt(0, 0, 0)?,
            end: last.and_hms_opt(23, 59, 59)?,
        })
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t <= self.end
    }

    /// Instants in `[start - tolerance, start)`, absorbed at the lower boundary.
    pub fn in_start_tolerance(&self, t: NaiveDateTime, tolerance: Duration) -> bool {
        t >= self.start - tolerance && t < self.start
    }
}

/// Outcome of the month vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthVote {
    pub year: i32,
    pub month: u32,
    pub count: usize,
    /// Another month reached the same count; the first one seen was kept.
    pub tied: bool,
    /// `(year, month) → count`, in first-seen order.
    pub buckets: Vec<((i32, u32), usize)>,
}

impl MonthVote {
    pub fn window(&self) -> Option<MonthWindow> {
        MonthWindow::new(self.year, self.month)
    }
}

/// Statistical mode of `(year, month)` over the given start instants.
/// Ties go to the bucket encountered first.
pub fn detect_reference_month<I>(starts: I) -> Option<MonthVote>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut buckets: Vec<((i32, u32), usize)> = Vec::new();
    for t in starts {
        let key = (t.year(), t.month());
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => buckets.push((key, 1)),
        }
    }

    let mut best: Option<((i32, u32), usize)> = None;
    for &(key, count) in &buckets {
        match best {
            Some((_, max)) if count <= max => {}
            _ => best = Some((key, count)),
        }
    }

    let ((year, month), count) = best?;
    let tied = buckets
        .iter()
        .filter(|(_, n)| *n == count)
        .count()
        > 1;

    Some(MonthVote {
        year,
        month,
        count,
        tied,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn mode_wins() {
        let starts = vec![
            at(2025, 1, 30),
            at(2025, 2, 1),
            at(2025, 1, 31),
            at(2025, 2, 3),
            at(2025, 2, 10),
            at(2025, 3, 1),
            at(2025, 2, 20),
            at(2025, 2, 27),
        ];
        let vote = detect_reference_month(starts).unwrap();
        assert_eq!((vote.year, vote.month, vote.count), (2025, 2, 5));
        assert!(!vote.tied);
        assert_eq!(vote.buckets[0], ((2025, 1), 2));
    }

    #[test]
    fn tie_keeps_first_seen_and_flags_it() {
        let starts = vec![at(2025, 3, 1), at(2025, 2, 1), at(2025, 2, 2), at(2025, 3, 2)];
        let vote = detect_reference_month(starts).unwrap();
        assert_eq!((vote.year, vote.month), (2025, 3));
        assert!(vote.tied);
    }

    #[test]
    fn no_dates_no_month() {
        assert!(detect_reference_month(Vec::new()).is_none());
    }

    #[test]
    fn window_bounds() {
        let feb = MonthWindow::new(2024, 2).unwrap();
        assert_eq!(feb.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(23, 59, 59).unwrap());

        let dec = MonthWindow::new(2025, 12).unwrap();
        assert_eq!(dec.end.date(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(MonthWindow::new(2025, 13).is_none());
    }

    #[test]
    fn tolerance_boundary_at_23h() {
        let feb = MonthWindow::new(2025, 2).unwrap();
        let tol = Duration::minutes(60);
        let jan31 = |h, m| {
            NaiveDate::from_ymd_opt(2025, 1, 31)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };
        assert!(!feb.in_start_tolerance(jan31(22, 59), tol));
        assert!(feb.in_start_tolerance(jan31(23, 0), tol));
        assert!(feb.in_start_tolerance(jan31(23, 59), tol));
        assert!(!feb.in_start_tolerance(feb.start, tol));
        assert!(feb.contains(feb.start));
        assert!(feb.contains(feb.end));
        assert!(!feb.contains(feb.end + Duration::seconds(1)));
    }
}
