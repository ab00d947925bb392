// src/process/classify.rs
use chrono::NaiveDateTime;

use super::month::MonthWindow;
use crate::config::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start falls inside the reference month.
    InMonth,
    /// Start falls just before month start, inside the tolerance.
    Tolerance,
    /// No usable start, but a setup/changeover/maintenance activity.
    UndatedActivity,
    OutOfMonth,
    UndatedIrrelevant,
    /// Order code is a placeholder or a leaked header label.
    ExcludedOrder,
}

impl Decision {
    pub fn keep(self) -> bool {
        matches!(
            self,
            Decision::InMonth | Decision::Tolerance | Decision::UndatedActivity
        )
    }
}

pub fn classify(
    start: Option<NaiveDateTime>,
    description: &str,
    order_code: &str,
    window: &MonthWindow,
    cfg: &ScheduleConfig,
) -> Decision {
    match start {
        Some(t) if window.contains(t) => Decision::InMonth,
        Some(t) if window.in_start_tolerance(t, cfg.start_tolerance()) => Decision::Tolerance,
        Some(_) => Decision::OutOfMonth,
        None => classify_undated(description, order_code, cfg),
    }
}

fn classify_undated(description: &str, order_code: &str, cfg: &ScheduleConfig) -> Decision {
    let code = order_code.trim();
    if cfg.excluded_order_codes.iter().any(|x| x == code) {
        return Decision::ExcludedOrder;
    }
    let desc = description.to_lowercase();
    if cfg
        .relevant_keywords
        .iter()
        .any(|k| desc.contains(&k.to_lowercase()))
    {
        Decision::UndatedActivity
    } else {
        Decision::UndatedIrrelevant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn feb() -> MonthWindow {
        MonthWindow::new(2025, 2).unwrap()
    }

    fn at(m: u32, d: u32, h: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, m, d)
            .and_then(|x| x.and_hms_opt(h, 0, 0))
    }

    #[test]
    fn undated_setup_row_is_kept() {
        let cfg = ScheduleConfig::default();
        let d = classify(None, "Setup de troca de bitola", "12345", &feb(), &cfg);
        assert_eq!(d, Decision::UndatedActivity);
        assert!(d.keep());

        let d = classify(None, "Manutenção PREVENTIVA", "", &feb(), &cfg);
        assert!(d.keep());
    }

    #[test]
    fn label_leak_is_dropped_regardless_of_description() {
        let cfg = ScheduleConfig::default();
        for code in ["OP", "M03", "-", " OP "] {
            let d = classify(None, "Setup de troca de bitola", code, &feb(), &cfg);
            assert_eq!(d, Decision::ExcludedOrder, "code {:?}", code);
            assert!(!d.keep());
        }
    }

    #[test]
    fn undated_without_keyword_is_dropped() {
        let cfg = ScheduleConfig::default();
        let d = classify(None, "CA50 10mm", "555", &feb(), &cfg);
        assert_eq!(d, Decision::UndatedIrrelevant);
    }

    #[test]
    fn dated_rows_follow_the_window() {
        let cfg = ScheduleConfig::default();
        assert_eq!(classify(at(2, 10, 6), "", "1", &feb(), &cfg), Decision::InMonth);
        assert_eq!(classify(at(1, 31, 23), "", "1", &feb(), &cfg), Decision::Tolerance);
        assert_eq!(classify(at(1, 31, 22), "", "1", &feb(), &cfg), Decision::OutOfMonth);
        assert_eq!(classify(at(3, 1, 0), "", "1", &feb(), &cfg), Decision::OutOfMonth);
    }

    #[test]
    fn whole_day_tolerance_when_configured() {
        let cfg = ScheduleConfig {
            start_tolerance_minutes: 24 * 60,
            ..ScheduleConfig::default()
        };
        assert_eq!(classify(at(1, 31, 0), "", "1", &feb(), &cfg), Decision::Tolerance);
        assert_eq!(classify(at(1, 30, 23), "", "1", &feb(), &cfg), Decision::OutOfMonth);
    }
}
