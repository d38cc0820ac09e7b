//! 间隔复习：按技能掌握度计算下次复习日期

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::adaptive::config::ReviewConfig;
use crate::adaptive::types::StudentAbility;

/// Base interval for a mastery value. Bins are lower-inclusive.
pub fn interval_days(mastery: f64, config: &ReviewConfig) -> i64 {
    config
        .intervals
        .iter()
        .find(|row| mastery < row.upper_bound)
        .map(|row| row.days)
        .unwrap_or(config.max_interval_days)
}

pub fn schedule_review(
    mastery: f64,
    last_review: Option<NaiveDate>,
    today: NaiveDate,
) -> NaiveDate {
    schedule_review_with(mastery, last_review, today, &ReviewConfig::default())
}

pub fn schedule_review_with(
    mastery: f64,
    last_review: Option<NaiveDate>,
    today: NaiveDate,
    config: &ReviewConfig,
) -> NaiveDate {
    let mut days = interval_days(mastery, config);
    if let Some(last) = last_review {
        let elapsed = (today - last).num_days().max(0);
        if elapsed < days {
            days = elapsed + 1;
        }
    }
    today + Duration::days(days)
}

pub fn is_due(next_review: NaiveDate, today: NaiveDate) -> bool {
    next_review <= today
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReview {
    pub skill_id: String,
    pub mastery: f64,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
}

/// Practiced skills whose review date has arrived, most overdue first.
pub fn due_skills(
    ability: &StudentAbility,
    today: NaiveDate,
    config: &ReviewConfig,
) -> Vec<DueReview> {
    let mut due: Vec<DueReview> = ability
        .last_practice_date
        .iter()
        .filter_map(|(skill_id, practiced_at)| {
            let mastery = ability.mastery_of(skill_id);
            let due_date =
                practiced_at.date_naive() + Duration::days(interval_days(mastery, config));
            is_due(due_date, today).then(|| DueReview {
                skill_id: skill_id.clone(),
                mastery,
                due_date,
                days_overdue: (today - due_date).num_days(),
            })
        })
        .collect();
    due.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| a.skill_id.cmp(&b.skill_id))
    });
    due
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn interval_table_bins() {
        let cfg = ReviewConfig::default();
        assert_eq!(interval_days(0.0, &cfg), 1);
        assert_eq!(interval_days(0.29, &cfg), 1);
        assert_eq!(interval_days(0.3, &cfg), 3);
        assert_eq!(interval_days(0.5, &cfg), 7);
        assert_eq!(interval_days(0.7, &cfg), 14);
        assert_eq!(interval_days(0.85, &cfg), 30);
        assert_eq!(interval_days(1.0, &cfg), 30);
    }

    #[test]
    fn schedule_without_history() {
        assert_eq!(schedule_review(0.2, None, today()), today() + Duration::days(1));
        assert_eq!(schedule_review(0.6, None, today()), today() + Duration::days(7));
        assert_eq!(schedule_review(0.9, None, today()), today() + Duration::days(30));
    }

    #[test]
    fn recent_review_caps_interval() {
        let last = today() - Duration::days(2);
        assert_eq!(schedule_review(0.6, Some(last), today()), today() + Duration::days(3));
        assert_eq!(schedule_review(0.6, Some(today()), today()), today() + Duration::days(1));
    }

    #[test]
    fn old_review_keeps_table_interval() {
        let last = today() - Duration::days(20);
        assert_eq!(schedule_review(0.6, Some(last), today()), today() + Duration::days(7));
    }

    #[test]
    fn due_skills_sorted_by_overdue() {
        let mut ability = StudentAbility::default();
        let practiced = |d: u32| Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap();
        ability.skill_mastery.insert("weak".to_string(), 0.1);
        ability.skill_mastery.insert("mid".to_string(), 0.4);
        ability.skill_mastery.insert("strong".to_string(), 0.95);
        ability.last_practice_date.insert("weak".to_string(), practiced(5));
        ability.last_practice_date.insert("mid".to_string(), practiced(7));
        ability.last_practice_date.insert("strong".to_string(), practiced(1));

        let due = due_skills(&ability, today(), &ReviewConfig::default());
        let ids: Vec<&str> = due.iter().map(|d| d.skill_id.as_str()).collect();
        assert_eq!(ids, vec!["weak", "mid"]);
        assert_eq!(due[0].days_overdue, 4);
        assert_eq!(due[1].days_overdue, 0);
    }
}
