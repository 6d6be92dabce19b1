use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::double_option;
use crate::entities::ticket_entity;
use crate::utils::{DayRule, WeekSchedule};

/// 一周七天的布尔标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct WeekdayFlags {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl WeekdayFlags {
    pub fn get(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn all() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
        }
    }

    fn from_schedule(schedule: &WeekSchedule, pick: impl Fn(DayRule) -> bool) -> Self {
        Self {
            monday: pick(schedule[Weekday::Mon]),
            tuesday: pick(schedule[Weekday::Tue]),
            wednesday: pick(schedule[Weekday::Wed]),
            thursday: pick(schedule[Weekday::Thu]),
            friday: pick(schedule[Weekday::Fri]),
            saturday: pick(schedule[Weekday::Sat]),
            sunday: pick(schedule[Weekday::Sun]),
        }
    }
}

/// 由 can_draw / must_draw 两组标记合成周规则; 未提供的一组沿用 base
pub fn merge_schedule(
    base: WeekSchedule,
    can_draw: Option<&WeekdayFlags>,
    must_draw: Option<&WeekdayFlags>,
) -> WeekSchedule {
    let mut schedule = base;
    for (day, rule) in base.iter() {
        schedule[day] = DayRule::new(
            can_draw.map_or(rule.can_draw, |f| f.get(day)),
            must_draw.map_or(rule.must_draw, |f| f.get(day)),
        );
    }
    schedule
}

/// 创建 ticket 请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateTicketRequest {
    pub title: String,
    /// 默认 true
    pub recurring: Option<bool>,
    /// 默认 1
    pub frequency: Option<i32>,
    pub deadline: Option<NaiveDate>,
    /// 默认每天可抽
    pub can_draw: Option<WeekdayFlags>,
    /// 默认不强制
    pub must_draw: Option<WeekdayFlags>,
}

/// 更新 ticket 请求 (仅更新出现的字段; deadline / done 可显式置 null)
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub recurring: Option<bool>,
    pub frequency: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub deadline: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub done: Option<Option<DateTime<Utc>>>,
    pub can_draw: Option<WeekdayFlags>,
    pub must_draw: Option<WeekdayFlags>,
}

impl UpdateTicketRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.recurring.is_none()
            && self.frequency.is_none()
            && self.deadline.is_none()
            && self.done.is_none()
            && self.can_draw.is_none()
            && self.must_draw.is_none()
    }
}

/// ticket 响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub recurring: bool,
    pub done: Option<DateTime<Utc>>,
    pub last_drawn: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub frequency: i32,
    pub can_draw: WeekdayFlags,
    pub must_draw: WeekdayFlags,
}

impl From<ticket_entity::Model> for TicketResponse {
    fn from(m: ticket_entity::Model) -> Self {
        let schedule = m.schedule();
        TicketResponse {
            id: m.id,
            created_at: m.created_at,
            title: m.title,
            recurring: m.recurring,
            done: m.done,
            last_drawn: m.last_drawn,
            deadline: m.deadline,
            frequency: m.frequency,
            can_draw: WeekdayFlags::from_schedule(&schedule, |r| r.can_draw),
            must_draw: WeekdayFlags::from_schedule(&schedule, |r| r.must_draw),
        }
    }
}

/// 查询可抽取 ticket 的参数
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EligibleQuery {
    /// monday..sunday / mon..sun, 默认今天
    pub weekday: Option<String>,
    /// true 时忽略 deadline 相关的分层
    #[serde(default)]
    pub ignore_deadlines: bool,
}

/// 单个 ticket 是否可抽取
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EligibilityResponse {
    pub ticket_id: Uuid,
    pub weekday: String,
    pub eligible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_and_missing() {
        let req: UpdateTicketRequest = serde_json::from_str(r#"{"deadline": null}"#).unwrap();
        assert_eq!(req.deadline, Some(None));
        assert_eq!(req.done, None);
        assert!(!req.is_empty());

        let req: UpdateTicketRequest = serde_json::from_str("{}").unwrap();
        assert!(req.is_empty());

        let req: UpdateTicketRequest =
            serde_json::from_str(r#"{"done": "2026-10-17T08:00:00Z"}"#).unwrap();
        assert!(matches!(req.done, Some(Some(_))));
    }

    #[test]
    fn test_merge_schedule_keeps_unspecified_half() {
        let base = WeekSchedule::every_day();
        let must = WeekdayFlags {
            friday: true,
            ..Default::default()
        };
        let merged = merge_schedule(base, None, Some(&must));

        assert!(merged[Weekday::Fri].must_draw);
        assert!(merged[Weekday::Fri].can_draw);
        assert!(!merged[Weekday::Mon].must_draw);
        assert!(merged[Weekday::Mon].can_draw);
    }
}
