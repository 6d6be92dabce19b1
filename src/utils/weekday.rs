//! 星期相关的辅助类型
//!
//! 数据库里每个 ticket 有 14 个布尔列 (`can_draw_<day>` / `must_draw_<day>`),
//! 业务代码统一通过 [`WeekSchedule`] 按 [`Weekday`] 下标访问, 不做字符串拼列名。

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use utoipa::ToSchema;

/// 周一到周日
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// 小写英文全称, 与列名后缀一致
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// 解析星期, 支持全称与三字母缩写, 忽略大小写
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// 某一天的抽取规则
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayRule {
    /// 当天可以被抽到 (受每日数量限制)
    pub can_draw: bool,
    /// 当天必须抽到 (不占每日数量限制)
    pub must_draw: bool,
}

impl DayRule {
    pub fn new(can_draw: bool, must_draw: bool) -> Self {
        Self {
            can_draw,
            must_draw,
        }
    }

    /// must_draw 隐含 can_draw
    pub fn eligible(&self) -> bool {
        self.can_draw || self.must_draw
    }
}

/// 一周七天的规则表, 以 [`Weekday`] 为下标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekSchedule([DayRule; 7]);

impl WeekSchedule {
    pub fn get(&self, day: Weekday) -> DayRule {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, day: Weekday, rule: DayRule) {
        self.0[day.num_days_from_monday() as usize] = rule;
    }

    /// 每天都允许抽取
    pub fn every_day() -> Self {
        Self([DayRule::new(true, false); 7])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DayRule)> + '_ {
        WEEKDAYS.iter().map(move |day| (*day, self.get(*day)))
    }
}

impl Index<Weekday> for WeekSchedule {
    type Output = DayRule;

    fn index(&self, day: Weekday) -> &DayRule {
        &self.0[day.num_days_from_monday() as usize]
    }
}

impl IndexMut<Weekday> for WeekSchedule {
    fn index_mut(&mut self, day: Weekday) -> &mut DayRule {
        &mut self.0[day.num_days_from_monday() as usize]
    }
}
