use chrono::{DateTime, NaiveDate, Utc, Weekday};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::utils::{DayRule, WEEKDAYS, WeekSchedule};

/// Ticket 实体
/// 说明:
/// - recurring = false 时, 任意一次抽取完成即视为整个 ticket 完成
/// - frequency: 两次完成之间至少间隔的自然日天数 (>= 1)
/// - done 非空表示已完成, 不再参与任何抽取
/// - can_draw_* / must_draw_*: 每周七天的抽取规则, must_draw 隐含 can_draw
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub recurring: bool,
    pub done: Option<DateTime<Utc>>,
    /// 最近一次被抽中的时间
    pub last_drawn: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub frequency: i32,
    pub can_draw_monday: bool,
    pub can_draw_tuesday: bool,
    pub can_draw_wednesday: bool,
    pub can_draw_thursday: bool,
    pub can_draw_friday: bool,
    pub can_draw_saturday: bool,
    pub can_draw_sunday: bool,
    pub must_draw_monday: bool,
    pub must_draw_tuesday: bool,
    pub must_draw_wednesday: bool,
    pub must_draw_thursday: bool,
    pub must_draw_friday: bool,
    pub must_draw_saturday: bool,
    pub must_draw_sunday: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_draws::Entity")]
    Draws,
}

impl Related<super::ticket_draws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Draws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Column {
    pub fn can_draw(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Column::CanDrawMonday,
            Weekday::Tue => Column::CanDrawTuesday,
            Weekday::Wed => Column::CanDrawWednesday,
            Weekday::Thu => Column::CanDrawThursday,
            Weekday::Fri => Column::CanDrawFriday,
            Weekday::Sat => Column::CanDrawSaturday,
            Weekday::Sun => Column::CanDrawSunday,
        }
    }

    pub fn must_draw(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Column::MustDrawMonday,
            Weekday::Tue => Column::MustDrawTuesday,
            Weekday::Wed => Column::MustDrawWednesday,
            Weekday::Thu => Column::MustDrawThursday,
            Weekday::Fri => Column::MustDrawFriday,
            Weekday::Sat => Column::MustDrawSaturday,
            Weekday::Sun => Column::MustDrawSunday,
        }
    }
}

impl Model {
    /// 是否仍未完成
    pub fn is_open(&self) -> bool {
        self.done.is_none()
    }

    pub fn day_rule(&self, day: Weekday) -> DayRule {
        match day {
            Weekday::Mon => DayRule::new(self.can_draw_monday, self.must_draw_monday),
            Weekday::Tue => DayRule::new(self.can_draw_tuesday, self.must_draw_tuesday),
            Weekday::Wed => DayRule::new(self.can_draw_wednesday, self.must_draw_wednesday),
            Weekday::Thu => DayRule::new(self.can_draw_thursday, self.must_draw_thursday),
            Weekday::Fri => DayRule::new(self.can_draw_friday, self.must_draw_friday),
            Weekday::Sat => DayRule::new(self.can_draw_saturday, self.must_draw_saturday),
            Weekday::Sun => DayRule::new(self.can_draw_sunday, self.must_draw_sunday),
        }
    }

    pub fn schedule(&self) -> WeekSchedule {
        let mut schedule = WeekSchedule::default();
        for day in WEEKDAYS {
            schedule.set(day, self.day_rule(day));
        }
        schedule
    }
}

impl ActiveModel {
    /// 写入一周的 can_draw_* / must_draw_* 标记
    pub fn set_schedule(&mut self, schedule: &WeekSchedule) {
        for (day, rule) in schedule.iter() {
            self.set(Column::can_draw(day), rule.can_draw.into());
            self.set(Column::must_draw(day), rule.must_draw.into());
        }
    }

    /// 标记为已完成
    pub fn mark_done(&mut self, at: DateTime<Utc>) {
        self.done = Set(Some(at));
    }
}
