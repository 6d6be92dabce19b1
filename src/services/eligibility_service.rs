//! 可抽取 ticket 的分层查询
//!
//! 某个星期几可抽取的 ticket 分为四层, 按优先级依次为:
//! 1. 已到期 (deadline <= 今天)
//! 2. 当天必抽 (must_draw)
//! 3. 即将到期 (7 天内)
//! 4. 当天可抽 (can_draw)
//!
//! 数据库只负责取出 "当天可抽且未完成" 的 ticket 及其完成记录,
//! 分层判断全部是纯函数, 可以脱离数据库单独测试。

use chrono::{Duration, NaiveDate, Weekday};
use rand::Rng;
use rand::seq::SliceRandom;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::{ticket_draw_entity as draws, ticket_entity as tickets};
use crate::error::{AppError, AppResult};
use crate::services::draw_service::todays_draws;
use crate::utils::{ClockReading, SharedClock};

/// deadline 在此天数之内 (不含今天) 视为即将到期
pub const APPROACHING_DEADLINE_DAYS: i64 = 7;

/// 是否考虑 deadline 分层
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineMode {
    #[default]
    Respect,
    /// 只看星期规则与 frequency, 不做到期相关的分层
    Ignore,
}

impl DeadlineMode {
    pub fn from_ignore_flag(ignore_deadlines: bool) -> Self {
        if ignore_deadlines {
            DeadlineMode::Ignore
        } else {
            DeadlineMode::Respect
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    DeadlineDue,
    MustDraw,
    ApproachingDeadline,
    CanDraw,
}

impl Tier {
    /// 合并顺序
    pub const ORDER: [Tier; 4] = [
        Tier::DeadlineDue,
        Tier::MustDraw,
        Tier::ApproachingDeadline,
        Tier::CanDraw,
    ];

    /// 前两层是必须抽取的, 不受每日数量限制
    pub fn counts_against_quota(self) -> bool {
        matches!(self, Tier::ApproachingDeadline | Tier::CanDraw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::DeadlineDue => "deadline_due",
            Tier::MustDraw => "must_draw",
            Tier::ApproachingDeadline => "approaching_deadline",
            Tier::CanDraw => "can_draw",
        }
    }
}

/// 待判断的 ticket 以及它最近一次完成所在的自然日
#[derive(Debug, Clone)]
pub struct Candidate {
    pub ticket: tickets::Model,
    pub last_completed_on: Option<NaiveDate>,
}

/// 分层判断上下文
#[derive(Debug, Clone, Copy)]
pub struct EligibilityContext {
    pub weekday: Weekday,
    pub today: NaiveDate,
    pub deadline_mode: DeadlineMode,
}

impl EligibilityContext {
    pub fn new(weekday: Weekday, today: NaiveDate, deadline_mode: DeadlineMode) -> Self {
        Self {
            weekday,
            today,
            deadline_mode,
        }
    }

    /// frequency 按自然日计算: 距最近一次完成已过去至少 frequency 天
    /// (昨天完成的 frequency = 1 的 ticket 今天无论几点都可再抽, 今天完成的则不行)
    pub fn frequency_eligible(&self, frequency: i32, last_completed_on: Option<NaiveDate>) -> bool {
        match last_completed_on {
            None => true,
            Some(day) => (self.today - day).num_days() >= i64::from(frequency.max(1)),
        }
    }

    pub fn deadline_due(&self, ticket: &tickets::Model) -> bool {
        self.deadline_mode == DeadlineMode::Respect
            && ticket.deadline.is_some_and(|d| d <= self.today)
    }

    pub fn deadline_approaching(&self, ticket: &tickets::Model) -> bool {
        let horizon = self.today + Duration::days(APPROACHING_DEADLINE_DAYS);
        self.deadline_mode == DeadlineMode::Respect
            && ticket
                .deadline
                .is_some_and(|d| d > self.today && d <= horizon)
    }

    pub fn matches(&self, tier: Tier, candidate: &Candidate) -> bool {
        let ticket = &candidate.ticket;
        let rule = ticket.day_rule(self.weekday);
        if !ticket.is_open() || !rule.eligible() {
            return false;
        }
        let frequency_ok = || self.frequency_eligible(ticket.frequency, candidate.last_completed_on);

        match tier {
            // 已过期的 ticket 在完成前一直优先, 不看 frequency
            Tier::DeadlineDue => self.deadline_due(ticket),
            Tier::MustDraw => rule.must_draw && !self.deadline_due(ticket) && frequency_ok(),
            Tier::ApproachingDeadline => {
                !rule.must_draw && self.deadline_approaching(ticket) && frequency_ok()
            }
            Tier::CanDraw => {
                !rule.must_draw
                    && !self.deadline_due(ticket)
                    && !self.deadline_approaching(ticket)
                    && frequency_ok()
            }
        }
    }

    /// ticket 所属的全部分层
    pub fn tiers_of(&self, candidate: &Candidate) -> Vec<Tier> {
        Tier::ORDER
            .into_iter()
            .filter(|tier| self.matches(*tier, candidate))
            .collect()
    }
}

/// 按层排序: deadline 升序 (空值在后), last_drawn 升序 (空值在前), 其余随机;
/// 可抽层中循环 ticket 排在一次性 ticket 之前
pub fn order_tier<R: Rng + ?Sized>(tier: Tier, list: &mut [tickets::Model], rng: &mut R) {
    list.shuffle(rng);
    list.sort_by(|a, b| {
        let recurring_first = if tier == Tier::CanDraw {
            b.recurring.cmp(&a.recurring)
        } else {
            std::cmp::Ordering::Equal
        };
        recurring_first
            .then_with(|| (a.deadline.is_none(), a.deadline).cmp(&(b.deadline.is_none(), b.deadline)))
            .then_with(|| a.last_drawn.cmp(&b.last_drawn))
    });
}

/// 四层结果, 同一 ticket 可能出现在多层中 (合并时去重)
#[derive(Debug, Clone, Default)]
pub struct TierLists {
    pub deadline_due: Vec<tickets::Model>,
    pub must_draw: Vec<tickets::Model>,
    pub approaching_deadline: Vec<tickets::Model>,
    pub can_draw: Vec<tickets::Model>,
}

impl TierLists {
    pub fn get(&self, tier: Tier) -> &[tickets::Model] {
        match tier {
            Tier::DeadlineDue => &self.deadline_due,
            Tier::MustDraw => &self.must_draw,
            Tier::ApproachingDeadline => &self.approaching_deadline,
            Tier::CanDraw => &self.can_draw,
        }
    }

    fn get_mut(&mut self, tier: Tier) -> &mut Vec<tickets::Model> {
        match tier {
            Tier::DeadlineDue => &mut self.deadline_due,
            Tier::MustDraw => &mut self.must_draw,
            Tier::ApproachingDeadline => &mut self.approaching_deadline,
            Tier::CanDraw => &mut self.can_draw,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &[tickets::Model])> {
        Tier::ORDER.into_iter().map(move |tier| (tier, self.get(tier)))
    }

    /// 按层顺序展开并去重, 跳过 exclude 中的 ticket
    pub fn flatten(&self, exclude: &HashSet<Uuid>) -> Vec<tickets::Model> {
        let mut seen = exclude.clone();
        self.iter()
            .flat_map(|(_, list)| list.iter())
            .filter(|t| seen.insert(t.id))
            .cloned()
            .collect()
    }
}

/// 将候选 ticket 分层并排序
pub fn classify<R: Rng + ?Sized>(
    ctx: &EligibilityContext,
    candidates: &[Candidate],
    rng: &mut R,
) -> TierLists {
    let mut lists = TierLists::default();
    for candidate in candidates {
        for tier in ctx.tiers_of(candidate) {
            lists.get_mut(tier).push(candidate.ticket.clone());
        }
    }
    for tier in Tier::ORDER {
        order_tier(tier, lists.get_mut(tier), rng);
    }
    lists
}

/// 未完成且在 weekday 可抽 (can_draw 或 must_draw) 的 ticket
pub fn drawable_on(weekday: Weekday) -> Condition {
    Condition::all()
        .add(tickets::Column::Done.is_null())
        .add(
            Condition::any()
                .add(tickets::Column::can_draw(weekday).eq(true))
                .add(tickets::Column::must_draw(weekday).eq(true)),
        )
}

#[derive(Clone)]
pub struct EligibilityService {
    pool: DatabaseConnection,
    clock: SharedClock,
}

impl EligibilityService {
    pub fn new(pool: DatabaseConnection, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// 今天是星期几 (固定时区)
    pub fn today_weekday(&self) -> Weekday {
        self.clock.today_weekday()
    }

    /// 获取 weekday 的四层可抽取 ticket (不排除今天已抽取的)
    pub async fn tiers<C: ConnectionTrait>(
        &self,
        db: &C,
        reading: &ClockReading,
        weekday: Weekday,
        deadline_mode: DeadlineMode,
    ) -> AppResult<TierLists> {
        let open = tickets::Entity::find()
            .filter(drawable_on(weekday))
            .all(db)
            .await?;
        let candidates = Self::with_completions(db, reading, open).await?;

        let ctx = EligibilityContext::new(weekday, reading.today, deadline_mode);
        let lists = classify(&ctx, &candidates, &mut rand::thread_rng());

        log::debug!(
            "Eligible tickets for {weekday}: {}",
            lists
                .iter()
                .map(|(tier, list)| format!("{}={}", tier.as_str(), list.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(lists)
    }

    /// 今天已抽取的 ticket; 查询的不是今天的星期几时为空
    async fn drawn_today_on(
        &self,
        reading: &ClockReading,
        weekday: Weekday,
    ) -> AppResult<HashSet<Uuid>> {
        if weekday != reading.weekday {
            return Ok(HashSet::new());
        }
        Ok(todays_draws(&self.pool, reading)
            .await?
            .into_iter()
            .map(|d| d.ticket_id)
            .collect())
    }

    /// 列出 weekday 可抽取的 ticket, 按层顺序去重;
    /// weekday 是今天时排除今天已抽取的
    pub async fn list_eligible(
        &self,
        weekday: Weekday,
        deadline_mode: DeadlineMode,
    ) -> AppResult<Vec<tickets::Model>> {
        let reading = self.clock.reading();
        let lists = self
            .tiers(&self.pool, &reading, weekday, deadline_mode)
            .await?;
        let drawn = self.drawn_today_on(&reading, weekday).await?;

        Ok(lists.flatten(&drawn))
    }

    /// 单个 ticket 在 weekday 是否可抽取 (与 list_eligible 的结果一致)
    pub async fn is_eligible(&self, ticket_id: Uuid, weekday: Weekday) -> AppResult<bool> {
        let reading = self.clock.reading();
        let ticket = tickets::Entity::find_by_id(ticket_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;

        if self
            .drawn_today_on(&reading, weekday)
            .await?
            .contains(&ticket_id)
        {
            return Ok(false);
        }

        let candidates = Self::with_completions(&self.pool, &reading, vec![ticket]).await?;
        let ctx = EligibilityContext::new(weekday, reading.today, DeadlineMode::Respect);
        Ok(candidates
            .first()
            .is_some_and(|c| !ctx.tiers_of(c).is_empty()))
    }

    /// 为每个 ticket 附上最近一次完成 (done = true) 的自然日; skipped 不计入
    async fn with_completions<C: ConnectionTrait>(
        db: &C,
        reading: &ClockReading,
        list: Vec<tickets::Model>,
    ) -> AppResult<Vec<Candidate>> {
        if list.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = list.iter().map(|t| t.id).collect();
        let completed = draws::Entity::find()
            .filter(draws::Column::Done.eq(true))
            .filter(draws::Column::TicketId.is_in(ids))
            .all(db)
            .await?;

        let mut last_completed: HashMap<Uuid, NaiveDate> = HashMap::new();
        for draw in completed {
            let day = reading.local_date(draw.created_at);
            last_completed
                .entry(draw.ticket_id)
                .and_modify(|d| *d = (*d).max(day))
                .or_insert(day);
        }

        Ok(list
            .into_iter()
            .map(|ticket| Candidate {
                last_completed_on: last_completed.get(&ticket.id).copied(),
                ticket,
            })
            .collect())
    }
}
