use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{ticket_draw_entity as draws, ticket_entity as tickets};
use crate::error::{AppError, AppResult};
use crate::services::eligibility_service::{DeadlineMode, EligibilityService};
use crate::services::quota_service::QuotaService;
use crate::services::selection::{assemble_selection, tier_of};
use crate::utils::{ClockReading, PaginationInfo, PaginationParams, SharedClock};

/// 今天至少要有这么多条抽取记录, 否则视为可抽取的 ticket 不足
pub const MIN_DAILY_DRAWS: u64 = 5;

/// 今天 (固定时区下的自然日) 创建的全部抽取记录
pub async fn todays_draws<C: ConnectionTrait>(
    db: &C,
    reading: &ClockReading,
) -> AppResult<Vec<draws::Model>> {
    let (start, end) = reading.day_bounds();
    let list = draws::Entity::find()
        .filter(draws::Column::CreatedAt.gte(start))
        .filter(draws::Column::CreatedAt.lt(end))
        .order_by_asc(draws::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(list)
}

#[derive(Clone)]
pub struct DrawService {
    pool: DatabaseConnection,
    clock: SharedClock,
    eligibility: EligibilityService,
    // 同一进程内串行执行 "生成今日抽取", 防止重复生成
    create_lock: Arc<Mutex<()>>,
}

impl DrawService {
    pub fn new(pool: DatabaseConnection, clock: SharedClock) -> Self {
        let eligibility = EligibilityService::new(pool.clone(), clock.clone());
        Self {
            pool,
            clock,
            eligibility,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 生成今天的抽取
    ///
    /// 逻辑:
    /// 1. 读取今天已有的抽取记录
    /// 2. 根据近 7 天完成率计算每日数量
    /// 3. 按 已到期 -> 必抽 -> 即将到期 -> 可抽 的顺序合并, 跳过今天已抽取的
    /// 4. 为新选中的 ticket 写抽取记录并更新 last_drawn
    ///
    /// 一个都没有新增且今天总数不足 5 条时返回 InsufficientEligibleTickets, 不做任何写入
    pub async fn create_todays_draws(&self) -> AppResult<Vec<draws::Model>> {
        let _guard = self.create_lock.lock().await;
        let reading = self.clock.reading();
        let txn = self.pool.begin().await?;

        let existing = todays_draws(&txn, &reading).await?;
        let existing_count = existing.len() as u64;
        let mut taken: HashSet<Uuid> = existing.iter().map(|d| d.ticket_id).collect();

        let quota = QuotaService::estimate_at(&txn, reading.now).await?;
        let tiers = self
            .eligibility
            .tiers(&txn, &reading, reading.weekday, DeadlineMode::Respect)
            .await?;
        let selected = assemble_selection(&tiers, &mut taken, quota as usize);

        if selected.is_empty() && existing_count < MIN_DAILY_DRAWS {
            log::warn!(
                "No tickets could be drawn for {} ({existing_count} existing draws)",
                reading.today
            );
            txn.rollback().await?;
            return Err(AppError::InsufficientEligibleTickets {
                existing: existing_count,
            });
        }

        let mut created = Vec::with_capacity(selected.len());
        for ticket in selected {
            log::debug!(
                "Drawing ticket {} ({}) from tier {}",
                ticket.id,
                ticket.title,
                tier_of(&tiers, ticket.id).map_or("unknown", |t| t.as_str())
            );

            let draw = draws::ActiveModel {
                id: Set(Uuid::new_v4()),
                created_at: Set(reading.now),
                ticket_id: Set(ticket.id),
                done: Set(false),
                skipped: Set(false),
            }
            .insert(&txn)
            .await?;

            let mut am = ticket.into_active_model();
            am.last_drawn = Set(Some(reading.now));
            am.update(&txn).await?;

            created.push(draw);
        }

        txn.commit().await?;

        log::info!(
            "Created {} draws for {} (quota {quota}, {existing_count} already existed)",
            created.len(),
            reading.today
        );
        Ok(created)
    }

    /// 今天的抽取记录 (附带 ticket)
    pub async fn list_todays_draws(
        &self,
    ) -> AppResult<Vec<(draws::Model, Option<tickets::Model>)>> {
        let (start, end) = self.clock.reading().day_bounds();
        let list = draws::Entity::find()
            .find_also_related(tickets::Entity)
            .filter(draws::Column::CreatedAt.gte(start))
            .filter(draws::Column::CreatedAt.lt(end))
            .order_by_asc(draws::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(list)
    }

    /// 抽取历史 (分页, 最新在前)
    pub async fn list_draws(
        &self,
        params: &PaginationParams,
    ) -> AppResult<(Vec<(draws::Model, Option<tickets::Model>)>, PaginationInfo)> {
        let total = draws::Entity::find().count(&self.pool).await?;
        let items = draws::Entity::find()
            .find_also_related(tickets::Entity)
            .order_by_desc(draws::Column::CreatedAt)
            .limit(params.get_per_page())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        Ok((items, params.info(total)))
    }

    /// 清空全部抽取记录
    pub async fn clear_draws(&self) -> AppResult<u64> {
        let res = draws::Entity::delete_many().exec(&self.pool).await?;
        log::info!("Cleared {} draws", res.rows_affected);
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::{at, clock_at, insert_draw, insert_ticket, setup_db, ticket};
    use crate::utils::{DayRule, FixedClock, WeekSchedule, parse_utc_offset};
    use chrono::Weekday;

    async fn ticket_by_id(db: &DatabaseConnection, id: Uuid) -> tickets::Model {
        tickets::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_todays_draws_respects_quota() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock.clone());

        let mut must = ticket("must");
        let mut schedule = WeekSchedule::default();
        schedule[Weekday::Sat] = DayRule::new(false, true);
        must.set_schedule(&schedule);
        let must = insert_ticket(&db, must).await;
        for i in 0..9 {
            insert_ticket(&db, ticket(&format!("can-{i}"))).await;
        }

        let created = service.create_todays_draws().await.unwrap();

        assert_eq!(created.len(), 5);
        assert_eq!(created[0].ticket_id, must.id);
        assert!(created.iter().all(|d| !d.done && !d.skipped));
        assert_eq!(
            ticket_by_id(&db, must.id).await.last_drawn,
            Some(at("2026-10-17T09:00:00Z"))
        );

        // 再次调用: 已满 quota, 没有新增但今天已有 5 条, 不报错
        clock.set(at("2026-10-17T10:00:00Z"));
        let again = service.create_todays_draws().await.unwrap();
        assert!(again.is_empty());
        assert_eq!(service.list_todays_draws().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_insufficient_tickets_performs_no_writes() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock);

        let drawn = insert_ticket(&db, ticket("drawn")).await;
        insert_draw(&db, drawn.id, at("2026-10-17T07:00:00Z"), false, false).await;
        let mut finished = ticket("finished");
        finished.done = Set(Some(at("2026-10-01T00:00:00Z")));
        insert_ticket(&db, finished).await;

        let result = service.create_todays_draws().await;

        assert!(matches!(
            result,
            Err(AppError::InsufficientEligibleTickets { existing: 1 })
        ));
        assert_eq!(draws::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(ticket_by_id(&db, drawn.id).await.last_drawn, None);
    }

    #[tokio::test]
    async fn test_partial_selection_is_not_an_error() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock);

        for i in 0..2 {
            insert_ticket(&db, ticket(&format!("only-{i}"))).await;
        }

        let created = service.create_todays_draws().await.unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creation_draws_each_ticket_once() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock);
        let other = service.clone();

        for i in 0..7 {
            insert_ticket(&db, ticket(&format!("chore-{i}"))).await;
        }

        let (first, second) = tokio::join!(
            service.create_todays_draws(),
            other.create_todays_draws()
        );
        let created = first.unwrap().len() + second.unwrap().len();
        assert_eq!(created, 5);

        let today = service.list_todays_draws().await.unwrap();
        let ids: HashSet<Uuid> = today.iter().map(|(d, _)| d.ticket_id).collect();
        assert_eq!(today.len(), 5);
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_created_draws_are_no_longer_eligible_today() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock.clone());
        let eligibility = EligibilityService::new(db.clone(), clock);

        let a = insert_ticket(&db, ticket("a")).await;
        let b = insert_ticket(&db, ticket("b")).await;
        let today = eligibility.today_weekday();
        assert!(eligibility.is_eligible(a.id, today).await.unwrap());

        let created = service.create_todays_draws().await.unwrap();
        assert_eq!(created.len(), 2);

        assert!(!eligibility.is_eligible(a.id, today).await.unwrap());
        assert!(!eligibility.is_eligible(b.id, today).await.unwrap());
        assert!(eligibility
            .list_eligible(today, DeadlineMode::Respect)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_creation_uses_local_day_boundaries() {
        let db = setup_db().await;
        let offset = parse_utc_offset("+08:00").unwrap();
        // 本地时间 2026-10-17 (周六) 01:00
        let clock = Arc::new(FixedClock::new(at("2026-10-16T17:00:00Z"), offset));
        let service = DrawService::new(db.clone(), clock.clone());
        let eligibility = EligibilityService::new(db.clone(), clock.clone());

        let a = insert_ticket(&db, ticket("a")).await;
        let b = insert_ticket(&db, ticket("b")).await;
        // 本地前一天 23:30 的抽取不算今天
        insert_draw(&db, a.id, at("2026-10-16T15:30:00Z"), false, false).await;
        // 本地今天 00:30 完成的抽取算今天
        insert_draw(&db, b.id, at("2026-10-16T16:30:00Z"), true, false).await;
        assert_eq!(eligibility.today_weekday(), Weekday::Sat);

        let created = service.create_todays_draws().await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].ticket_id, a.id);
        assert_eq!(service.list_todays_draws().await.unwrap().len(), 2);

        // 本地 23:59 仍是同一天, 没有可新增的
        clock.set(at("2026-10-17T15:59:00Z"));
        assert!(matches!(
            service.create_todays_draws().await,
            Err(AppError::InsufficientEligibleTickets { existing: 2 })
        ));

        // 本地次日零点: b 前一天完成, 两个都可再抽
        clock.set(at("2026-10-17T16:00:00Z"));
        assert!(eligibility.is_eligible(b.id, Weekday::Sun).await.unwrap());
        let created = service.create_todays_draws().await.unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn test_list_and_clear_draws() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let service = DrawService::new(db.clone(), clock);

        let t = insert_ticket(&db, ticket("history")).await;
        insert_draw(&db, t.id, at("2026-10-15T09:00:00Z"), true, false).await;
        insert_draw(&db, t.id, at("2026-10-16T09:00:00Z"), false, true).await;
        insert_draw(&db, t.id, at("2026-10-17T08:00:00Z"), false, false).await;

        let (page, info) = service
            .list_draws(&PaginationParams::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(info.total, 3);
        assert_eq!(info.total_pages, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].0.created_at, at("2026-10-17T08:00:00Z"));
        assert_eq!(page[0].1.as_ref().map(|t| t.title.as_str()), Some("history"));

        assert_eq!(service.list_todays_draws().await.unwrap().len(), 1);
        assert_eq!(service.clear_draws().await.unwrap(), 3);
        assert!(service.list_todays_draws().await.unwrap().is_empty());
    }
}
