//! 抽取记录与 ticket 的状态流转: 完成 / 跳过 / 撤销

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{ticket_draw_entity as draws, ticket_entity as tickets};
use crate::error::{AppError, AppResult};
use crate::models::UpdateDrawRequest;
use crate::utils::{ClockReading, SharedClock};

#[derive(Clone)]
pub struct LifecycleService {
    pool: DatabaseConnection,
    clock: SharedClock,
}

impl LifecycleService {
    pub fn new(pool: DatabaseConnection, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// 更新抽取记录的 done / skipped
    ///
    /// - done 与 skipped 互斥: 设置其中一个为 true 会清除另一个
    /// - 完成一次性 ticket 的抽取时, ticket 本身也标记为完成
    /// - 撤销完成时, 若该一次性 ticket 再无其它完成记录, ticket 恢复为未完成
    pub async fn update_draw(
        &self,
        draw_id: Uuid,
        patch: &UpdateDrawRequest,
    ) -> AppResult<draws::Model> {
        if patch.is_empty() {
            return Err(AppError::ValidationError("No fields to update".into()));
        }
        if patch.done == Some(true) && patch.skipped == Some(true) {
            return Err(AppError::ValidationError(
                "A draw cannot be both done and skipped".into(),
            ));
        }

        let now = self.clock.now();
        let txn = self.pool.begin().await?;

        let draw = draws::Entity::find_by_id(draw_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Draw {draw_id} not found")))?;

        let was_done = draw.done;
        let mut done = patch.done.unwrap_or(draw.done);
        let mut skipped = patch.skipped.unwrap_or(draw.skipped);
        if patch.done == Some(true) {
            skipped = false;
        }
        if patch.skipped == Some(true) {
            done = false;
        }

        let mut am = draw.into_active_model();
        am.done = Set(done);
        am.skipped = Set(skipped);
        let updated = am.update(&txn).await?;

        let ticket = tickets::Entity::find_by_id(updated.ticket_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Ticket {} not found", updated.ticket_id))
            })?;

        if patch.done == Some(true) && !ticket.recurring && ticket.done.is_none() {
            log::info!("Ticket {} completed via draw {}", ticket.id, updated.id);
            let mut am = ticket.into_active_model();
            am.mark_done(now);
            am.update(&txn).await?;
        } else if was_done && !done && !ticket.recurring && ticket.done.is_some() {
            let other_completions = draws::Entity::find()
                .filter(draws::Column::TicketId.eq(ticket.id))
                .filter(draws::Column::Done.eq(true))
                .count(&txn)
                .await?;
            if other_completions == 0 {
                log::info!("Ticket {} reopened after undoing draw {}", ticket.id, updated.id);
                let mut am = ticket.into_active_model();
                am.done = Set(None);
                am.update(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// ticket 被直接标记完成 (不经过抽取) 时补齐今天的完成记录
    ///
    /// - 今天没有该 ticket 的抽取: 新建一条已完成的抽取
    /// - 今天已有未完成 (或已跳过) 的抽取: 扩展行为, 将最近一条改为完成,
    ///   而不是再新建一条, 保证每天每个 ticket 至多一条抽取
    /// - 两种情况都会更新 last_drawn; 今天已有完成的抽取则不做任何事
    pub(crate) async fn record_direct_completion<C: ConnectionTrait>(
        db: &C,
        reading: &ClockReading,
        ticket: tickets::Model,
    ) -> AppResult<()> {
        let (start, end) = reading.day_bounds();
        let today = draws::Entity::find()
            .filter(draws::Column::TicketId.eq(ticket.id))
            .filter(draws::Column::CreatedAt.gte(start))
            .filter(draws::Column::CreatedAt.lt(end))
            .order_by_desc(draws::Column::CreatedAt)
            .all(db)
            .await?;

        if today.iter().any(|d| d.done) {
            return Ok(());
        }

        match today.into_iter().next() {
            Some(open) => {
                let mut am = open.into_active_model();
                am.done = Set(true);
                am.skipped = Set(false);
                am.update(db).await?;
            }
            None => {
                draws::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    created_at: Set(reading.now),
                    ticket_id: Set(ticket.id),
                    done: Set(true),
                    skipped: Set(false),
                }
                .insert(db)
                .await?;
            }
        }

        log::debug!("Backfilled today's completion for ticket {}", ticket.id);
        let mut am = ticket.into_active_model();
        am.last_drawn = Set(Some(reading.now));
        am.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::{at, clock_at, insert_draw, insert_ticket, setup_db, ticket};

    async fn reload_ticket(db: &DatabaseConnection, id: Uuid) -> tickets::Model {
        tickets::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    fn patch(done: Option<bool>, skipped: Option<bool>) -> UpdateDrawRequest {
        UpdateDrawRequest { done, skipped }
    }

    #[tokio::test]
    async fn test_completing_non_recurring_ticket() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T18:00:00Z");
        let service = LifecycleService::new(db.clone(), clock);

        let mut once = ticket("once");
        once.recurring = Set(false);
        let once = insert_ticket(&db, once).await;
        let draw = insert_draw(&db, once.id, at("2026-10-17T09:00:00Z"), false, true).await;

        let updated = service
            .update_draw(draw.id, &patch(Some(true), None))
            .await
            .unwrap();

        assert!(updated.done);
        assert!(!updated.skipped);
        assert_eq!(
            reload_ticket(&db, once.id).await.done,
            Some(at("2026-10-17T18:00:00Z"))
        );

        // 撤销后 ticket 恢复未完成
        service
            .update_draw(draw.id, &patch(Some(false), None))
            .await
            .unwrap();
        assert_eq!(reload_ticket(&db, once.id).await.done, None);
    }

    #[tokio::test]
    async fn test_completing_recurring_ticket_keeps_it_open() {
        let db = setup_db().await;
        let service = LifecycleService::new(db.clone(), clock_at("2026-10-17T18:00:00Z"));

        let daily = insert_ticket(&db, ticket("daily")).await;
        let draw = insert_draw(&db, daily.id, at("2026-10-17T09:00:00Z"), false, false).await;

        service
            .update_draw(draw.id, &patch(Some(true), None))
            .await
            .unwrap();
        assert_eq!(reload_ticket(&db, daily.id).await.done, None);

        let skipped = service
            .update_draw(draw.id, &patch(None, Some(true)))
            .await
            .unwrap();
        assert!(skipped.skipped);
        assert!(!skipped.done);
    }

    #[tokio::test]
    async fn test_update_draw_validation() {
        let db = setup_db().await;
        let service = LifecycleService::new(db.clone(), clock_at("2026-10-17T18:00:00Z"));

        let result = service.update_draw(Uuid::new_v4(), &patch(None, None)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let result = service
            .update_draw(Uuid::new_v4(), &patch(Some(true), Some(true)))
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let result = service
            .update_draw(Uuid::new_v4(), &patch(Some(true), None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
