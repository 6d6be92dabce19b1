use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{ticket_draw_entity as draws, ticket_entity as tickets};
use crate::error::{AppError, AppResult};
use crate::models::{CreateTicketRequest, UpdateTicketRequest, WeekdayFlags, merge_schedule};
use crate::services::lifecycle_service::LifecycleService;
use crate::utils::{SharedClock, WeekSchedule};

#[derive(Clone)]
pub struct TicketService {
    pool: DatabaseConnection,
    clock: SharedClock,
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::ValidationError("Title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn validate_frequency(frequency: i32) -> AppResult<i32> {
    if frequency < 1 {
        return Err(AppError::ValidationError(
            "Frequency must be at least 1 day".into(),
        ));
    }
    Ok(frequency)
}

impl TicketService {
    pub fn new(pool: DatabaseConnection, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    pub async fn create_ticket(&self, req: CreateTicketRequest) -> AppResult<tickets::Model> {
        let title = validate_title(&req.title)?;
        let frequency = validate_frequency(req.frequency.unwrap_or(1))?;
        let schedule = merge_schedule(
            WeekSchedule::default(),
            Some(&req.can_draw.unwrap_or_else(WeekdayFlags::all)),
            Some(&req.must_draw.unwrap_or_default()),
        );

        let mut am = tickets::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(self.clock.now()),
            title: Set(title),
            recurring: Set(req.recurring.unwrap_or(true)),
            done: Set(None),
            last_drawn: Set(None),
            deadline: Set(req.deadline),
            frequency: Set(frequency),
            ..Default::default()
        };
        am.set_schedule(&schedule);

        let ticket = am.insert(&self.pool).await?;
        log::info!("Created ticket {} ({})", ticket.id, ticket.title);
        Ok(ticket)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> AppResult<tickets::Model> {
        tickets::Entity::find_by_id(ticket_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))
    }

    /// 列出 ticket; include_done = false 时只返回未完成的
    pub async fn list_tickets(&self, include_done: bool) -> AppResult<Vec<tickets::Model>> {
        let mut query = tickets::Entity::find();
        if !include_done {
            query = query.filter(tickets::Column::Done.is_null());
        }
        let list = query
            .order_by_asc(tickets::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(list)
    }

    /// 更新 ticket
    ///
    /// done 由空变为非空时补齐今天的完成记录 (见 LifecycleService::record_direct_completion)
    pub async fn update_ticket(
        &self,
        ticket_id: Uuid,
        req: UpdateTicketRequest,
    ) -> AppResult<tickets::Model> {
        if req.is_empty() {
            return Err(AppError::ValidationError("No fields to update".into()));
        }
        let title = req.title.as_deref().map(validate_title).transpose()?;
        let frequency = req.frequency.map(validate_frequency).transpose()?;

        let reading = self.clock.reading();
        let txn = self.pool.begin().await?;

        let ticket = tickets::Entity::find_by_id(ticket_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;

        let was_open = ticket.is_open();
        let schedule = merge_schedule(
            ticket.schedule(),
            req.can_draw.as_ref(),
            req.must_draw.as_ref(),
        );

        let mut am = ticket.into_active_model();
        if let Some(title) = title {
            am.title = Set(title);
        }
        if let Some(recurring) = req.recurring {
            am.recurring = Set(recurring);
        }
        if let Some(frequency) = frequency {
            am.frequency = Set(frequency);
        }
        if let Some(deadline) = req.deadline {
            am.deadline = Set(deadline);
        }
        if let Some(done) = req.done {
            am.done = Set(done);
        }
        if req.can_draw.is_some() || req.must_draw.is_some() {
            am.set_schedule(&schedule);
        }
        let updated = am.update(&txn).await?;

        if was_open && !updated.is_open() {
            log::info!("Ticket {} marked done directly", updated.id);
            LifecycleService::record_direct_completion(&txn, &reading, updated).await?;
        }

        let ticket = tickets::Entity::find_by_id(ticket_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;
        txn.commit().await?;
        Ok(ticket)
    }

    /// 删除 ticket 及其全部抽取记录
    pub async fn delete_ticket(&self, ticket_id: Uuid) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        let ticket = tickets::Entity::find_by_id(ticket_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;

        let removed = draws::Entity::delete_many()
            .filter(draws::Column::TicketId.eq(ticket.id))
            .exec(&txn)
            .await?;
        tickets::Entity::delete_by_id(ticket.id).exec(&txn).await?;
        txn.commit().await?;

        log::info!(
            "Deleted ticket {} with {} draws",
            ticket_id,
            removed.rows_affected
        );
        Ok(())
    }
}
