//! 测试辅助: 内存 SQLite + 真实迁移 + 固定时钟

use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{ticket_draw_entity as draws, ticket_entity as tickets};
use crate::utils::{FixedClock, WeekSchedule};

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid rfc3339 timestamp")
        .with_timezone(&Utc)
}

pub fn clock_at(s: &str) -> Arc<FixedClock> {
    Arc::new(FixedClock::utc(at(s)))
}

/// 单连接内存库, 保证所有查询看到同一个数据库
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

/// 每天可抽、frequency = 1 的循环 ticket
pub fn ticket(title: &str) -> tickets::ActiveModel {
    let mut model = tickets::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(at("2026-01-01T00:00:00Z")),
        title: Set(title.to_string()),
        recurring: Set(true),
        done: Set(None),
        last_drawn: Set(None),
        deadline: Set(None),
        frequency: Set(1),
        ..Default::default()
    };
    model.set_schedule(&WeekSchedule::every_day());
    model
}

pub async fn insert_ticket(db: &DatabaseConnection, model: tickets::ActiveModel) -> tickets::Model {
    model.insert(db).await.expect("insert ticket")
}

pub async fn insert_draw(
    db: &DatabaseConnection,
    ticket_id: Uuid,
    created_at: DateTime<Utc>,
    done: bool,
    skipped: bool,
) -> draws::Model {
    draws::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(created_at),
        ticket_id: Set(ticket_id),
        done: Set(done),
        skipped: Set(skipped),
    }
    .insert(db)
    .await
    .expect("insert draw")
}
