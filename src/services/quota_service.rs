use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::entities::ticket_draw_entity as draws;
use crate::error::AppResult;
use crate::utils::SharedClock;

pub const MIN_QUOTA: u64 = 5;
pub const MAX_QUOTA: u64 = 10;
/// 完成率统计窗口 (天)
pub const LOOKBACK_DAYS: i64 = 7;

/// 根据完成率计算每日数量: round(5 + 5 * done / total), 限制在 [5, 10]
/// 没有任何记录时返回 5
pub fn quota_from_counts(completed: u64, total: u64) -> u64 {
    if total == 0 {
        return MIN_QUOTA;
    }
    let rate = completed.min(total) as f64 / total as f64;
    let span = (MAX_QUOTA - MIN_QUOTA) as f64;
    let quota = (MIN_QUOTA as f64 + rate * span).round() as u64;
    quota.clamp(MIN_QUOTA, MAX_QUOTA)
}

#[derive(Clone)]
pub struct QuotaService {
    pool: DatabaseConnection,
    clock: SharedClock,
}

impl QuotaService {
    pub fn new(pool: DatabaseConnection, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// 今天应抽取的最大数量
    pub async fn estimate_quota(&self) -> AppResult<u64> {
        Self::estimate_at(&self.pool, self.clock.now()).await
    }

    /// 统计 [now - 7 天, now] 内的抽取记录 (两端包含)
    pub async fn estimate_at<C: ConnectionTrait>(db: &C, now: DateTime<Utc>) -> AppResult<u64> {
        let since = now - Duration::days(LOOKBACK_DAYS);
        let window = draws::Entity::find()
            .filter(draws::Column::CreatedAt.gte(since))
            .filter(draws::Column::CreatedAt.lte(now));

        let total = window.clone().count(db).await?;
        let completed = window
            .filter(draws::Column::Done.eq(true))
            .count(db)
            .await?;

        let quota = quota_from_counts(completed, total);
        log::debug!("Quota estimate: {completed}/{total} completed in last {LOOKBACK_DAYS} days -> {quota}");
        Ok(quota)
    }
}
