use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{ticket_draw_entity, ticket_entity};
use crate::utils::PaginationInfo;

/// 更新抽取记录请求
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateDrawRequest {
    pub done: Option<bool>,
    pub skipped: Option<bool>,
}

impl UpdateDrawRequest {
    pub fn is_empty(&self) -> bool {
        self.done.is_none() && self.skipped.is_none()
    }
}

/// 抽取记录响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ticket_id: Uuid,
    pub done: bool,
    pub skipped: bool,
    /// 关联 ticket 标题 (ticket 已删除时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_title: Option<String>,
}

impl From<ticket_draw_entity::Model> for DrawResponse {
    fn from(m: ticket_draw_entity::Model) -> Self {
        DrawResponse {
            id: m.id,
            created_at: m.created_at,
            ticket_id: m.ticket_id,
            done: m.done,
            skipped: m.skipped,
            ticket_title: None,
        }
    }
}

impl From<(ticket_draw_entity::Model, Option<ticket_entity::Model>)> for DrawResponse {
    fn from((draw, ticket): (ticket_draw_entity::Model, Option<ticket_entity::Model>)) -> Self {
        DrawResponse {
            ticket_title: ticket.map(|t| t.title),
            ..DrawResponse::from(draw)
        }
    }
}

/// 抽取历史 (分页, 倒序)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawHistoryResponse {
    pub items: Vec<DrawResponse>,
    pub pagination: PaginationInfo,
}

/// 今日每日数量
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotaResponse {
    pub quota: u64,
}

/// 清空抽取记录结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClearDrawsResponse {
    pub deleted: u64,
}
