use crate::models::*;
use crate::services::{DrawService, LifecycleService, QuotaService};
use crate::utils::PaginationParams;
use actix_web::{HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/draws",
    tag = "draw",
    params(PaginationParams),
    responses(
        (status = 200, description = "获取抽取历史成功", body = DrawHistoryResponse)
    )
)]
/// 分页获取抽取历史（倒序）
pub async fn list_draws(
    service: web::Data<DrawService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match service.list_draws(&query.into_inner()).await {
        Ok((items, pagination)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            DrawHistoryResponse {
                items: items.into_iter().map(Into::into).collect(),
                pagination,
            },
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/draws/today",
    tag = "draw",
    responses(
        (status = 200, description = "今天的抽取记录", body = [DrawResponse])
    )
)]
pub async fn list_todays_draws(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.list_todays_draws().await {
        Ok(list) => {
            let data: Vec<DrawResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/draws/today",
    tag = "draw",
    responses(
        (status = 201, description = "生成今天的抽取, 返回新增记录", body = [DrawResponse]),
        (status = 409, description = "可抽取的 ticket 不足")
    )
)]
/// 生成今天的抽取:
/// 1. 已到期 / 必抽的 ticket 全部加入
/// 2. 即将到期 / 可抽的 ticket 按每日数量补足
/// 3. 今天已抽取的 ticket 不会重复
pub async fn create_todays_draws(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.create_todays_draws().await {
        Ok(created) => {
            let data: Vec<DrawResponse> = created.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Created().json(ApiResponse::success(data)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/draws/{id}",
    tag = "draw",
    params(("id" = Uuid, Path, description = "抽取记录 ID")),
    request_body = UpdateDrawRequest,
    responses(
        (status = 200, description = "更新成功", body = DrawResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "抽取记录不存在")
    )
)]
pub async fn update_draw(
    service: web::Data<LifecycleService>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateDrawRequest>,
) -> Result<HttpResponse> {
    match service.update_draw(path.into_inner(), &request).await {
        Ok(draw) => Ok(HttpResponse::Ok().json(ApiResponse::success(DrawResponse::from(draw)))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/draws",
    tag = "draw",
    responses(
        (status = 200, description = "清空全部抽取记录", body = ClearDrawsResponse)
    )
)]
pub async fn clear_draws(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.clear_draws().await {
        Ok(deleted) => Ok(HttpResponse::Ok().json(ApiResponse::success(ClearDrawsResponse { deleted }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/draws/quota",
    tag = "draw",
    responses(
        (status = 200, description = "根据近 7 天完成率计算的每日数量", body = QuotaResponse)
    )
)]
pub async fn get_quota(service: web::Data<QuotaService>) -> Result<HttpResponse> {
    match service.estimate_quota().await {
        Ok(quota) => Ok(HttpResponse::Ok().json(ApiResponse::success(QuotaResponse { quota }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn draw_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/draws")
            .route("", web::get().to(list_draws))
            .route("", web::delete().to(clear_draws))
            .route("/today", web::get().to(list_todays_draws))
            .route("/today", web::post().to(create_todays_draws))
            .route("/quota", web::get().to(get_quota))
            .route("/{id}", web::put().to(update_draw)),
    );
}
