use crate::error::AppError;
use crate::models::*;
use crate::services::{DeadlineMode, EligibilityService, TicketService};
use crate::utils::{parse_weekday, weekday_name};
use actix_web::{HttpResponse, ResponseError, Result, web};
use chrono::Weekday;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TicketListQuery {
    /// 是否包含已完成的 ticket (默认 false)
    #[serde(default)]
    pub include_done: bool,
}

fn resolve_weekday(
    service: &EligibilityService,
    weekday: Option<&str>,
) -> Result<Weekday, AppError> {
    match weekday {
        None => Ok(service.today_weekday()),
        Some(value) => parse_weekday(value)
            .ok_or_else(|| AppError::ValidationError(format!("Invalid weekday: {value}"))),
    }
}

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "ticket",
    params(TicketListQuery),
    responses(
        (status = 200, description = "获取 ticket 列表成功", body = [TicketResponse])
    )
)]
pub async fn list_tickets(
    service: web::Data<TicketService>,
    query: web::Query<TicketListQuery>,
) -> Result<HttpResponse> {
    match service.list_tickets(query.include_done).await {
        Ok(list) => {
            let data: Vec<TicketResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tickets",
    tag = "ticket",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "创建 ticket 成功", body = TicketResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn create_ticket(
    service: web::Data<TicketService>,
    request: web::Json<CreateTicketRequest>,
) -> Result<HttpResponse> {
    match service.create_ticket(request.into_inner()).await {
        Ok(ticket) => Ok(HttpResponse::Created().json(ApiResponse::success(TicketResponse::from(ticket)))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "ticket",
    params(("id" = Uuid, Path, description = "ticket ID")),
    responses(
        (status = 200, description = "获取 ticket 成功", body = TicketResponse),
        (status = 404, description = "ticket 不存在")
    )
)]
pub async fn get_ticket(
    service: web::Data<TicketService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.get_ticket(path.into_inner()).await {
        Ok(ticket) => Ok(HttpResponse::Ok().json(ApiResponse::success(TicketResponse::from(ticket)))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/tickets/{id}",
    tag = "ticket",
    params(("id" = Uuid, Path, description = "ticket ID")),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "更新 ticket 成功", body = TicketResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "ticket 不存在")
    )
)]
/// 更新 ticket; done 由空变为非空时会自动补一条今天的完成记录
pub async fn update_ticket(
    service: web::Data<TicketService>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateTicketRequest>,
) -> Result<HttpResponse> {
    match service
        .update_ticket(path.into_inner(), request.into_inner())
        .await
    {
        Ok(ticket) => Ok(HttpResponse::Ok().json(ApiResponse::success(TicketResponse::from(ticket)))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "ticket",
    params(("id" = Uuid, Path, description = "ticket ID")),
    responses(
        (status = 204, description = "删除成功 (连同抽取记录)"),
        (status = 404, description = "ticket 不存在")
    )
)]
pub async fn delete_ticket(
    service: web::Data<TicketService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.delete_ticket(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tickets/eligible",
    tag = "ticket",
    params(EligibleQuery),
    responses(
        (status = 200, description = "可抽取 ticket (按优先级排序, 不含今天已抽取的)", body = [TicketResponse]),
        (status = 400, description = "weekday 无效")
    )
)]
pub async fn list_eligible(
    service: web::Data<EligibilityService>,
    query: web::Query<EligibleQuery>,
) -> Result<HttpResponse> {
    let weekday = match resolve_weekday(&service, query.weekday.as_deref()) {
        Ok(day) => day,
        Err(e) => return Ok(e.error_response()),
    };
    let mode = DeadlineMode::from_ignore_flag(query.ignore_deadlines);

    match service.list_eligible(weekday, mode).await {
        Ok(list) => {
            let data: Vec<TicketResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tickets/{id}/eligible",
    tag = "ticket",
    params(("id" = Uuid, Path, description = "ticket ID"), EligibleQuery),
    responses(
        (status = 200, description = "是否可抽取", body = EligibilityResponse),
        (status = 404, description = "ticket 不存在")
    )
)]
pub async fn is_eligible(
    service: web::Data<EligibilityService>,
    path: web::Path<Uuid>,
    query: web::Query<EligibleQuery>,
) -> Result<HttpResponse> {
    let ticket_id = path.into_inner();
    let weekday = match resolve_weekday(&service, query.weekday.as_deref()) {
        Ok(day) => day,
        Err(e) => return Ok(e.error_response()),
    };

    match service.is_eligible(ticket_id, weekday).await {
        Ok(eligible) => Ok(HttpResponse::Ok().json(ApiResponse::success(EligibilityResponse {
            ticket_id,
            weekday: weekday_name(weekday).to_string(),
            eligible,
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn ticket_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tickets")
            .route("", web::get().to(list_tickets))
            .route("", web::post().to(create_ticket))
            .route("/eligible", web::get().to(list_eligible))
            .route("/{id}", web::get().to(get_ticket))
            .route("/{id}", web::put().to(update_ticket))
            .route("/{id}", web::delete().to(delete_ticket))
            .route("/{id}/eligible", web::get().to(is_eligible)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::{clock_at, setup_db};
    use crate::handlers::draw_config;
    use crate::services::DrawService;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_ticket_routes_and_draw_conflict() {
        let db = setup_db().await;
        let clock = clock_at("2026-10-17T09:00:00Z");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(TicketService::new(db.clone(), clock.clone())))
                .app_data(web::Data::new(EligibilityService::new(db.clone(), clock.clone())))
                .app_data(web::Data::new(DrawService::new(db.clone(), clock.clone())))
                .configure(ticket_config)
                .configure(draw_config),
        )
        .await;

        // 没有 ticket 时生成抽取返回 409
        let req = test::TestRequest::post().uri("/draws/today").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("INSUFFICIENT_ELIGIBLE_TICKETS"));

        let req = test::TestRequest::post()
            .uri("/tickets")
            .set_json(json!({ "title": "vacuum" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        // /tickets/eligible 不能被 /tickets/{id} 吞掉
        let req = test::TestRequest::get()
            .uri("/tickets/eligible?weekday=monday")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::get()
            .uri(&format!("/tickets/{id}/eligible?weekday=sat"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["eligible"], json!(true));
        assert_eq!(body["data"]["weekday"], json!("saturday"));

        let req = test::TestRequest::get()
            .uri("/tickets/eligible?weekday=someday")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
