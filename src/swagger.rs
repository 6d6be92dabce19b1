use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::utils::{DayRule, PaginationInfo};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ticket::list_tickets,
        handlers::ticket::create_ticket,
        handlers::ticket::get_ticket,
        handlers::ticket::update_ticket,
        handlers::ticket::delete_ticket,
        handlers::ticket::list_eligible,
        handlers::ticket::is_eligible,
        handlers::draw::list_draws,
        handlers::draw::list_todays_draws,
        handlers::draw::create_todays_draws,
        handlers::draw::update_draw,
        handlers::draw::clear_draws,
        handlers::draw::get_quota,
    ),
    components(
        schemas(
            WeekdayFlags,
            DayRule,
            CreateTicketRequest,
            UpdateTicketRequest,
            TicketResponse,
            EligibilityResponse,
            UpdateDrawRequest,
            DrawResponse,
            DrawHistoryResponse,
            QuotaResponse,
            ClearDrawsResponse,
            PaginationInfo,
            ApiError,
        )
    ),
    tags(
        (name = "ticket", description = "Ticket management and eligibility API"),
        (name = "draw", description = "Daily draw API"),
    ),
    info(
        title = "Daily Draw API",
        version = "0.1.0",
        description = "Recurring chore tickets and the daily draw that picks them"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
