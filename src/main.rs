use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // 日志时间戳
use env_logger::{Env, Target};
use std::io::Write; // env_logger 自定义格式
use std::sync::Arc;

use daily_draw::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
    utils::{SharedClock, SystemClock},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()?;
    let offset = config.scheduling.offset()?;
    log::info!("Using schedule offset {}", offset);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;

    // 运行数据库迁移
    run_migrations(&pool).await?;

    let clock: SharedClock = Arc::new(SystemClock::new(offset));

    // 创建服务
    let ticket_service = TicketService::new(pool.clone(), clock.clone());
    let eligibility_service = EligibilityService::new(pool.clone(), clock.clone());
    let draw_service = DrawService::new(pool.clone(), clock.clone());
    let lifecycle_service = LifecycleService::new(pool.clone(), clock.clone());
    let quota_service = QuotaService::new(pool.clone(), clock.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(ticket_service.clone()))
            .app_data(web::Data::new(eligibility_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(lifecycle_service.clone()))
            .app_data(web::Data::new(quota_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::ticket_config)
                    .configure(handlers::draw_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
