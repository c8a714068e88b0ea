use electrode_shipment_rust::{
    api, create_pool, AppConfig, DefectService, PgStore, ReconcileService, ShipmentService,
    StatusService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::from_env()?;

    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_max_level(config.log_level())
        .init();

    info!(
        "Starting server on {}:{}, lookup strategy {:?}, privileged roles {:?}",
        config.server.host,
        config.server.port,
        config.reconcile.lookup_strategy,
        config.reconcile.privileged_roles
    );

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let store = Arc::new(PgStore::new(
        pool,
        Duration::from_secs(config.reconcile.apply_timeout_secs),
    ));

    let state = api::AppState {
        reconcile: Arc::new(ReconcileService::new(store.clone(), &config.reconcile)),
        shipments: Arc::new(ShipmentService::new(store.clone(), config.shipments.clone())),
        status: Arc::new(StatusService::new(store.clone())),
        defects: Arc::new(DefectService::new(store.clone(), config.defects.recent_limit)),
        directory: store,
    };
    let app = api::router(state, config.reconcile.max_upload_bytes);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/shipments/reconcile/preview - 出荷状况更新预览");
    info!("  POST /api/shipments/reconcile/apply   - 出荷状况更新确认");
    info!("  GET  /api/shipments/recent            - 最新出荷数据");
    info!("  GET  /api/items                       - 品目一览");
    info!("  GET  /api/items/:item_code/electrodes - 溶射电极状况一览");
    info!("  GET  /api/defects                     - 不具合电极列表");
    info!("  POST /api/defects                     - 不具合电极登记");
    info!("  PUT|DELETE /api/defects/:id           - 不具合电极修改 / 删除");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
