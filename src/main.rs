use std::sync::Arc;

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use atelier_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db_pool = api::db::establish_connection(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);

    let gateway: Arc<dyn api::services::payos::PaymentGateway> = Arc::new(
        api::services::payos::PayOsClient::new(cfg.payos.clone(), cfg.frontend_url.clone()),
    );

    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        gateway,
        event_sender.clone(),
        &cfg,
    );

    // Side-effect consumer for order lifecycle events (cart clearing)
    tokio::spawn(api::events::process_events(
        event_rx,
        services.carts.clone(),
    ));

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = api::create_app(app_state);

    let addr = cfg.bind_address();
    info!("atelier-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
