use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stayline_api::{app, AppState};
use stayline_booking::{register_default_handlers, BookingPolicy, BookingService};
use stayline_core::notification::LogNotificationService;
use stayline_core::pricing::MarkupPricingService;
use stayline_core::refund::LogRefundProcessor;
use stayline_core::supplier::SandboxSupplierClient;
use stayline_core::{BookingEvent, BookingRepository};
use stayline_shared::EventBus;
use stayline_store::app_config::Config;
use stayline_store::{DbClient, InMemoryBookingRepository, PgBookingRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stayline_api=debug,stayline_booking=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Stayline API on port {}", config.server.port);

    let repository: Arc<dyn BookingRepository> = match &config.database {
        Some(database) => {
            let db = DbClient::new(database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgBookingRepository::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No [database] configured, bookings are kept in memory only");
            Arc::new(InMemoryBookingRepository::new())
        }
    };

    let bus: Arc<EventBus<BookingEvent>> = Arc::new(EventBus::with_async_timeout(Duration::from_secs(
        config.events.async_handler_timeout_secs,
    )));
    register_default_handlers(
        &bus,
        Arc::new(LogNotificationService),
        Arc::new(LogRefundProcessor),
    )
    .await;

    let policy = BookingPolicy {
        check_in_grace: chrono::Duration::hours(config.booking.check_in_grace_hours),
        reference_length: config.booking.reference_length,
        max_page_size: config.booking.max_page_size,
    };
    let service = BookingService::with_policy(
        repository,
        Arc::new(SandboxSupplierClient::new(config.supplier.clone())),
        Arc::new(MarkupPricingService::new(config.pricing.clone())),
        bus,
        policy,
    );

    let app_state = AppState {
        bookings: Arc::new(service),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
