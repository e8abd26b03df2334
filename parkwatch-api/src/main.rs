use anyhow::Context;
use parkwatch_api::{app, worker, AppState, LiveFeed};
use parkwatch_core::{BookingService, SlotId};
use parkwatch_store::{app_config::Config, DbClient, SqlSlotRepository};
use parkwatch_vision::{FrameAnalyzer, LoopingSource, OccupancyDetector, SlotLayout};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkwatch_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting parkwatch API on port {}", config.server.port);

    // Slot registry
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    let slot_ids = SlotId::seed_set(&config.zones.letters, config.zones.slots_per_zone)?;
    db.seed_slots(&slot_ids, config.database.seed_demo_bookings).await?;
    let bookings = BookingService::new(Arc::new(SqlSlotRepository::new(db.pool.clone())));

    // Video path
    let layout = SlotLayout::load_or_default(
        &config.layout.path,
        config.layout.slot_width,
        config.layout.slot_height,
    )?;
    let live = LiveFeed::new(16);

    if config.detection.enabled {
        match worker::open_source(&config.video) {
            Ok(source) => {
                let detector = OccupancyDetector::new(layout.clone(), config.detection.pixel_threshold);
                let analyzer = FrameAnalyzer::new(detector, config.detection.jpeg_quality);
                worker::start_detection_worker(
                    LoopingSource::new(source),
                    analyzer,
                    live.clone(),
                    Duration::from_millis(config.detection.frame_interval_ms),
                );
            }
            // The booking API stays up without video.
            Err(e) => tracing::warn!("Detection disabled, cannot open {}: {}", config.video.path, e),
        }
    }

    let app_state = AppState {
        bookings,
        layout: Arc::new(layout),
        live,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
