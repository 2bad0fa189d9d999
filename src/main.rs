use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_feed::api::ApiClient;
use pulse_feed::config::Config;
use pulse_feed::notifications::{ConfiguredPushSdk, NotificationBootstrap};
use pulse_feed::prefs::Preferences;
use pulse_feed::routes::{self, AppState};
use pulse_feed::weather::{load_weather, location_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_feed=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("PULSE_CONFIG").unwrap_or_else(|_| "pulse.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path))?
        .with_api_url_override(std::env::var("PULSE_API_URL").ok());

    // Preferences
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:pulse_prefs.db?mode=rwc".to_string());
    let prefs = Preferences::new(&database_url).await?;
    prefs.initialize().await?;
    let theme = prefs.theme().await?;
    info!(%theme, "Preferences loaded");

    // Push notifications, once per process
    let notifications = Arc::new(NotificationBootstrap::new());
    let sdk = ConfiguredPushSdk::new(config.notifications.permission);
    notifications.ensure_initialized(&sdk, &config.notifications.app_id);

    let client = ApiClient::new(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    info!("Using backend at {}", client.base_url());

    let state = Arc::new(AppState::new(Arc::new(prefs), notifications, theme));

    // Initial headline fetch; the outcome is final for this view
    let feed_state = state.clone();
    let feed_client = client.clone();
    tokio::spawn(async move {
        let outcome = feed_client.fetch_trending().await;
        feed_state.view.write().await.complete(outcome);
    });

    // Weather, independent of the headline fetch
    let weather_state = state.clone();
    let locator = location_provider(config.location);
    let weather_timeout = Duration::from_secs(config.weather_timeout_secs);
    tokio::spawn(async move {
        if let Some(snapshot) = load_weather(&client, locator.as_ref(), weather_timeout).await {
            info!("Weather: {}", snapshot);
            *weather_state.weather.write().await = Some(snapshot);
        }
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Pulse starting on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
