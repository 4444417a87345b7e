use cellway_backend::{
    AppState, config::Config, create_router, engine::RouteOptimizer, geocoding::MapTilerClient,
    graphhopper::GraphHopperClient, towers::CsvTowerSource,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cellway_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let routing = GraphHopperClient::new(
        config.graphhopper_url.clone(),
        config.graphhopper_key.clone(),
        config.alternatives,
    )?;
    let towers = CsvTowerSource::load_or_mock(&config.tower_csv);
    if towers.is_mock() {
        tracing::warn!("serving mock cell towers");
    }

    let geocoder = MapTilerClient::new(config.maptiler_url.clone(), config.maptiler_key.clone())?;

    let app = create_router(AppState::new(
        RouteOptimizer::new(routing, towers),
        geocoder,
    ));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("starting backend on http://{}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
