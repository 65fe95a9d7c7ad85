use warp::Filter;

use mentor_room::api;
use mentor_room::config::{Config, LogFormat};
use mentor_room::rooms::RoomCoordinator;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mentor_room=info,warp=warn".into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mentor-room: {}", e);
            std::process::exit(2);
        }
    };
    init_tracing(config.log_format);

    let coordinator = RoomCoordinator::new(&config.rooms);
    let routes = api::routes(coordinator.clone()).with(warp::trace::request());

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(
        config.bind_address(),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        },
    );

    tracing::info!(
        %addr,
        chat_history_limit = config.rooms.chat_history_limit,
        outbox_capacity = config.rooms.outbox_capacity,
        "mentor-room listening"
    );
    server.await;

    let stats = coordinator.stats().await;
    tracing::info!(rooms = stats.rooms, connections = stats.connections, "Server stopped");
}
