use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

use super::room_websocket;
use crate::rooms::RoomCoordinator;

/// All HTTP and WebSocket routes served by the room server.
pub fn routes(
    coordinator: Arc<RoomCoordinator>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    room_websocket_route(coordinator.clone())
        .or(health_check())
        .or(stats_endpoint(coordinator))
}

/// Creates the room WebSocket route
pub fn room_websocket_route(
    coordinator: Arc<RoomCoordinator>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_coordinator(coordinator))
        .map(|ws: warp::ws::Ws, coordinator: Arc<RoomCoordinator>| {
            ws.on_upgrade(move |websocket| {
                room_websocket::handle_room_websocket(websocket, coordinator)
            })
        })
}

pub fn health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "mentor-room",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

pub fn stats_endpoint(
    coordinator: Arc<RoomCoordinator>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_coordinator(coordinator))
        .and_then(|coordinator: Arc<RoomCoordinator>| async move {
            let stats = coordinator.stats().await;
            Ok::<_, Infallible>(warp::reply::json(&stats))
        })
}

fn with_coordinator(
    coordinator: Arc<RoomCoordinator>,
) -> impl Filter<Extract = (Arc<RoomCoordinator>,), Error = Infallible> + Clone {
    warp::any().map(move || coordinator.clone())
}
