pub mod room_routes;
pub mod room_websocket;

pub use room_routes::routes;
