mod broadcast;
mod coordinator;
mod events;
mod ids;
mod lifecycle;
mod registry;
mod room;
mod session;
mod store;

pub use broadcast::{fan_out, Outbox};
pub use coordinator::{CoordinatorStats, RoomCoordinator};
pub use events::{ChatMessage, ClientEvent, CodeChange, RoomRef, SendMessage, ServerEvent};
pub use ids::{ConnectionId, RoomId};
pub use lifecycle::Departure;
pub use registry::ConnectionRegistry;
pub use room::{Member, Role, Room, RoomSnapshot};
pub use session::RoomSession;
pub use store::{RoomSlot, RoomStore};
