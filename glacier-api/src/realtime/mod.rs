/// Realtime team chat
///
/// - `hub`: one broadcast channel per team room
/// - `socket`: the `/ws` endpoint relaying room events to clients
///
/// REST chat handlers publish into the hub after persisting, so a message
/// posted over HTTP also reaches every socket in the team room.

pub mod hub;
pub mod socket;

pub use hub::{ChatHub, RoomEvent, ServerEvent};
