/// WebSocket endpoint for team chat
///
/// `GET /ws` upgrades an authenticated request (session cookie) into a
/// socket. The socket joins team rooms on request and relays room events
/// as JSON text frames.
///
/// # Client Events
///
/// ```json
/// {"event": "join_team", "data": 12}
/// {"event": "leave_team", "data": 12}
/// {"event": "typing", "data": {"teamId": 12, "user": {"id": 3, "name": "Ada"}}}
/// {"event": "stop_typing", "data": {"teamId": 12, "user": {"id": 3, "name": "Ada"}}}
/// ```
///
/// Typing events are only relayed for rooms this socket has joined.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use glacier_shared::auth::middleware::{authenticate, AuthUser};
use glacier_shared::models::team_member::TeamMember;
use serde::Deserialize;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamMap};
use uuid::Uuid;

use super::hub::{ChatHub, RoomEvent, ServerEvent};
use crate::app::AppState;
use crate::error::ApiResult;

/// Client to server frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinTeam(i32),
    LeaveTeam(i32),
    Typing(TypingPayload),
    StopTyping(TypingPayload),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypingPayload {
    #[serde(rename = "teamId")]
    pub team_id: i32,
    pub user: serde_json::Value,
}

type Rooms = StreamMap<i32, BroadcastStream<RoomEvent>>;

/// `GET /ws`
///
/// # Errors
///
/// - 401 Unauthorized: no valid session cookie
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = authenticate(&state.db, &headers).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let connection = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let mut rooms: Rooms = StreamMap::new();

    tracing::debug!(%connection, user_id = user.id, "Socket connected");

    loop {
        let outgoing = tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_frame(&state, &user, connection, &mut rooms, &text).await
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    tracing::debug!(%connection, error = %e, "Socket receive failed");
                    break;
                }
            },
            Some((team_id, item)) = rooms.next(), if !rooms.is_empty() => match item {
                Ok(room_event) if room_event.visible_to(connection) => Some(room_event.event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(%connection, team_id, skipped, "Socket lagged behind chat room");
                    None
                }
            },
        };

        if let Some(event) = outgoing {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode socket event");
                    continue;
                }
            };

            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    }

    let joined: Vec<i32> = rooms.keys().copied().collect();
    drop(rooms);
    for team_id in joined {
        state.hub.release(team_id);
    }

    tracing::debug!(%connection, user_id = user.id, "Socket disconnected");
}

/// Applies one client frame; returns an event to send back to this socket
async fn handle_client_frame(
    state: &AppState,
    user: &AuthUser,
    connection: Uuid,
    rooms: &mut Rooms,
    text: &str,
) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%connection, error = %e, "Ignoring malformed socket frame");
            return Some(ServerEvent::Error {
                message: "Invalid event".to_string(),
            });
        }
    };

    match event {
        ClientEvent::JoinTeam(team_id) => {
            if rooms.contains_key(&team_id) {
                return None;
            }

            match TeamMember::is_member_or_creator(&state.db, team_id, user.id).await {
                Ok(true) => {
                    rooms.insert(team_id, BroadcastStream::new(state.hub.subscribe(team_id)));
                    tracing::debug!(%connection, user_id = user.id, team_id, "Joined team room");
                    None
                }
                Ok(false) => Some(ServerEvent::Error {
                    message: "You are not a member of this team".to_string(),
                }),
                Err(e) => {
                    tracing::error!(error = %e, team_id, "Room membership check failed");
                    Some(ServerEvent::Error {
                        message: "Something went wrong!".to_string(),
                    })
                }
            }
        }
        ClientEvent::LeaveTeam(team_id) => {
            if rooms.remove(&team_id).is_some() {
                state.hub.release(team_id);
            }
            None
        }
        ClientEvent::Typing(payload) => {
            relay_typing(&state.hub, rooms, connection, payload.team_id, ServerEvent::UserTyping {
                user: payload.user,
            });
            None
        }
        ClientEvent::StopTyping(payload) => {
            relay_typing(&state.hub, rooms, connection, payload.team_id, ServerEvent::UserStopTyping {
                user: payload.user,
            });
            None
        }
    }
}

fn relay_typing(hub: &ChatHub, rooms: &Rooms, connection: Uuid, team_id: i32, event: ServerEvent) {
    if rooms.contains_key(&team_id) {
        hub.publish_from(team_id, Some(connection), event);
    }
}
