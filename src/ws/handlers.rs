//! WebSocket message dispatch
//!
//! Authorization is checked here per connection role, then the message is
//! forwarded to the matching `AppState` operation.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{PlayerId, RoomCode, Role};
use std::sync::Arc;

/// Per-socket session: who is connected and to which room
#[derive(Debug, Clone)]
pub struct Connection {
    pub role: Role,
    pub room_code: Option<RoomCode>,
    /// Set once a player has joined
    pub player_id: Option<PlayerId>,
}

impl Connection {
    pub fn new(role: Role, room_code: Option<RoomCode>) -> Self {
        Self {
            role,
            room_code,
            player_id: None,
        }
    }
}

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($conn:expr, $action:expr) => {
        if $conn.role != Role::Host {
            return Some(ServerMessage::error(
                "UNAUTHORIZED",
                format!("Only host can {}", $action),
            ));
        }
    };
}

/// Bind the connection's room code or return early
macro_rules! require_room {
    ($conn:expr) => {
        match $conn.room_code.clone() {
            Some(code) => code,
            None => {
                return Some(ServerMessage::error(
                    "NO_ROOM",
                    "Connection is not attached to a room",
                ))
            }
        }
    };
}

/// Bind the joined player's id or return early
macro_rules! require_player {
    ($conn:expr) => {
        match $conn.player_id.clone() {
            Some(id) => id,
            None => {
                return Some(ServerMessage::error(
                    "NOT_JOINED",
                    "Join the room before playing",
                ))
            }
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Ping => Some(ServerMessage::Pong),

        // Player messages
        ClientMessage::JoinRoom { player_id, name } => {
            let code = require_room!(conn);
            if conn.role != Role::Player {
                return Some(ServerMessage::error(
                    "UNAUTHORIZED",
                    "Only players can join a room",
                ));
            }
            match state.join_room(&code, &player_id, &name).await {
                Ok((room, player)) => {
                    conn.player_id = Some(player.id.clone());
                    Some(ServerMessage::Joined { room, player })
                }
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::SubmitAnswer { text } => {
            let code = require_room!(conn);
            let player_id = require_player!(conn);
            match state.submit_answer(&code, &player_id, &text).await {
                Ok(answer) => Some(ServerMessage::AnswerAccepted {
                    answer_id: answer.id,
                }),
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::CastVote { option_id } => {
            let code = require_room!(conn);
            let player_id = require_player!(conn);
            match state.cast_ballot_vote(&code, &player_id, &option_id).await {
                Ok(outcome) => Some(ServerMessage::VoteAccepted {
                    voting_complete: outcome.voting_complete,
                }),
                Err(e) => Some(e.into()),
            }
        }

        // Read-only views
        ClientMessage::RequestSnapshot => {
            let code = require_room!(conn);
            let result = match conn.role {
                Role::Host => state
                    .get_room_snapshot(&code)
                    .await
                    .map(|snapshot| ServerMessage::Snapshot { snapshot }),
                Role::Player => state
                    .get_player_snapshot(&code)
                    .await
                    .map(|snapshot| ServerMessage::PlayerSnapshot { snapshot }),
            };
            Some(result.unwrap_or_else(ServerMessage::from))
        }

        ClientMessage::RequestLeaderboard => {
            let code = require_room!(conn);
            match state.get_leaderboard(&code).await {
                Ok(leaderboard) => Some(ServerMessage::Leaderboard { leaderboard }),
                Err(e) => Some(e.into()),
            }
        }

        // Host-only commands (authorization checked before dispatch)
        ClientMessage::HostCreateRoom {
            host_id,
            host_name,
            categories,
        } => {
            check_host!(conn, "create rooms");
            match state.create_room(&host_id, &host_name, categories).await {
                Ok(room) => {
                    conn.room_code = Some(room.code.clone());
                    Some(ServerMessage::RoomCreated { room })
                }
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::HostStartRound => {
            check_host!(conn, "start rounds");
            let code = require_room!(conn);
            // Clients learn about the round from the room broadcast
            match state.start_round(&code).await {
                Ok(_) => None,
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::HostStartVoting => {
            check_host!(conn, "start voting");
            let code = require_room!(conn);
            match state.start_voting(&code).await {
                Ok(_) => None,
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::HostShowResults => {
            check_host!(conn, "show results");
            let code = require_room!(conn);
            match state.show_results(&code).await {
                Ok(results) => Some(ServerMessage::Results { results }),
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::HostEndRoom => {
            check_host!(conn, "end the room");
            let code = require_room!(conn);
            match state.end_room(&code).await {
                Ok(()) => Some(ServerMessage::RoomEnded),
                Err(e) => Some(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomStatus;

    async fn host_with_room(state: &Arc<AppState>) -> (Connection, String) {
        let mut host = Connection::new(Role::Host, None);
        let response = handle_message(
            ClientMessage::HostCreateRoom {
                host_id: "host".to_string(),
                host_name: "Host".to_string(),
                categories: vec![],
            },
            &mut host,
            state,
        )
        .await;
        let Some(ServerMessage::RoomCreated { room }) = response else {
            panic!("Expected RoomCreated message");
        };
        (host, room.code)
    }

    async fn joined_player(state: &Arc<AppState>, code: &str, id: &str) -> Connection {
        let mut player = Connection::new(Role::Player, Some(code.to_string()));
        let response = handle_message(
            ClientMessage::JoinRoom {
                player_id: id.to_string(),
                name: id.to_uppercase(),
            },
            &mut player,
            state,
        )
        .await;
        assert!(matches!(response, Some(ServerMessage::Joined { .. })));
        player
    }

    #[tokio::test]
    async fn test_unauthorized_host_command() {
        let state = Arc::new(AppState::in_memory());
        let (_, code) = host_with_room(&state).await;
        let mut player = Connection::new(Role::Player, Some(code));

        let result = handle_message(ClientMessage::HostStartRound, &mut player, &state).await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "UNAUTHORIZED");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_host_create_room_attaches_connection() {
        let state = Arc::new(AppState::in_memory());
        let (host, code) = host_with_room(&state).await;

        assert_eq!(host.room_code.as_deref(), Some(code.as_str()));
        assert!(state.require_room(&code).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_before_join_is_rejected() {
        let state = Arc::new(AppState::in_memory());
        let (_, code) = host_with_room(&state).await;
        let mut player = Connection::new(Role::Player, Some(code));

        let result = handle_message(
            ClientMessage::SubmitAnswer {
                text: "Lyon".to_string(),
            },
            &mut player,
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "NOT_JOINED");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_command_without_room() {
        let state = Arc::new(AppState::in_memory());
        let mut host = Connection::new(Role::Host, None);

        let result = handle_message(ClientMessage::HostStartRound, &mut host, &state).await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "NO_ROOM");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_start_round_with_one_player_reports_validation() {
        let state = Arc::new(AppState::in_memory());
        let (mut host, code) = host_with_room(&state).await;
        joined_player(&state, &code, "alice").await;

        let result = handle_message(ClientMessage::HostStartRound, &mut host, &state).await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "VALIDATION_ERROR");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_vote_in_wrong_phase_is_state_conflict() {
        let state = Arc::new(AppState::in_memory());
        let (mut host, code) = host_with_room(&state).await;
        let mut alice = joined_player(&state, &code, "alice").await;
        joined_player(&state, &code, "bob").await;

        handle_message(ClientMessage::HostStartRound, &mut host, &state).await;

        let result = handle_message(
            ClientMessage::CastVote {
                option_id: "anything".to_string(),
            },
            &mut alice,
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "STATE_CONFLICT");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_snapshot_view_depends_on_role() {
        let state = Arc::new(AppState::in_memory());
        let (mut host, code) = host_with_room(&state).await;
        let mut alice = joined_player(&state, &code, "alice").await;
        joined_player(&state, &code, "bob").await;
        handle_message(ClientMessage::HostStartRound, &mut host, &state).await;
        handle_message(ClientMessage::HostStartVoting, &mut host, &state).await;

        let result = handle_message(ClientMessage::RequestSnapshot, &mut alice, &state).await;
        let Some(ServerMessage::PlayerSnapshot { snapshot }) = result else {
            panic!("Expected PlayerSnapshot message");
        };
        assert!(snapshot.reveal.is_none());
        assert!(!snapshot.ballot.is_empty());

        let result = handle_message(ClientMessage::RequestSnapshot, &mut host, &state).await;
        let Some(ServerMessage::Snapshot { snapshot }) = result else {
            panic!("Expected Snapshot message");
        };
        assert!(snapshot.question.is_some());
    }

    #[tokio::test]
    async fn test_vote_by_option_id() {
        let state = Arc::new(AppState::in_memory());
        let (mut host, code) = host_with_room(&state).await;
        let mut alice = joined_player(&state, &code, "alice").await;
        joined_player(&state, &code, "bob").await;
        handle_message(ClientMessage::HostStartRound, &mut host, &state).await;
        handle_message(ClientMessage::HostStartVoting, &mut host, &state).await;

        let Some(ServerMessage::PlayerSnapshot { snapshot }) =
            handle_message(ClientMessage::RequestSnapshot, &mut alice, &state).await
        else {
            panic!("Expected PlayerSnapshot message");
        };
        let result = handle_message(
            ClientMessage::CastVote {
                option_id: snapshot.ballot[0].option_id.clone(),
            },
            &mut alice,
            &state,
        )
        .await;

        assert!(matches!(
            result,
            Some(ServerMessage::VoteAccepted {
                voting_complete: false
            })
        ));
    }

    #[tokio::test]
    async fn test_end_room() {
        let state = Arc::new(AppState::in_memory());
        let (mut host, code) = host_with_room(&state).await;

        let result = handle_message(ClientMessage::HostEndRoom, &mut host, &state).await;
        assert!(matches!(result, Some(ServerMessage::RoomEnded)));

        let room = state.require_room(&code).await.unwrap();
        assert_eq!(room.status, RoomStatus::Ended);
    }

    #[tokio::test]
    async fn test_ping() {
        let state = Arc::new(AppState::in_memory());
        let mut conn = Connection::new(Role::Player, None);
        let result = handle_message(ClientMessage::Ping, &mut conn, &state).await;
        assert!(matches!(result, Some(ServerMessage::Pong)));
    }
}
