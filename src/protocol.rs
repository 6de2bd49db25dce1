use crate::error::GameError;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Player messages
    JoinRoom {
        player_id: PlayerId,
        name: String,
    },
    SubmitAnswer {
        text: String,
    },
    /// Vote by the opaque option id from `voting_started`
    CastVote {
        option_id: String,
    },
    // Any role
    RequestSnapshot,
    RequestLeaderboard,
    Ping,
    // Host-only messages
    HostCreateRoom {
        host_id: PlayerId,
        host_name: String,
        #[serde(default)]
        categories: Vec<String>,
    },
    HostStartRound,
    HostStartVoting,
    HostShowResults,
    HostEndRoom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<Room>,
        server_now: String,
    },
    RoomCreated {
        room: Room,
    },
    Joined {
        room: Room,
        player: Player,
    },
    PlayerJoined {
        player: Player,
        player_count: usize,
    },
    Phase {
        status: RoomStatus,
        round_number: u32,
        server_now: String,
        valid_transitions: Vec<RoomStatus>,
    },
    RoundStarted {
        round_number: u32,
        question: String,
    },
    AnswerAccepted {
        answer_id: AnswerId,
    },
    AnswerSubmitted {
        player_id: PlayerId,
        submitted: usize,
        player_count: usize,
    },
    VotingStarted {
        ballot: Vec<BallotEntry>,
    },
    VoteAccepted {
        voting_complete: bool,
    },
    VoteCast {
        player_id: PlayerId,
        votes: usize,
        player_count: usize,
    },
    Results {
        results: RoundResults,
    },
    /// Full room view, host connections only
    Snapshot {
        snapshot: RoomSnapshot,
    },
    PlayerSnapshot {
        snapshot: PlayerSnapshot,
    },
    Leaderboard {
        leaderboard: Leaderboard,
    },
    RoomEnded,
    Pong,
    Error {
        code: String,
        msg: String,
        /// Present when scoring was computed but could not be committed
        #[serde(skip_serializing_if = "Option::is_none")]
        results: Option<RoundResults>,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            msg: msg.into(),
            results: None,
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(err: GameError) -> Self {
        let code = err.code().to_string();
        let msg = err.to_string();
        let results = match err {
            GameError::ScoringFailed { results, .. } => Some(*results),
            _ => None,
        };
        Self::Error { code, msg, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"cast_vote","option_id":"01J0ABC"}"#).unwrap();
        if let ClientMessage::CastVote { option_id } = msg {
            assert_eq!(option_id, "01J0ABC");
        } else {
            panic!("Expected CastVote");
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"host_start_round"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::HostStartRound));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"host_create_room","host_id":"h","host_name":"Host"}"#,
        )
        .unwrap();
        if let ClientMessage::HostCreateRoom { categories, .. } = msg {
            assert!(categories.is_empty());
        } else {
            panic!("Expected HostCreateRoom");
        }
    }

    #[test]
    fn test_voting_started_carries_only_ids_and_texts() {
        let json = serde_json::to_value(ServerMessage::VotingStarted {
            ballot: vec![BallotEntry {
                option_id: "01J0ABC".to_string(),
                text: "Paris".to_string(),
            }],
        })
        .unwrap();
        assert_eq!(json["t"], "voting_started");
        assert_eq!(
            json["ballot"][0],
            serde_json::json!({"option_id": "01J0ABC", "text": "Paris"})
        );
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_value(ServerMessage::Phase {
            status: RoomStatus::Voting,
            round_number: 3,
            server_now: "now".to_string(),
            valid_transitions: vec![RoomStatus::Results, RoomStatus::Ended],
        })
        .unwrap();
        assert_eq!(json["t"], "phase");
        assert_eq!(json["status"], "VOTING");
        assert_eq!(json["valid_transitions"][0], "RESULTS");
    }

    #[test]
    fn test_error_omits_missing_results() {
        let json = serde_json::to_value(ServerMessage::from(GameError::validation("nope"))).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["msg"], "nope");
        assert!(json.get("results").is_none());
    }
}
