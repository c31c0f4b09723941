//! Wire vocabulary shared by every layer of the client.
//!
//! This crate has no dependencies. It names the things the server and the
//! client agree on (command names, event tags, fixed field names, the default
//! endpoint) so that the codec, the client runtime, and front ends all use the
//! same spelling.
//!
//! # Wire shapes
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | client → server | `{"command": <name>, "body": <object>, "id"?: <uuid>}` |
//! | server → client (response) | `{"id": <uuid>, "ok": <bool>, "body"?: <any>, "message"?: <string>}` |
//! | server → client (event) | `{"event": <tag>, "body": <any>}` |
//!
//! # Examples
//!
//! ```
//! use dart_duel_types::{CommandKind, EventKind, DEFAULT_PORT};
//!
//! assert_eq!(CommandKind::Login.as_str(), "login");
//! assert_eq!(EventKind::from_tag("newUserOnline"), Some(EventKind::NewUserOnline));
//! assert_eq!(EventKind::from_tag("somethingElse"), None);
//! assert_eq!(DEFAULT_PORT, 5000);
//! ```

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Field carrying the correlation id in requests and the matching responses.
pub const CORRELATION_FIELD: &str = "id";

/// Field carrying the command name of an outbound command.
pub const COMMAND_FIELD: &str = "command";

/// Field carrying the tag of a server-pushed event.
pub const EVENT_FIELD: &str = "event";

/// Field carrying the success flag of a response.
pub const OK_FIELD: &str = "ok";

/// Message used when the server rejects a request without saying why.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error.";

/// Commands understood by the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Login,
    Register,
    ListOnline,
    ChallengePlayer,
    AnswerChallenge,
    Throw,
    Forfeit,
    Spin,
}

impl CommandKind {
    /// All commands, in declaration order.
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Login,
        CommandKind::Register,
        CommandKind::ListOnline,
        CommandKind::ChallengePlayer,
        CommandKind::AnswerChallenge,
        CommandKind::Throw,
        CommandKind::Forfeit,
        CommandKind::Spin,
    ];

    /// Parse a command name (exact, case-sensitive wire spelling).
    ///
    /// ```
    /// use dart_duel_types::CommandKind;
    ///
    /// assert_eq!(CommandKind::from_name("listOnline"), Some(CommandKind::ListOnline));
    /// assert_eq!(CommandKind::from_name("listonline"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Wire spelling of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Login => "login",
            CommandKind::Register => "register",
            CommandKind::ListOnline => "listOnline",
            CommandKind::ChallengePlayer => "challengePlayer",
            CommandKind::AnswerChallenge => "answerChallenge",
            CommandKind::Throw => "throw",
            CommandKind::Forfeit => "forfeit",
            CommandKind::Spin => "spin",
        }
    }
}

/// Server-pushed event tags.
///
/// - **NewUserOnline** / **UserOffline**: body is the username
/// - **NewChallenge**: body carries `from` and `challengeId`
/// - **ChallengeCanceled** / **ChallengeRejected**: body describes the challenge
/// - **StartGame**: body describes the match that just started
/// - **OtherThrew**: the opponent threw a dart
/// - **PlayerForfeited**: a player left the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewUserOnline,
    UserOffline,
    NewChallenge,
    ChallengeCanceled,
    ChallengeRejected,
    StartGame,
    OtherThrew,
    PlayerForfeited,
}

impl EventKind {
    /// All event kinds, in declaration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::NewUserOnline,
        EventKind::UserOffline,
        EventKind::NewChallenge,
        EventKind::ChallengeCanceled,
        EventKind::ChallengeRejected,
        EventKind::StartGame,
        EventKind::OtherThrew,
        EventKind::PlayerForfeited,
    ];

    /// Parse an event tag (exact wire spelling).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }

    /// Wire spelling of the event tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewUserOnline => "newUserOnline",
            EventKind::UserOffline => "userOffline",
            EventKind::NewChallenge => "newChallenge",
            EventKind::ChallengeCanceled => "challengeCanceled",
            EventKind::ChallengeRejected => "challengeRejected",
            EventKind::StartGame => "startGame",
            EventKind::OtherThrew => "otherThrew",
            EventKind::PlayerForfeited => "playerForfeited",
        }
    }
}

/// Answer to a received challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeAnswer {
    Accepted,
    Declined,
}

impl ChallengeAnswer {
    /// Parse an answer (case-insensitive).
    ///
    /// ```
    /// use dart_duel_types::ChallengeAnswer;
    ///
    /// assert_eq!(ChallengeAnswer::from_str("Accepted"), Some(ChallengeAnswer::Accepted));
    /// assert_eq!(ChallengeAnswer::from_str("maybe"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "accepted" => Some(ChallengeAnswer::Accepted),
            "declined" => Some(ChallengeAnswer::Declined),
            _ => None,
        }
    }

    /// Wire spelling used in the `newStatus` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeAnswer::Accepted => "accepted",
            ChallengeAnswer::Declined => "declined",
        }
    }
}
