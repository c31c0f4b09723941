//! Typed wrappers around the server's commands.
//!
//! Each helper is a correlated call: `ok: false` comes back as
//! [`ClientError::RemoteRejected`] carrying the server's message.

use serde::Serialize;
use serde_json::Value;

use dart_duel_types::{ChallengeAnswer, CommandKind};

use crate::error::ClientError;
use crate::session::Session;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ChallengeRequest<'a> {
    to: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeReply {
    challenge_id: i64,
    new_status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchRef {
    match_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Spin {
    match_id: i64,
    rotation_amount: f64,
    #[serde(rename = "duration")]
    duration_ms: u64,
}

/// A dart throw.
///
/// `dx`/`dy` are the hit offset from the board centre and `rotation_angle`
/// the board rotation at release, all optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrowDart {
    pub match_id: i64,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_angle: Option<f64>,
}

impl ThrowDart {
    pub fn new(match_id: i64, score: i64) -> Self {
        Self {
            match_id,
            score,
            ..Self::default()
        }
    }

    pub fn at(mut self, dx: f64, dy: f64) -> Self {
        self.dx = Some(dx);
        self.dy = Some(dy);
        self
    }

    pub fn rotated(mut self, rotation_angle: f64) -> Self {
        self.rotation_angle = Some(rotation_angle);
        self
    }
}

impl Session {
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.call(
            CommandKind::Login.as_str(),
            Credentials { username, password },
        )
        .await?;
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.call(
            CommandKind::Register.as_str(),
            Credentials { username, password },
        )
        .await?;
        Ok(())
    }

    /// Players currently online, as the server describes them.
    pub async fn list_online(&self) -> Result<Vec<Value>, ClientError> {
        match self.call(CommandKind::ListOnline.as_str(), ()).await? {
            Some(body) => serde_json::from_value(body).map_err(ClientError::Decoding),
            None => Ok(Vec::new()),
        }
    }

    pub async fn challenge_player(&self, to: &str) -> Result<Option<Value>, ClientError> {
        self.call(
            CommandKind::ChallengePlayer.as_str(),
            ChallengeRequest { to },
        )
        .await
    }

    pub async fn answer_challenge(
        &self,
        challenge_id: i64,
        answer: ChallengeAnswer,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::AnswerChallenge.as_str(),
            ChallengeReply {
                challenge_id,
                new_status: answer.as_str(),
            },
        )
        .await?;
        Ok(())
    }

    pub async fn throw_dart(&self, throw: ThrowDart) -> Result<Option<Value>, ClientError> {
        self.call(CommandKind::Throw.as_str(), throw).await
    }

    pub async fn forfeit(&self, match_id: i64) -> Result<Option<Value>, ClientError> {
        self.call(CommandKind::Forfeit.as_str(), MatchRef { match_id })
            .await
    }

    /// Ask the server to spin the opponent's board by `rotation_amount`
    /// degrees over `duration_ms` milliseconds.
    pub async fn spin_dartboard(
        &self,
        match_id: i64,
        rotation_amount: f64,
        duration_ms: u64,
    ) -> Result<Option<Value>, ClientError> {
        self.call(
            CommandKind::Spin.as_str(),
            Spin {
                match_id,
                rotation_amount,
                duration_ms,
            },
        )
        .await
    }
}
