use std::{fmt, str::FromStr, sync::Arc};

use chrono::{SecondsFormat, Utc};
use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};

use serde::Serialize;

use crate::Error;

/// Produces the content of one event every time the connection timer fires.
pub trait PayloadGenerator: Send + Sync {
    /// A short name for logs and the info endpoint.
    fn kind(&self) -> &'static str;

    /// Produce the payload of the next event, as a single line of text.
    fn generate(&self) -> Result<String, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerStatus {
    Playing,
    Waiting,
}

impl Distribution<PlayerStatus> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PlayerStatus {
        if rng.random_bool(0.5) {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Waiting
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    Paid,
    Pending,
    Unpaid,
}

impl Distribution<GameStatus> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GameStatus {
        match rng.random_range(0..3) {
            0 => GameStatus::Paid,
            1 => GameStatus::Pending,
            _ => GameStatus::Unpaid,
        }
    }
}

/// One row of the roster as it is sent to clients.
///
/// The rank is sent as a string, clients display it as is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: &'static str,
    pub status: PlayerStatus,
    pub rank: String,
    pub game_status: GameStatus,
    pub court: &'static str,
}

/// The fixed part of the roster, name and court.
const PLAYERS: [(&str, &str); 7] = [
    ("Rodger Federer", "Court 1"),
    ("Rafael Nadal", "Court 2"),
    ("Novak Djokovic", "Court 3"),
    ("Andy Murray", "Court 4"),
    ("Stan Wawrinka", "Court 5"),
    ("Nick Kyrgios", "Court 6"),
    ("Juan Martin del Potro", "Court 7"),
];

/// A randomized snapshot of a fixed roster of seven players.
///
/// Every snapshot redraws rank, status and game status of every player
/// independently, nothing is carried over from the previous one.
///
/// # Test
///
/// ```
/// use sse_push_service::payload::Roster;
///
/// let players = Roster.snapshot();
///
/// assert_eq!(players.len(), 7);
/// assert_eq!(players[0].name, "Rodger Federer");
/// assert_eq!(players[6].court, "Court 7");
///
/// for player in players {
///     let rank = player.rank.parse::<u8>().unwrap();
///     assert!((1..=100).contains(&rank));
/// }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Roster;

impl Roster {
    pub fn snapshot(&self) -> Vec<Player> {
        let mut rng = rand::rng();

        PLAYERS
            .iter()
            .map(|&(name, court)| Player {
                name,
                court,
                rank: rng.random_range(1..=100u8).to_string(),
                status: rng.random(),
                game_status: rng.random(),
            })
            .collect()
    }
}

impl PayloadGenerator for Roster {
    fn kind(&self) -> &'static str {
        "roster"
    }

    fn generate(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}

/// The current time, RFC 3339 in UTC with millisecond precision.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timestamp;

impl PayloadGenerator for Timestamp {
    fn kind(&self) -> &'static str {
        "timestamp"
    }

    fn generate(&self) -> Result<String, Error> {
        Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// The payload generators the server can be configured with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    #[default]
    Roster,
    Timestamp,
}

impl PayloadKind {
    pub fn generator(&self) -> Arc<dyn PayloadGenerator> {
        match self {
            Self::Roster => Arc::new(Roster),
            Self::Timestamp => Arc::new(Timestamp),
        }
    }
}

impl FromStr for PayloadKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "roster" => Self::Roster,
            "timestamp" => Self::Timestamp,
            _ => return Err(format!("unknown payload kind: {value}")),
        })
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Roster => "roster",
            Self::Timestamp => "timestamp",
        })
    }
}
