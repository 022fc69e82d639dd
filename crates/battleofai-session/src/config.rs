//! Session configuration.

use std::time::Duration;

use battleofai_match::PlayConfig;
use serde::{Deserialize, Serialize};

/// How a session finds and plays its match.
///
/// Durations are written as (fractional) seconds in serialized form:
///
/// ```json
/// { "join_own_games": true, "turn_interval": 0.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Resume a started game this player already sits in before looking
    /// for a new one.
    pub rejoin_ongoing_games: bool,

    /// Allow joining open games this player already sits in.
    pub join_own_games: bool,

    /// Pause after every poll of a running game.
    #[serde(with = "secs")]
    pub turn_interval: Duration,

    /// Pause between polls while waiting for opponents.
    #[serde(with = "secs")]
    pub matchmaking_interval: Duration,

    /// Upper bound of a random delay before matchmaking starts. Spreads
    /// out sessions started together so they don't all create games at
    /// once. Zero disables it.
    #[serde(with = "secs")]
    pub start_jitter: Duration,

    /// How many times one run may log in again after the service rejected
    /// its token. The next rejection fails the run.
    pub max_reauth_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rejoin_ongoing_games: false,
            join_own_games: false,
            turn_interval: Duration::from_secs(1),
            matchmaking_interval: Duration::from_secs(5),
            start_jitter: Duration::ZERO,
            max_reauth_attempts: 3,
        }
    }
}

impl SessionConfig {
    /// The pacing handed to the match driver.
    pub fn play_config(&self) -> PlayConfig {
        PlayConfig {
            turn_interval: self.turn_interval,
            matchmaking_interval: self.matchmaking_interval,
        }
    }
}

/// `Duration` as a float number of seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
