use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emotional-state signal captured before and after a session.
///
/// "Not yet captured" is expressed as `Option<MoodSignal>::None`, never as a
/// default mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodSignal {
    Happy,
    Neutral,
    Sad,
    Frustrated,
}

impl MoodSignal {
    pub const ALL: [MoodSignal; 4] = [
        MoodSignal::Happy,
        MoodSignal::Neutral,
        MoodSignal::Sad,
        MoodSignal::Frustrated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodSignal::Happy => "happy",
            MoodSignal::Neutral => "neutral",
            MoodSignal::Sad => "sad",
            MoodSignal::Frustrated => "frustrated",
        }
    }
}

impl fmt::Display for MoodSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mood '{0}' (expected happy, neutral, sad or frustrated)")]
pub struct ParseMoodError(pub String);

impl FromStr for MoodSignal {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        MoodSignal::ALL
            .into_iter()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| ParseMoodError(s.to_string()))
    }
}
