use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One-word sentiment categories the generative model is asked to choose from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Happy,
    Sad,
    Angry,
    Stressed,
    Depressed,
    Carefree,
    Emotional,
    Neutral,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 8] = [
        SentimentLabel::Happy,
        SentimentLabel::Sad,
        SentimentLabel::Angry,
        SentimentLabel::Stressed,
        SentimentLabel::Depressed,
        SentimentLabel::Carefree,
        SentimentLabel::Emotional,
        SentimentLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Happy => "Happy",
            SentimentLabel::Sad => "Sad",
            SentimentLabel::Angry => "Angry",
            SentimentLabel::Stressed => "Stressed",
            SentimentLabel::Depressed => "Depressed",
            SentimentLabel::Carefree => "Carefree",
            SentimentLabel::Emotional => "Emotional",
            SentimentLabel::Neutral => "Neutral",
        }
    }

    /// Comma separated list used when prompting, e.g. `Happy, Sad, ...`.
    pub fn choices() -> String {
        Self::ALL.map(|l| l.as_str()).join(", ")
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized sentiment label: {0:?}")]
pub struct UnknownSentiment(pub String);

impl FromStr for SentimentLabel {
    type Err = UnknownSentiment;

    /// Accepts model output such as `"Happy"`, `"sad."` or `"**Angry**"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().to_lowercase() == word)
            .ok_or_else(|| UnknownSentiment(s.to_owned()))
    }
}
