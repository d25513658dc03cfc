use serde::{Deserialize, Serialize};

/// Score thresholds separating the three triage bands.
///
/// Constructed once from configuration; `manual_review <= auto_send` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriageThresholds {
    auto_send: u8,
    manual_review: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold {0} exceeds 100")]
    OutOfRange(u8),
    #[error("manual review threshold {manual_review} is above auto-send threshold {auto_send}")]
    Inverted { auto_send: u8, manual_review: u8 },
}

impl TriageThresholds {
    pub fn new(auto_send: u8, manual_review: u8) -> Result<Self, ThresholdError> {
        for value in [auto_send, manual_review] {
            if value > 100 {
                return Err(ThresholdError::OutOfRange(value));
            }
        }
        if manual_review > auto_send {
            return Err(ThresholdError::Inverted {
                auto_send,
                manual_review,
            });
        }
        Ok(Self {
            auto_send,
            manual_review,
        })
    }

    pub fn auto_send(&self) -> u8 {
        self.auto_send
    }

    pub fn manual_review(&self) -> u8 {
        self.manual_review
    }
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self {
            auto_send: 80,
            manual_review: 60,
        }
    }
}

#[derive(Deserialize)]
struct RawThresholds {
    auto_send: u8,
    manual_review: u8,
}

impl<'de> Deserialize<'de> for TriageThresholds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawThresholds::deserialize(deserializer)?;
        TriageThresholds::new(raw.auto_send, raw.manual_review).map_err(serde::de::Error::custom)
    }
}
