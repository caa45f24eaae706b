use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Aspect ratios the image model is steered towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Tall,
        AspectRatio::Wide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Tall => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }

    /// Accept a model-provided ratio, falling back to 1:1 for anything
    /// missing or unrecognized.
    pub fn resolve(value: Option<&str>) -> AspectRatio {
        match value {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid aspect ratio received: {:?}. Defaulting to 1:1.", raw);
                AspectRatio::Square
            }),
            None => AspectRatio::Square,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAspectRatio(pub String);

impl fmt::Display for UnknownAspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown aspect ratio: {}", self.0)
    }
}

impl std::error::Error for UnknownAspectRatio {}

impl FromStr for AspectRatio {
    type Err = UnknownAspectRatio;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| UnknownAspectRatio(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ratios_pass_through_unchanged() {
        for ratio in AspectRatio::ALL {
            assert_eq!(AspectRatio::resolve(Some(ratio.as_str())), ratio);
        }
    }

    #[test]
    fn anything_else_becomes_square() {
        for raw in ["", "2:1", "16:10", "1:1 ", "square", "9/16"] {
            assert_eq!(AspectRatio::resolve(Some(raw)), AspectRatio::Square, "{raw:?}");
        }
        assert_eq!(AspectRatio::resolve(None), AspectRatio::Square);
    }

    #[test]
    fn serializes_as_ratio_string() {
        assert_eq!(serde_json::to_string(&AspectRatio::Wide).unwrap(), "\"16:9\"");
        assert_eq!(AspectRatio::Tall.to_string(), "9:16");
    }
}
