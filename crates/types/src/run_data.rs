use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static FRAME_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").expect("frame range pattern"));

/// Errors produced while parsing a frame range string.
#[derive(Debug, Error, PartialEq)]
pub enum FrameRangeError {
    #[error(
        "invalid frame range '{0}'; expected '<startFrame>-<endFrame>' or '<frame>'"
    )]
    Invalid(String),

    #[error("invalid frame range '{start}-{end}'; start frame is after end frame")]
    Reversed { start: u32, end: u32 },
}

/// An inclusive frame range, or a single frame when start and end agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    start: u32,
    end: u32,
}

impl FrameRange {
    /// Build a range from explicit endpoints.
    pub fn new(start: u32, end: u32) -> Result<Self, FrameRangeError> {
        if start > end {
            return Err(FrameRangeError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one frame.
    pub fn single(frame: u32) -> Self {
        Self {
            start: frame,
            end: frame,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of frames covered by the range.
    pub fn frame_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl FromStr for FrameRange {
    type Err = FrameRangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let captures = FRAME_RANGE_RE
            .captures(value.trim())
            .ok_or_else(|| FrameRangeError::Invalid(value.to_string()))?;
        let start: u32 = captures[1]
            .parse()
            .map_err(|_| FrameRangeError::Invalid(value.to_string()))?;
        let end = match captures.get(2) {
            Some(end) => end
                .as_str()
                .parse()
                .map_err(|_| FrameRangeError::Invalid(value.to_string()))?,
            None => start,
        };
        Self::new(start, end)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl Serialize for FrameRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FrameRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(frame) => Ok(FrameRange::single(frame)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Per-task parameters supplied to each `run` via `--run-data`.
///
/// The adaptor consumes `frameRange`; documentation samples also show a bare
/// `frame` key, which is accepted as a single-frame range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunData {
    #[serde(rename = "frameRange", alias = "frame")]
    pub frame_range: FrameRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_frame() {
        let range: FrameRange = "42".parse().unwrap();
        assert_eq!(range.start(), 42);
        assert_eq!(range.end(), 42);
        assert_eq!(range.frame_count(), 1);
        assert_eq!(range.to_string(), "42");
    }

    #[test]
    fn parses_frame_span() {
        let range: FrameRange = "1-10".parse().unwrap();
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 10);
        assert_eq!(range.frame_count(), 10);
        assert_eq!(range.to_string(), "1-10");
    }

    #[test]
    fn rejects_malformed_ranges() {
        for bad in ["", "a-b", "1-", "-5", "1-2-3", "1..5"] {
            assert!(bad.parse::<FrameRange>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_reversed_range() {
        assert_eq!(
            "10-1".parse::<FrameRange>(),
            Err(FrameRangeError::Reversed { start: 10, end: 1 })
        );
    }

    #[test]
    fn run_data_accepts_frame_range_key() {
        let run_data: RunData = serde_yaml::from_str("frameRange: 1-3").unwrap();
        assert_eq!(run_data.frame_range, FrameRange::new(1, 3).unwrap());
    }

    #[test]
    fn run_data_accepts_documented_frame_key() {
        let run_data: RunData = serde_yaml::from_str("frame: 42").unwrap();
        assert_eq!(run_data.frame_range, FrameRange::single(42));
    }
}
