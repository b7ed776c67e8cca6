//! Temporal intervals and closed-closed intersection
//!
//! Queries and documents both reduce to [`Interval`]: a single instant is the
//! degenerate interval `[t, t]`, and an absent bound means unbounded in that
//! direction. Intersection is closed-closed: `[a, b]` intersects `[c, d]` iff
//! `a <= d && c <= b`, with absent bounds treated as -inf / +inf.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

/// A closed datetime interval, possibly unbounded on either side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Inclusive lower bound; `None` means unbounded
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound; `None` means unbounded
    pub end: Option<DateTime<Utc>>,
}

/// Malformed datetime or interval content
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    /// A datetime string was not RFC 3339
    #[error("bad datetime {value}: {message}")]
    BadDatetime {
        /// The offending string
        value: String,
        /// Parser failure description
        message: String,
    },

    /// An interval did not have exactly two bounds
    #[error("interval must have exactly 2 bounds, got {0}")]
    BadArity(usize),
}

/// Parse one RFC 3339 datetime into UTC
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, TimeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimeError::BadDatetime {
            value: value.to_string(),
            message: e.to_string(),
        })
}

impl Interval {
    /// The interval covering all of time
    pub const UNBOUNDED: Interval = Interval {
        start: None,
        end: None,
    };

    /// A bounded or half-open interval
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Interval { start, end }
    }

    /// The degenerate interval `[t, t]`
    pub fn instant(at: DateTime<Utc>) -> Self {
        Interval {
            start: Some(at),
            end: Some(at),
        }
    }

    /// Closed-closed intersection with absent bounds as -inf / +inf
    pub fn intersects(&self, other: &Interval) -> bool {
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: &Option<DateTime<Utc>>| match b {
            Some(dt) => dt.to_rfc3339(),
            None => "..".to_string(),
        };
        write!(f, "{}/{}", bound(&self.start), bound(&self.end))
    }
}

/// Parses the STAC search datetime form: a single instant `t`, or an interval
/// `a/b` where either bound may be `..` (or empty) for unbounded.
impl FromStr for Interval {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_bound = |bound: &str| -> Result<Option<DateTime<Utc>>, TimeError> {
            if bound.is_empty() || bound == ".." {
                Ok(None)
            } else {
                parse_rfc3339(bound).map(Some)
            }
        };

        match s.split_once('/') {
            None => Ok(Interval::instant(parse_rfc3339(s)?)),
            Some((start, end)) => Ok(Interval::new(parse_bound(start)?, parse_bound(end)?)),
        }
    }
}

/// Deserializes the collection temporal-extent wire form:
/// `["2020-01-01T00:00:00Z", null]`.
impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IntervalVisitor;

        impl<'de> Visitor<'de> for IntervalVisitor {
            type Value = Interval;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of two nullable RFC 3339 datetimes")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Interval, A::Error> {
                let mut bounds: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(2);
                while let Some(bound) = seq.next_element::<Option<String>>()? {
                    let parsed = match bound {
                        Some(value) => Some(parse_rfc3339(&value).map_err(de::Error::custom)?),
                        None => None,
                    };
                    bounds.push(parsed);
                }
                if bounds.len() != 2 {
                    return Err(de::Error::custom(TimeError::BadArity(bounds.len())));
                }
                Ok(Interval::new(bounds[0], bounds[1]))
            }
        }

        deserializer.deserialize_seq(IntervalVisitor)
    }
}
