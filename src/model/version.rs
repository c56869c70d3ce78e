use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([vV]?)([0-9]+)\.([0-9]+)\.([0-9]+)$").unwrap());

static PLAIN_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").unwrap());

/// Which part of a version a bump acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Major,
    Minor,
    Patch,
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" | "maj" => Ok(Segment::Major),
            "minor" | "min" => Ok(Segment::Minor),
            "patch" | "pat" => Ok(Segment::Patch),
            other => Err(format!("unknown version segment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn delta(self) -> i64 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" | "+" | "+1" => Ok(Direction::Up),
            "down" | "-" | "-1" => Ok(Direction::Down),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// A `prefix + major.minor.patch` counter as stored in a version property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionValue {
    pub prefix: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Default for VersionValue {
    /// What unparseable input reads as
    fn default() -> Self {
        VersionValue {
            prefix: String::new(),
            major: 0,
            minor: 1,
            patch: 0,
        }
    }
}

impl VersionValue {
    /// Parse a stored value. Anything not shaped like `v1.2.3` reads as `0.1.0`.
    pub fn parse(s: &str) -> VersionValue {
        let Some(caps) = VERSION_RE.captures(s.trim()) else {
            return VersionValue::default();
        };
        let num = |i: usize| caps[i].parse::<u64>().ok();
        match (num(2), num(3), num(4)) {
            (Some(major), Some(minor), Some(patch)) => VersionValue {
                prefix: caps[1].to_string(),
                major,
                minor,
                patch,
            },
            _ => VersionValue::default(),
        }
    }

    /// Whether a stored string is a valid version property value
    pub fn is_valid(s: &str) -> bool {
        PLAIN_VERSION_RE.is_match(s)
    }

    /// Step one segment up or down with base-10 carry.
    ///
    /// Major never carries and never goes below zero. Minor refuses to go
    /// below `0.0.x`. The result is floored at `0.0.1`.
    pub fn bump(&self, segment: Segment, direction: Direction) -> VersionValue {
        let dir = direction.delta();
        let mut major = self.major;
        let (mut minor, mut patch) = (signed(self.minor), signed(self.patch));

        match segment {
            Segment::Patch => {
                let (p, carry) = add10(patch, dir);
                patch = p;
                let (m, carry) = add10(minor, carry);
                minor = m;
                major = major.saturating_add_signed(carry);
            }
            Segment::Minor => {
                if major == 0 && minor == 0 && direction == Direction::Down {
                    return self.clone();
                }
                let (m, carry) = add10(minor, dir);
                minor = m;
                major = major.saturating_add_signed(carry);
            }
            Segment::Major => {
                major = major.saturating_add_signed(dir);
            }
        }

        if major == 0 && minor == 0 && patch == 0 {
            patch = 1;
        }

        VersionValue {
            prefix: self.prefix.clone(),
            major,
            minor: minor.unsigned_abs(),
            patch: patch.unsigned_abs(),
        }
    }
}

/// Add `delta` to a decimal digit, returning the wrapped digit and the carry
fn add10(value: i64, delta: i64) -> (i64, i64) {
    let sum = value.saturating_add(delta);
    (sum.rem_euclid(10), sum.div_euclid(10))
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl fmt::Display for VersionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}.{}", self.prefix, self.major, self.minor, self.patch)
    }
}

/// Parse, bump, and re-serialize a stored version string
pub fn bump_str(current: &str, segment: Segment, direction: Direction) -> String {
    VersionValue::parse(current)
        .bump(segment, direction)
        .to_string()
}
