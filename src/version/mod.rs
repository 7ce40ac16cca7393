// src/version/mod.rs

//! Semantic version parsing, ordering, and range satisfaction.
//!
//! Versions carry up to four numeric parts (major.minor.patch.revision) and
//! an optional pre-release label. Ranges use the bracket/paren interval
//! syntax: `[1.0]` exact, `[1.0,2.0)` half-open, `1.0` meaning ">= 1.0",
//! `(1.0,)` exclusive minimum with no upper bound.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// A parsed semantic version with an optional pre-release label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub release: Option<String>,
}

impl SemanticVersion {
    /// Build a version from its numeric parts, no pre-release label
    pub fn new(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
            release: None,
        }
    }

    /// Parse a version string
    ///
    /// Format: 1 to 4 dot-separated numeric parts, optional -label suffix.
    /// Missing parts normalize to zero, so "1.0" and "1.0.0.0" are equal.
    /// Examples:
    /// - "1.2" → (1, 2, 0, 0)
    /// - "1.2.3.4" → (1, 2, 3, 4)
    /// - "2.0-beta" → (2, 0, 0, 0) with label "beta"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Parse("empty version string".to_string()));
        }

        let (numeric, release) = match s.find('-') {
            Some(pos) => {
                let (n, r) = s.split_at(pos);
                (n, Some(r[1..].to_string()))
            }
            None => (s, None),
        };

        if let Some(ref label) = release {
            if label.is_empty()
                || !label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            {
                return Err(Error::Parse(format!(
                    "invalid pre-release label in '{}'",
                    s
                )));
            }
        }

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() > 4 {
            return Err(Error::Parse(format!(
                "expected 1 to 4 numeric parts in '{}'",
                s
            )));
        }

        let mut values = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part.parse::<u64>().map_err(|e| {
                Error::Parse(format!("invalid numeric segment '{}' in '{}': {}", part, s, e))
            })?;
        }

        Ok(Self {
            major: values[0],
            minor: values[1],
            patch: values[2],
            revision: values[3],
            release,
        })
    }

    /// True if this version carries a pre-release label
    pub fn is_prerelease(&self) -> bool {
        self.release.is_some()
    }

    fn numeric(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }

    /// Compare two versions
    ///
    /// Numeric parts compare left to right; a version with a pre-release
    /// label orders strictly before the same numeric tuple without one, and
    /// labels compare ordinally against each other.
    pub fn compare(&self, other: &SemanticVersion) -> Ordering {
        match self.numeric().cmp(&other.numeric()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (&self.release, &other.release) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An interval of acceptable versions
///
/// Absent min and max means "any version". Contradictory intervals (equal
/// bounds without both flags inclusive, or min above max) are rejected at
/// parse time so satisfaction checks never see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<SemanticVersion>,
    pub min_inclusive: bool,
    pub max: Option<SemanticVersion>,
    pub max_inclusive: bool,
}

impl VersionRange {
    /// The unbounded range accepting any version
    pub fn any() -> Self {
        Self {
            min: None,
            min_inclusive: false,
            max: None,
            max_inclusive: false,
        }
    }

    /// The range matching exactly one version
    pub fn exact(version: SemanticVersion) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// The range ">= version" with no upper bound
    pub fn at_least(version: SemanticVersion) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// Parse a range string
    ///
    /// Examples:
    /// - "1.0" → >= 1.0, no upper bound
    /// - "[1.0]" → exactly 1.0
    /// - "[1.0,2.0)" → 1.0 <= v < 2.0
    /// - "(1.0,)" → v > 1.0
    /// - "[,1.0]" → v <= 1.0
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Parse("empty range string".to_string()));
        }

        let first = s.chars().next().unwrap();
        if first != '[' && first != '(' {
            // Bare version: inclusive minimum, unbounded maximum
            return Ok(Self::at_least(SemanticVersion::parse(s)?));
        }

        let last = s.chars().last().unwrap();
        if s.len() < 2 || (last != ']' && last != ')') {
            return Err(Error::Parse(format!("unterminated range '{}'", s)));
        }

        let min_inclusive = first == '[';
        let max_inclusive = last == ']';
        let inner = &s[1..s.len() - 1];

        let range = match inner.find(',') {
            None => {
                // Single-version form is only meaningful as an exact match
                if !min_inclusive || !max_inclusive {
                    return Err(Error::Parse(format!(
                        "exact range '{}' must use square brackets",
                        s
                    )));
                }
                Self::exact(SemanticVersion::parse(inner)?)
            }
            Some(pos) => {
                let (min_str, max_str) = inner.split_at(pos);
                let max_str = &max_str[1..];
                let min = if min_str.trim().is_empty() {
                    None
                } else {
                    Some(SemanticVersion::parse(min_str)?)
                };
                let max = if max_str.trim().is_empty() {
                    None
                } else {
                    Some(SemanticVersion::parse(max_str)?)
                };
                Self {
                    min,
                    min_inclusive,
                    max,
                    max_inclusive,
                }
            }
        };

        range.validate(s)?;
        Ok(range)
    }

    /// Reject contradictory intervals
    fn validate(&self, text: &str) -> Result<()> {
        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            match min.compare(max) {
                Ordering::Greater => {
                    return Err(Error::Parse(format!(
                        "range '{}' has minimum above maximum",
                        text
                    )));
                }
                Ordering::Equal => {
                    if !(self.min_inclusive && self.max_inclusive) {
                        return Err(Error::Parse(format!(
                            "range '{}' is an empty interval",
                            text
                        )));
                    }
                }
                Ordering::Less => {}
            }
        }
        Ok(())
    }

    /// Check whether a version falls inside this range
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        if let Some(ref min) = self.min {
            let ord = version.compare(min);
            if ord == Ordering::Less || (ord == Ordering::Equal && !self.min_inclusive) {
                return false;
            }
        }
        if let Some(ref max) = self.max {
            let ord = version.compare(max);
            if ord == Ordering::Greater || (ord == Ordering::Equal && !self.max_inclusive) {
                return false;
            }
        }
        true
    }

    /// True if this range matches exactly one version
    pub fn is_exact(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => min == max,
            _ => false,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "(,)"),
            (Some(min), None) if self.min_inclusive => write!(f, "{}", min),
            _ => {
                if self.is_exact() {
                    return write!(f, "[{}]", self.min.as_ref().unwrap());
                }
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(ref min) = self.min {
                    write!(f, "{}", min)?;
                }
                write!(f, ",")?;
                if let Some(ref max) = self.max {
                    write!(f, "{}", max)?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}
