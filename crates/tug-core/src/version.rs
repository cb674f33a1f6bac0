//! Composer version normalization.
//!
//! Turns tag and branch names into the canonical form Composer compares on:
//! four numeric components, an optional expanded stability suffix and the
//! `-dev` marker. Branches that do not look numeric keep their name behind a
//! `dev-` prefix.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized form of `master`, `trunk` and `default`.
pub const MASTER_VERSION: &str = "9999999-dev";

/// Replacement for `x` wildcards in numeric branch names.
const WILDCARD: &str = "9999999";

/// Pre-release and dev modifiers accepted after a numeric version.
///
/// An underscore, dot or nothing at all may stand in for the hyphen.
const MODIFIER: &str = r"[._-]?(?:(stable|beta|b|RC|alpha|a|patch|pl|p)((?:[.-]?[0-9]+)*)?)?([.-]?dev)?";

static ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^,\s]+) +as +([^,\s]+)$").expect("invalid alias regex"));

static MASTER_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:dev-)?(?:master|trunk|default)$").expect("invalid master regex")
});

static BUILD_METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^,\s+]+)\+[^\s]+$").expect("invalid metadata regex"));

static CLASSIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^v?([0-9]{{1,5}})(\.[0-9]+)?(\.[0-9]+)?(\.[0-9]+)?{MODIFIER}$"
    ))
    .expect("invalid classic version regex")
});

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^v?([0-9]{{4}}(?:[.:-]?[0-9]{{2}}){{1,6}}(?:[.:-]?[0-9]{{1,3}})?){MODIFIER}$"
    ))
    .expect("invalid date version regex")
});

static DEV_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(.*?)[.-]?dev$").expect("invalid dev branch regex"));

static NUMERIC_BRANCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^v?([0-9]+)(\.(?:[0-9]+|[x*]))?(\.(?:[0-9]+|[x*]))?(\.(?:[0-9]+|[x*]))?$")
        .expect("invalid numeric branch regex")
});

static STABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){MODIFIER}(?:\+.*)?$")).expect("invalid stability regex")
});

/// Normalize a version string so it can be compared.
///
/// `full_version` is only carried into the error message; it defaults to the
/// trimmed input.
///
/// # Errors
/// Returns [`Error::InvalidVersion`] when no grammar accepts the string.
pub fn normalize(version: &str, full_version: Option<&str>) -> Result<String> {
    let mut version = version.trim();
    let full_version = full_version
        .filter(|v| !v.is_empty())
        .unwrap_or(version)
        .to_string();

    if let Some(target) = ALIAS.captures(version).and_then(|c| c.get(1)) {
        version = target.as_str();
    }

    if MASTER_LIKE.is_match(version) {
        return Ok(MASTER_VERSION.to_string());
    }

    if version
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("dev-"))
    {
        return Ok(format!("dev-{}", &version[4..]));
    }

    if let Some(stripped) = BUILD_METADATA.captures(version).and_then(|c| c.get(1)) {
        version = stripped.as_str();
    }

    let numeric = if let Some(caps) = CLASSIC.captures(version) {
        let mut normalized = caps[1].to_string();
        for i in 2..=4 {
            normalized.push_str(caps.get(i).map_or(".0", |m| m.as_str()));
        }
        Some((normalized, caps, 5))
    } else if let Some(caps) = DATE.captures(version) {
        let normalized: String = caps[1]
            .chars()
            .map(|c| if c.is_ascii_digit() { c } else { '.' })
            .collect();
        Some((normalized, caps, 2))
    } else {
        None
    };

    if let Some((mut normalized, caps, index)) = numeric {
        if let Some(stability) = caps.get(index) {
            if stability.as_str() == "stable" {
                return Ok(normalized);
            }
            normalized.push('-');
            normalized.push_str(&expand_stability(stability.as_str()));
            if let Some(suffix) = caps.get(index + 1) {
                let suffix = suffix.as_str();
                normalized.push_str(suffix.strip_prefix(['.', '-']).unwrap_or(suffix));
            }
        }

        if caps.get(index + 2).is_some() {
            normalized.push_str("-dev");
        }

        return Ok(normalized);
    }

    if let Some(name) = DEV_SUFFIX.captures(version).and_then(|c| c.get(1)) {
        return Ok(normalize_branch(name.as_str()));
    }

    Err(Error::InvalidVersion {
        version: version.to_string(),
        full_version,
    })
}

/// Normalize a branch name.
///
/// Numeric branches such as `2.x` or `v3` become `2.9999999.9999999.9999999-dev`
/// style versions; any other name is kept verbatim behind `dev-`.
#[must_use]
pub fn normalize_branch(name: &str) -> String {
    let name = name.trim();

    if matches!(name, "master" | "trunk" | "default") {
        return MASTER_VERSION.to_string();
    }

    if let Some(caps) = NUMERIC_BRANCH.captures(name) {
        let mut version = String::new();
        for i in 1..5 {
            match caps.get(i) {
                Some(part) => version.push_str(&part.as_str().replace(['X', '*'], "x")),
                None => version.push_str(".x"),
            }
        }
        return format!("{}-dev", version.replace('x', WILDCARD));
    }

    format!("dev-{name}")
}

/// Expand a shorthand stability code (`a`, `b`, `p`, `pl`, `rc`).
#[must_use]
pub fn expand_stability(stability: &str) -> String {
    let stability = stability.to_lowercase();
    match stability.as_str() {
        "a" => "alpha".to_string(),
        "b" => "beta".to_string(),
        "p" | "pl" => "patch".to_string(),
        "rc" => "RC".to_string(),
        _ => stability,
    }
}

/// Package stability, ordered from least to most stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Development branch.
    Dev,
    /// Alpha pre-release.
    Alpha,
    /// Beta pre-release.
    Beta,
    /// Release candidate.
    #[serde(rename = "RC")]
    RC,
    /// Stable release.
    Stable,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
            Self::RC => write!(f, "RC"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

/// Stability of a raw or normalized version string.
#[must_use]
pub fn parse_stability(version: &str) -> Stability {
    let version = version.split('#').next().unwrap_or(version);
    let lower = version.to_lowercase();

    if lower.starts_with("dev-") || lower.ends_with("-dev") {
        return Stability::Dev;
    }

    let Some(caps) = STABILITY.captures(&lower) else {
        return Stability::Stable;
    };

    if caps.get(3).is_some_and(|m| !m.as_str().is_empty()) {
        return Stability::Dev;
    }

    match caps.get(1).map(|m| m.as_str()) {
        Some("beta" | "b") => Stability::Beta,
        Some("alpha" | "a") => Stability::Alpha,
        Some("rc") => Stability::RC,
        _ => Stability::Stable,
    }
}
