//! Package types and metadata.

use crate::version::{Stability, parse_stability};
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Package name (vendor/name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName {
    vendor: String,
    name: String,
}

impl PackageName {
    /// Create new package name.
    #[must_use]
    pub fn new(vendor: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into().to_lowercase(),
            name: name.into().to_lowercase(),
        }
    }

    /// Parse from "vendor/name" string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (vendor, name) = s.trim().split_once('/')?;
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(vendor) || !valid(name) {
            return None;
        }
        Some(Self::new(vendor, name))
    }

    /// Get vendor.
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Get name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.vendor, self.name)
    }
}

impl TryFrom<String> for PackageName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid package name \"{value}\""))
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.to_string()
    }
}

/// Where the sources of a version can be cloned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// VCS type (`git`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Clone URL.
    pub url: String,
    /// Commit, tag or branch.
    pub reference: String,
}

/// Where an archive of a version can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    /// Archive type (`zip`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Download URL.
    pub url: String,
    /// Commit, tag or branch.
    pub reference: String,
    /// Archive checksum, empty when unknown.
    #[serde(default)]
    pub shasum: String,
}

/// The `support` section of a composer manifest.
#[derive(Debug, Clone, Default)]
pub struct ComposerSupport {
    /// Browsable source URL.
    pub source: Option<String>,
    /// Issue tracker URL.
    pub issues: Option<String>,
    /// Other support channels.
    pub extra: BTreeMap<String, sonic_rs::Value>,
}

/// A composer.json as read from a repository reference.
///
/// Only the fields Tug rewrites are typed; everything else is kept verbatim
/// in `extra`. The serde impls are written by hand because `sonic_rs::Value`
/// cannot be read back from the buffer `#[serde(flatten)]` goes through.
#[derive(Debug, Clone, Default)]
pub struct ComposerManifest {
    /// Package name.
    pub name: Option<String>,
    /// Release date.
    pub time: Option<String>,
    /// Support channels.
    pub support: Option<ComposerSupport>,
    /// Remaining manifest fields.
    pub extra: BTreeMap<String, sonic_rs::Value>,
}

impl Serialize for ComposerSupport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(source) = &self.source {
            map.serialize_entry("source", source)?;
        }
        if let Some(issues) = &self.issues {
            map.serialize_entry("issues", issues)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ComposerSupport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SupportVisitor;

        impl<'de> Visitor<'de> for SupportVisitor {
            type Value = ComposerSupport;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a composer support object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut support = ComposerSupport::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "source" => support.source = map.next_value()?,
                        "issues" => support.issues = map.next_value()?,
                        _ => {
                            let value = map.next_value()?;
                            support.extra.insert(key, value);
                        }
                    }
                }
                Ok(support)
            }
        }

        deserializer.deserialize_map(SupportVisitor)
    }
}

impl Serialize for ComposerManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(time) = &self.time {
            map.serialize_entry("time", time)?;
        }
        if let Some(support) = &self.support {
            map.serialize_entry("support", support)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ComposerManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ManifestVisitor;

        impl<'de> Visitor<'de> for ManifestVisitor {
            type Value = ComposerManifest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a composer manifest object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut manifest = ComposerManifest::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "name" => manifest.name = map.next_value()?,
                        "time" => manifest.time = map.next_value()?,
                        "support" => manifest.support = map.next_value()?,
                        _ => {
                            let value = map.next_value()?;
                            manifest.extra.insert(key, value);
                        }
                    }
                }
                Ok(manifest)
            }
        }

        deserializer.deserialize_map(ManifestVisitor)
    }
}

impl ComposerManifest {
    /// Parsed package name, if the manifest declares a valid one.
    #[must_use]
    pub fn package_name(&self) -> Option<PackageName> {
        self.name.as_deref().and_then(PackageName::parse)
    }
}

/// Storage id of a package version.
#[must_use]
pub fn version_id(name: &PackageName, version: &str) -> String {
    format!("{name}@{version}")
}

/// A mirrored package version.
///
/// Identified by package name and normalized version; `pretty_version` keeps
/// the tag or `dev-` branch name it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    /// Package name.
    pub name: PackageName,
    /// Normalized version.
    pub version: String,
    /// Version as published.
    pub pretty_version: String,
    /// Commit the version points at.
    pub reference: String,
    /// Serialized composer manifest.
    pub composer: String,
    /// Clone location.
    pub source: Source,
    /// Archive location.
    pub dist: Dist,
    /// First time the version was stored.
    pub created_at: DateTime<Utc>,
    /// Last time the stored content changed.
    pub updated_at: DateTime<Utc>,
}

impl PackageVersion {
    /// Storage id.
    #[must_use]
    pub fn id(&self) -> String {
        version_id(&self.name, &self.version)
    }

    /// Stability of the version.
    #[must_use]
    pub fn stability(&self) -> Stability {
        parse_stability(&self.version)
    }

    /// Whether both records describe the same content, timestamps aside.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.pretty_version == other.pretty_version
            && self.reference == other.reference
            && self.composer == other.composer
            && self.source == other.source
            && self.dist == other.dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_parse() {
        let name = PackageName::parse("Acme/Foo-Bar").unwrap();
        assert_eq!(name.vendor(), "acme");
        assert_eq!(name.name(), "foo-bar");
        assert_eq!(name.to_string(), "acme/foo-bar");

        assert!(PackageName::parse("acme").is_none());
        assert!(PackageName::parse("/foo").is_none());
        assert!(PackageName::parse("https://github.com/acme/foo").is_none());
    }

    #[test]
    fn manifest_keeps_unknown_fields() {
        let manifest: ComposerManifest = sonic_rs::from_str(
            r#"{"name":"acme/foo","type":"library","require":{"php":">=8.1"}}"#,
        )
        .unwrap();
        assert_eq!(
            manifest.package_name(),
            Some(PackageName::new("acme", "foo"))
        );
        assert!(manifest.extra.contains_key("require"));
        assert!(manifest.time.is_none());

        let json = sonic_rs::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"library\""));
        assert!(json.contains("\"require\":{\"php\":\">=8.1\"}"));
    }

    #[test]
    fn manifest_support_keeps_other_channels() {
        let manifest: ComposerManifest = sonic_rs::from_str(
            r#"{"name":"acme/foo","time":null,"support":{"issues":"https://x/issues","chat":"irc://x"},"autoload":{"psr-4":{"Acme\\":"src/"}}}"#,
        )
        .unwrap();
        let support = manifest.support.as_ref().unwrap();
        assert_eq!(support.issues.as_deref(), Some("https://x/issues"));
        assert!(support.source.is_none());
        assert!(support.extra.contains_key("chat"));
        assert!(manifest.time.is_none());

        let json = sonic_rs::to_string(&manifest).unwrap();
        let again: ComposerManifest = sonic_rs::from_str(&json).unwrap();
        assert!(again.extra.contains_key("autoload"));
        assert_eq!(again.support.unwrap().extra.len(), 1);
    }

    #[test]
    fn version_identity() {
        let name = PackageName::new("acme", "foo");
        assert_eq!(version_id(&name, "1.0.0.0"), "acme/foo@1.0.0.0");
    }
}
