//! Rewrite policies
//!
//! A policy turns a parsed requirement and the version actually installed
//! into new requirement text, or declines to touch the line.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::name::canonicalize_name;
use crate::parse::{Operator, Requirement, Specifier};
use crate::version::{InvalidVersion, Version};
use crate::{Error, Result};

/// How constraints are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Replace every floor with `>=installed`, keep other constraints
    #[default]
    LowerBound,
    /// Like lower-bound, but only where a floor already exists
    FloorOnly,
    /// `>=installed,<cap` with the cap taken from the cap strategy
    FloorAndCap,
    /// Retarget existing `>=`, `~=`, `==` at the installed version
    UpdateInPlace,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::LowerBound,
        Policy::FloorOnly,
        Policy::FloorAndCap,
        Policy::UpdateInPlace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowerBound => "lower-bound",
            Self::FloorOnly => "floor-only",
            Self::FloorAndCap => "floor-and-cap",
            Self::UpdateInPlace => "update-in-place",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| Error::config(format!("unknown policy {s:?}")))
    }
}

/// Upper-bound rule for `floor-and-cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapRule {
    /// `{major+1}.0.0`
    #[default]
    NextMajor,
    /// `{major}.{minor+1}.0`
    NextMinor,
}

impl CapRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextMajor => "next-major",
            Self::NextMinor => "next-minor",
        }
    }

    /// # Errors
    ///
    /// Returns [`InvalidVersion`] when the bumped segment would overflow.
    pub fn upper(&self, version: &Version) -> std::result::Result<String, InvalidVersion> {
        match self {
            Self::NextMajor => version.next_major(),
            Self::NextMinor => version.next_minor(),
        }
    }
}

impl fmt::Display for CapRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "next-major" => Ok(Self::NextMajor),
            "next-minor" => Ok(Self::NextMinor),
            other => Err(Error::config(format!("unknown cap rule {other:?}"))),
        }
    }
}

/// Default cap rule plus per-package overrides keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapStrategy {
    pub default: CapRule,
    pub per_package: HashMap<String, CapRule>,
}

impl CapStrategy {
    pub fn new(default: CapRule) -> Self {
        Self {
            default,
            per_package: HashMap::new(),
        }
    }

    /// Add an override; the name is canonicalized.
    pub fn with_override(mut self, name: &str, rule: CapRule) -> Self {
        self.per_package.insert(canonicalize_name(name), rule);
        self
    }

    pub fn for_package(&self, name: &str) -> CapRule {
        self.per_package
            .get(&canonicalize_name(name))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Compute the rewritten requirement text for one package line.
///
/// Returns `Ok(None)` when the policy leaves the line alone: unstable
/// installed versions without `allow_prerelease`, or `floor-only` on a
/// requirement with no floor.
///
/// # Errors
///
/// Returns [`InvalidVersion`] if `installed` is not a PEP 440 version, or if
/// the cap bump would overflow.
pub fn apply_policy(
    req: &Requirement,
    installed: &str,
    policy: Policy,
    allow_prerelease: bool,
    keep_local: bool,
    cap: &CapStrategy,
) -> std::result::Result<Option<String>, InvalidVersion> {
    let version: Version = installed.parse()?;

    if version.is_prerelease() && !allow_prerelease {
        return Ok(None);
    }

    let floor = if version.local.is_some() && keep_local {
        installed.trim().to_string()
    } else {
        version.public()
    };

    let spec = match policy {
        Policy::LowerBound => Some(replace_floor(&req.specifiers, &floor)),
        Policy::FloorOnly => {
            if req.specifiers.iter().any(|s| s.op.is_floor()) {
                Some(replace_floor(&req.specifiers, &floor))
            } else {
                None
            }
        }
        Policy::FloorAndCap => {
            let upper = cap.for_package(&req.name).upper(&version)?;
            Some(format!(">={floor},<{upper}"))
        }
        Policy::UpdateInPlace => Some(update_in_place(&req.specifiers, &floor)),
    };

    Ok(spec.map(|spec| req.render(&spec)))
}

/// `>=floor` followed by every non-floor constraint in source order.
fn replace_floor(specifiers: &[Specifier], floor: &str) -> String {
    let mut parts = vec![format!(">={floor}")];
    parts.extend(
        specifiers
            .iter()
            .filter(|s| !s.op.is_floor())
            .map(Specifier::to_string),
    );
    parts.join(",")
}

fn update_in_place(specifiers: &[Specifier], floor: &str) -> String {
    if specifiers.is_empty() {
        return format!(">={floor}");
    }

    let mut updated = false;
    let mut parts: Vec<String> = specifiers
        .iter()
        .map(|s| match s.op {
            Operator::GreaterEqual | Operator::Compatible | Operator::Equal => {
                updated = true;
                format!("{}{}", s.op.as_str(), floor)
            }
            _ => s.to_string(),
        })
        .collect();
    if !updated {
        parts.push(format!(">={floor}"));
    }
    parts.join(",")
}
