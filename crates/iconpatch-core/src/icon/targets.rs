//! The table of icon files a client version expects.
//!
//! Target paths change between client releases, so they live in data rather
//! than code. A default table ships embedded in the crate; callers can load
//! another one from JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::icon::IconError;

/// Default table, embedded at compile time.
const BUILTIN_TABLE: &str = include_str!("../../targets/default.json");

/// Largest edge an ICO directory entry can describe.
pub const MAX_ICO_SIZE: u32 = 256;

/// Sizes packed into a multi-resolution ICO, up to the requirement's size.
pub const ICO_SIZES: &[u32] = &[16, 24, 32, 48, 64, 128, 256];

/// What an icon is used for inside the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tray,
    Window,
    Notification,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Tray, Role::Window, Role::Notification];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tray => "tray",
            Role::Window => "window",
            Role::Notification => "notification",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tray" => Ok(Role::Tray),
            "window" | "app" => Ok(Role::Window),
            "notification" | "badge" => Ok(Role::Notification),
            other => Err(format!("unknown icon role '{}'", other)),
        }
    }
}

/// File encoding the client expects for an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Single-resolution PNG with alpha
    Png,
    /// Multi-resolution Windows icon
    Ico,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Png => f.write_str("png"),
            Encoding::Ico => f.write_str("ico"),
        }
    }
}

/// One icon file inside the archive that a role's artwork replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRequirement {
    pub role: Role,
    /// Archive path, or a glob pattern over archive paths.
    pub path: String,
    /// Edge length in pixels; icons are always square.
    pub resolution: u32,
    pub encoding: Encoding,
}

impl IconRequirement {
    /// Whether `path` selects entries by glob rather than literally.
    pub fn is_pattern(&self) -> bool {
        self.path.contains(['*', '?', '['])
    }

    /// Edge lengths rendered for this requirement.
    pub fn sizes(&self) -> Vec<u32> {
        match self.encoding {
            Encoding::Png => vec![self.resolution],
            Encoding::Ico => {
                let mut sizes: Vec<u32> = ICO_SIZES
                    .iter()
                    .copied()
                    .filter(|&s| s < self.resolution)
                    .collect();
                sizes.push(self.resolution);
                sizes
            }
        }
    }
}

/// A versioned set of icon requirements for one client layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTable {
    /// Client the table was written for
    pub client: String,
    /// Table revision; bump whenever the client renames assets
    pub version: u32,
    pub requirements: Vec<IconRequirement>,
}

impl TargetTable {
    /// The table embedded in the crate.
    pub fn builtin() -> Result<Self, IconError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self, IconError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, IconError> {
        let table: TargetTable = serde_json::from_str(content).map_err(|e| IconError::InvalidTargets {
            reason: e.to_string(),
        })?;
        table.validate()?;
        Ok(table)
    }

    /// Check the table for entries no client could satisfy.
    pub fn validate(&self) -> Result<(), IconError> {
        let invalid = |reason: String| Err(IconError::InvalidTargets { reason });

        if self.requirements.is_empty() {
            return invalid("table lists no requirements".to_string());
        }

        for (i, req) in self.requirements.iter().enumerate() {
            if req.path.is_empty() {
                return invalid(format!("requirement {} has an empty path", i));
            }
            if req.resolution == 0 || req.resolution % 2 != 0 {
                return invalid(format!(
                    "'{}': resolution must be a positive even number, got {}",
                    req.path, req.resolution
                ));
            }
            if req.encoding == Encoding::Ico && req.resolution > MAX_ICO_SIZE {
                return invalid(format!(
                    "'{}': ico resolution cannot exceed {}",
                    req.path, MAX_ICO_SIZE
                ));
            }
            if req.is_pattern() {
                if let Err(e) = glob::Pattern::new(&req.path) {
                    return invalid(format!("'{}': {}", req.path, e));
                }
            }
            if self.requirements[..i].iter().any(|other| other.path == req.path) {
                return invalid(format!("'{}' is listed twice", req.path));
            }
        }

        Ok(())
    }

    /// Requirements for `role`, in table order.
    pub fn for_role(&self, role: Role) -> impl Iterator<Item = &IconRequirement> {
        self.requirements.iter().filter(move |r| r.role == role)
    }

    /// Copy of the table restricted to `roles`.
    pub fn restricted_to(&self, roles: &[Role]) -> TargetTable {
        TargetTable {
            client: self.client.clone(),
            version: self.version,
            requirements: self
                .requirements
                .iter()
                .filter(|r| roles.contains(&r.role))
                .cloned()
                .collect(),
        }
    }
}
