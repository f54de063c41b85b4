//! Codec configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Read/write defaults for properties without an explicit override.
///
/// `r` allows encoding, `w` allows decoding. Parsed from `"rw"`, `"r-"`,
/// `"-w"` or `"--"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
}

impl Permissions {
    pub const READ_WRITE: Permissions = Permissions {
        read: true,
        write: true,
    };
    pub const READ_ONLY: Permissions = Permissions {
        read: true,
        write: false,
    };
    pub const WRITE_ONLY: Permissions = Permissions {
        read: false,
        write: true,
    };
    pub const NONE: Permissions = Permissions {
        read: false,
        write: false,
    };
}

impl Default for Permissions {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let read = if self.read { 'r' } else { '-' };
        let write = if self.write { 'w' } else { '-' };
        write!(f, "{read}{write}")
    }
}

/// Error returned when a permissions string is not one of the four forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid permissions '{0}', expected one of rw, r-, -w, --")]
pub struct ParsePermissionsError(pub String);

impl FromStr for Permissions {
    type Err = ParsePermissionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rw" => Ok(Self::READ_WRITE),
            "r-" => Ok(Self::READ_ONLY),
            "-w" => Ok(Self::WRITE_ONLY),
            "--" => Ok(Self::NONE),
            other => Err(ParsePermissionsError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Permissions {
    type Error = ParsePermissionsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Permissions> for String {
    fn from(permissions: Permissions) -> Self {
        permissions.to_string()
    }
}

/// What to do with input keys that match no declared property on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    /// Ignore them (logged at debug level).
    #[default]
    Drop,
    /// Fail the decode with [`crate::CodecError::UnknownKey`].
    Reject,
}

/// Configuration of a schema level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Coerce decoded primitives to their declared kind.
    pub normalize: bool,
    /// Defaults for properties without an explicit override.
    pub permissions: Permissions,
    /// Unknown key policy on decode.
    pub unknown_keys: UnknownKeys,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            permissions: Permissions::default(),
            unknown_keys: UnknownKeys::default(),
        }
    }
}
