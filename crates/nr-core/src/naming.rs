//! File naming schemes used to recover the target name from a saved image path.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target name used when the path does not match the configured scheme.
pub const UNKNOWN_TARGET: &str = "Unknown";

/// Index of the target token in an AMOS file name split on `_`.
const AMOS_TARGET_TOKEN: usize = 7;

/// Position of the target directory counted from the end of a skyimages path.
const SKYIMAGES_TARGET_FROM_END: usize = 4;

/// Error for an unrecognized naming scheme string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown naming scheme: {0} (expected AMOS or skyimages)")]
pub struct UnknownNamingScheme(String);

/// How image file paths encode the target name.
///
/// This enum encodes the valid schemes, preventing invalid string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NamingScheme {
    /// `..._<target>_...` as the eighth underscore-separated token of the file name.
    #[default]
    Amos,
    /// `<target>\<date>\<filter>\<file>`: the fourth segment from the end.
    SkyImages,
}

impl NamingScheme {
    /// String representation used on the command line and in config files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Amos => "AMOS",
            Self::SkyImages => "skyimages",
        }
    }

    /// Extracts the target name from already-split path segments.
    ///
    /// Returns `None` when the path is too short for this scheme.
    pub fn target_name(self, segments: &[&str]) -> Option<String> {
        match self {
            Self::Amos => {
                let file_name = segments.last()?;
                let token = file_name.split('_').nth(AMOS_TARGET_TOKEN)?;
                Some(token.replace(' ', ""))
            }
            Self::SkyImages => {
                let index = segments.len().checked_sub(SKYIMAGES_TARGET_FROM_END)?;
                Some(segments[index].to_string())
            }
        }
    }
}

impl fmt::Display for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NamingScheme {
    type Err = UnknownNamingScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AMOS" | "amos" => Ok(Self::Amos),
            "skyimages" | "SkyImages" => Ok(Self::SkyImages),
            _ => Err(UnknownNamingScheme(s.to_string())),
        }
    }
}

impl TryFrom<String> for NamingScheme {
    type Error = UnknownNamingScheme;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NamingScheme> for String {
    fn from(scheme: NamingScheme) -> Self {
        scheme.as_str().to_string()
    }
}
