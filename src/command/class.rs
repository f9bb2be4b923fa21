//! Command class identifiers and security schemes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// 8-bit command class discriminator (byte 0 of every frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandClass(pub u8);

impl CommandClass {
    /// No Operation; its one-byte frame is used as a reachability probe
    pub const NO_OPERATION: Self = Self(0x00);

    /// Device Reset Locally
    pub const DEVICE_RESET_LOCALLY: Self = Self(0x5A);

    /// Version
    pub const VERSION: Self = Self(0x86);

    /// Raw discriminator byte
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Device Reset Locally: notification command
pub const DEVICE_RESET_LOCALLY_NOTIFICATION: u8 = 0x01;

/// Device Reset Locally: implemented version
pub const DEVICE_RESET_LOCALLY_VERSION: u8 = 1;

/// Version: command class get
pub const VERSION_COMMAND_CLASS_GET: u8 = 0x13;

/// Version: command class report
pub const VERSION_COMMAND_CLASS_REPORT: u8 = 0x14;

/// Version: implemented version
pub const VERSION_VERSION: u8 = 2;

/// Security scheme a frame arrived with, weakest first
///
/// A handler registered for a scheme accepts frames received with that
/// scheme or any stronger one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Unencrypted
    #[default]
    None,
    /// Security 0
    S0,
    /// Security 2, unauthenticated class
    S2Unauthenticated,
    /// Security 2, authenticated class
    S2Authenticated,
    /// Security 2, access control class
    S2Access,
}

impl Scheme {
    /// Whether a frame received with `self` satisfies `required`
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::S0 => write!(f, "s0"),
            Self::S2Unauthenticated => write!(f, "s2-unauthenticated"),
            Self::S2Authenticated => write!(f, "s2-authenticated"),
            Self::S2Access => write!(f, "s2-access"),
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "no" => Ok(Self::None),
            "s0" => Ok(Self::S0),
            "s2-unauthenticated" | "s2u" => Ok(Self::S2Unauthenticated),
            "s2-authenticated" | "s2a" => Ok(Self::S2Authenticated),
            "s2-access" | "s2ac" => Ok(Self::S2Access),
            other => Err(Error::Config(format!("unknown scheme '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stronger_scheme_satisfies_weaker() {
        assert!(Scheme::S2Access.satisfies(Scheme::None));
        assert!(Scheme::S0.satisfies(Scheme::S0));
        assert!(!Scheme::S0.satisfies(Scheme::S2Unauthenticated));
        assert!(!Scheme::None.satisfies(Scheme::S0));
    }

    #[test]
    fn scheme_text_round_trip() {
        for scheme in [
            Scheme::None,
            Scheme::S0,
            Scheme::S2Unauthenticated,
            Scheme::S2Authenticated,
            Scheme::S2Access,
        ] {
            assert_eq!(scheme.to_string().parse::<Scheme>().unwrap(), scheme);
        }
        assert!("s3".parse::<Scheme>().is_err());
    }

    #[test]
    fn class_display_is_hex() {
        assert_eq!(CommandClass::DEVICE_RESET_LOCALLY.to_string(), "0x5a");
    }
}
