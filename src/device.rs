// ============================================================================
// Device domain model
// ============================================================================
//
// A device is a MAC-identified network client. The MAC doubles as the RADIUS
// username of its identity, group-membership and credential records.
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a canonical MAC: twelve hex digits, no separators
pub const MAC_LEN: usize = 12;

/// Network segment a device is assigned to (the RADIUS group name)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vlan {
    Trusted,
    Iot,
    Guest,
}

impl Vlan {
    pub const ALL: [Vlan; 3] = [Vlan::Trusted, Vlan::Iot, Vlan::Guest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vlan::Trusted => "trusted",
            Vlan::Iot => "iot",
            Vlan::Guest => "guest",
        }
    }
}

impl fmt::Display for Vlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vlan {
    type Err = ValidationError;

    /// Exact, case-sensitive match against the three group names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vlan::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidVlan(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid MAC address: {0:?} (expected 12 lowercase hex characters)")]
    InvalidMac(String),

    #[error("Invalid VLAN: {0:?} (expected one of trusted, iot, guest)")]
    InvalidVlan(String),
}

/// Accepts exactly twelve characters from `[0-9a-f]`
pub fn validate_mac(mac: &str) -> Result<(), ValidationError> {
    let canonical = mac.len() == MAC_LEN
        && mac
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if canonical {
        Ok(())
    } else {
        Err(ValidationError::InvalidMac(mac.to_string()))
    }
}

/// Colon-separated rendering (`aa:bb:cc:dd:ee:ff`) of a canonical MAC.
/// Anything that is not canonical is returned unchanged.
pub fn display_mac(mac: &str) -> String {
    if validate_mac(mac).is_err() {
        return mac.to_string();
    }
    mac.as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(":")
}

/// A validated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub mac: String,
    pub description: String,
    pub vlan: Vlan,
}

impl Device {
    pub fn display_mac(&self) -> String {
        display_mac(&self.mac)
    }
}

/// Raw add-form input. Missing fields decode as empty strings and then fail
/// validation rather than the form extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDevice {
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vlan: String,
}

impl NewDevice {
    pub fn validate(&self) -> Result<Device, ValidationError> {
        validate_mac(&self.mac)?;
        let vlan = self.vlan.parse::<Vlan>()?;
        Ok(Device {
            mac: self.mac.clone(),
            description: self.description.clone(),
            vlan,
        })
    }
}

/// Raw edit-form input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceChanges {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vlan: String,
}
