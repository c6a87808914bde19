use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::open_hours::OpenHours;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Permit status. Stored and serialized in the upper-case form the permit
/// feed uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorStatus {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "SUSPENDED", alias = "SUSPEND")]
    Suspended,
    #[serde(rename = "REQUESTED")]
    Requested,
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl VendorStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Suspended => "SUSPENDED",
            Self::Requested => "REQUESTED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for VendorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Self::Approved),
            "SUSPENDED" | "SUSPEND" => Ok(Self::Suspended),
            "REQUESTED" => Ok(Self::Requested),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityType {
    Truck,
    #[serde(rename = "Push Cart", alias = "PushCart")]
    PushCart,
    Unknown,
}

impl FacilityType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Truck => "Truck",
            Self::PushCart => "Push Cart",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "truck" => Ok(Self::Truck),
            "pushcart" => Ok(Self::PushCart),
            "unknown" => Ok(Self::Unknown),
            _ => Err(UnknownVariant {
                kind: "facility_type",
                value: s.to_string(),
            }),
        }
    }
}

/// One registered food vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRecord {
    pub applicant: String,
    pub facility_type: FacilityType,
    pub location_description: String,
    pub address: String,
    pub status: VendorStatus,
    #[serde(default)]
    pub food_items: Vec<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub location: GeoPoint,
    #[serde(default)]
    pub open_hours: OpenHours,
}

/// A vendor as returned by an aggregation plan. `distance` (meters) is only
/// present when a geo stage annotated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorMatch {
    #[serde(flatten)]
    pub record: VendorRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<VendorRecord> for VendorMatch {
    fn from(record: VendorRecord) -> Self {
        Self {
            record,
            distance: None,
        }
    }
}

/// An entry in the food catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub name: String,
}
