//! Access policy and locator wire types.

use serde::{Deserialize, Serialize};

/// Permission grant carried by an access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicyPermissions {
    None,
    Read,
    Write,
    Delete,
}

impl AccessPolicyPermissions {
    pub fn code(&self) -> i32 {
        match self {
            AccessPolicyPermissions::None => 0,
            AccessPolicyPermissions::Read => 1,
            AccessPolicyPermissions::Write => 2,
            AccessPolicyPermissions::Delete => 3,
        }
    }
}

/// Time-boxed permission grant referenced by locators.
///
/// Write policies for uploads are short-lived; read policies for playback
/// use a 10-year duration as a practical permanent grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DurationInMinutes")]
    pub duration_in_minutes: f64,
    #[serde(rename = "Permissions")]
    pub permissions: i32,
}

/// Addressable path kind a locator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorType {
    /// Shared-access-signature path for direct/progressive access
    Sas,
    /// Streaming origin path
    OnDemandOrigin,
}

impl LocatorType {
    pub fn code(&self) -> i32 {
        match self {
            LocatorType::Sas => 1,
            LocatorType::OnDemandOrigin => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorType::Sas => "sas",
            LocatorType::OnDemandOrigin => "on_demand_origin",
        }
    }
}

/// Binds an access policy to an asset for a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "AccessPolicyId")]
    pub access_policy_id: String,
    #[serde(rename = "AssetId")]
    pub asset_id: String,
    #[serde(rename = "StartTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "Type")]
    pub locator_type: i32,
    #[serde(rename = "Path", default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
