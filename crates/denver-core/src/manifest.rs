use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::DenverError;

/// Descriptor of the latest orchestrator release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseManifest {
    pub date: String,
    pub release: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub file_size: String,
}

impl ReleaseManifest {
    pub fn from_json_slice(input: &[u8]) -> Result<Self> {
        serde_json::from_slice(input).map_err(|err| {
            DenverError::Malformed(format!("failed to parse release manifest: {err}")).into()
        })
    }

    /// Build version, as published in `Date`.
    pub fn build_version(&self) -> Result<u64> {
        parse_build_version("manifest Date", &self.date)
    }

    pub fn file_size_bytes(&self) -> Result<u64> {
        parse_build_version("manifest FileSize", &self.file_size)
    }
}

/// Descriptor of the latest base disk image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ImageManifest {
    pub version: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub image_size: u64,
    pub file_size: u64,
    pub compressed_size: u64,
}

impl ImageManifest {
    pub fn from_json_slice(input: &[u8]) -> Result<Self> {
        serde_json::from_slice(input).map_err(|err| {
            DenverError::Malformed(format!("failed to parse image manifest: {err}")).into()
        })
    }
}

/// Parses an integer carried as a string. Non-numeric input is `Malformed`.
pub fn parse_build_version(field: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        DenverError::Malformed(format!("{field} is not an integer: '{value}'")).into()
    })
}
