//! The XML schema for the persisted network cache (`ozwcache_0x<homeid>.xml`).
//!
//! The teacher carries no XML format of its own; this is enriched from
//! `fabiomolinar-powerlink-rs-xdc`'s `quick-xml` + `serde` based XDC parser,
//! adapted to the schema spec.md §6 "Persisted state" describes.

use serde::{Deserialize, Serialize};

pub const CACHE_XMLNS: &str = "https://github.com/OpenZWave/open-zwave";
pub const CACHE_VERSION: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueXml {
    #[serde(rename = "@type")]
    pub value_type: String,
    #[serde(rename = "@genre")]
    pub genre: String,
    #[serde(rename = "@instance")]
    pub instance: u8,
    #[serde(rename = "@index")]
    pub index: u8,
    #[serde(rename = "@label")]
    pub label: String,
    #[serde(rename = "@units", default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(rename = "@read_only")]
    pub read_only: bool,
    #[serde(rename = "@write_only")]
    pub write_only: bool,
    #[serde(rename = "$text", default)]
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommandClassXml {
    #[serde(rename = "@id")]
    pub id: u16,
    #[serde(rename = "@version")]
    pub version: u8,
    #[serde(rename = "@secured", default)]
    pub secured: bool,
    #[serde(rename = "Value", default)]
    pub values: Vec<ValueXml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AssociationsXml {
    #[serde(rename = "Group", default)]
    pub groups: Vec<AssociationGroupXml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AssociationGroupXml {
    #[serde(rename = "@index")]
    pub index: u8,
    #[serde(rename = "@max_associations")]
    pub max_associations: u8,
    #[serde(rename = "@num_reported")]
    pub num_reported: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NeighborsXml {
    /// Hex-encoded 29-byte neighbor bitmap.
    #[serde(rename = "$text", default)]
    pub bitmap: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeXml {
    #[serde(rename = "@id")]
    pub id: u8,
    #[serde(rename = "@basic")]
    pub basic: u8,
    #[serde(rename = "@generic")]
    pub generic: u8,
    #[serde(rename = "@specific")]
    pub specific: u8,
    #[serde(rename = "@listening")]
    pub listening: bool,
    #[serde(rename = "@frequent_listening")]
    pub frequent_listening: bool,
    #[serde(rename = "@routing")]
    pub routing: bool,
    #[serde(rename = "@max_baud_rate")]
    pub max_baud_rate: u32,
    #[serde(rename = "CommandClass", default)]
    pub command_classes: Vec<CommandClassXml>,
    #[serde(rename = "Associations", default)]
    pub associations: Option<AssociationsXml>,
    #[serde(rename = "Neighbors", default)]
    pub neighbors: Option<NeighborsXml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "Driver")]
pub struct DriverCacheXml {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    #[serde(rename = "@version")]
    pub version: u32,
    #[serde(rename = "@home_id")]
    pub home_id: String,
    #[serde(rename = "@node_id")]
    pub node_id: u8,
    #[serde(rename = "@api_capabilities", default)]
    pub api_capabilities: String,
    #[serde(rename = "@controller_capabilities", default)]
    pub controller_capabilities: u8,
    #[serde(rename = "@poll_interval", default)]
    pub poll_interval: u32,
    #[serde(rename = "@poll_interval_between", default)]
    pub poll_interval_between: bool,
    #[serde(rename = "@revision", default)]
    pub revision: u32,
    #[serde(rename = "Node", default)]
    pub nodes: Vec<NodeXml>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("xml deserialize error: {0}")]
    De(#[from] quick_xml::DeError),
    #[error("xml serialize error: {0}")]
    Se(#[from] quick_xml::SeError),
    #[error("xml namespace/version mismatch: expected xmlns={CACHE_XMLNS:?} version={CACHE_VERSION}")]
    SchemaMismatch,
    #[error("home id mismatch: cache is for a different network")]
    HomeIdMismatch,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverCacheXml {
    pub fn parse(xml: &str) -> Result<Self, CacheError> {
        let cache: DriverCacheXml = quick_xml::de::from_str(xml)?;
        if cache.xmlns != CACHE_XMLNS || cache.version != CACHE_VERSION {
            return Err(CacheError::SchemaMismatch);
        }
        Ok(cache)
    }

    pub fn to_xml(&self) -> Result<String, CacheError> {
        Ok(quick_xml::se::to_string(self)?)
    }
}
