//! Cache I/O (spec.md §4.8): loads and persists `ozwcache_0x<homeid>.xml`,
//! gated to nodes that have reached at least the `CacheLoad` interview
//! stage — a node interrupted mid-interview before that point has nothing
//! worth remembering.
//!
//! Grounded on `zwave_core::cache::DriverCacheXml` (the schema itself,
//! borrowed from `fabiomolinar-powerlink-rs-xdc`'s `quick-xml` usage) for
//! the wire format; this module supplies the driver-side read/write glue
//! the teacher has no equivalent of (its own cache is a sled database, not
//! an XML file, so the glue below is original to this crate).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use zwave_core::cache::{CacheError, DriverCacheXml, NeighborsXml, NodeXml, CACHE_VERSION, CACHE_XMLNS};
use zwave_core::ids::{HomeId, NodeId};
use zwave_core::protocol_info::{DataRate, DeviceClass, NodeProtocolInfo};

use crate::interview::QueryStage;
use crate::node::Node;

pub fn cache_file_name(home_id: HomeId) -> String {
    format!("ozwcache_0x{:08x}.xml", home_id.as_u32())
}

pub fn cache_path(dir: &Path, home_id: HomeId) -> PathBuf {
    dir.join(cache_file_name(home_id))
}

fn baud_rate_to_u32(rate: DataRate) -> u32 {
    match rate {
        DataRate::ZWave9k6 => 9600,
        DataRate::ZWave40k => 40000,
        DataRate::ZWave100k => 100000,
    }
}

fn baud_rate_from_u32(rate: u32) -> DataRate {
    match rate {
        n if n >= 100000 => DataRate::ZWave100k,
        n if n >= 40000 => DataRate::ZWave40k,
        _ => DataRate::ZWave9k6,
    }
}

fn node_to_xml(node: &Node) -> NodeXml {
    let mut neighbors_hex = String::with_capacity(58);
    for byte in node.neighbors.as_raw_slice() {
        neighbors_hex.push_str(&format!("{byte:02x}"));
    }
    NodeXml {
        id: node.id.as_u8(),
        basic: node.protocol_info.device_class.basic,
        generic: node.protocol_info.device_class.generic,
        specific: node.protocol_info.device_class.specific,
        listening: node.protocol_info.listening,
        frequent_listening: node.protocol_info.frequent_listening,
        routing: node.protocol_info.routing,
        max_baud_rate: baud_rate_to_u32(node.protocol_info.max_baud_rate),
        command_classes: node
            .command_classes
            .values()
            .map(|handler| zwave_core::cache::CommandClassXml {
                id: handler.cc_id() as u16,
                version: handler.version(),
                secured: false,
                values: Vec::new(),
            })
            .collect(),
        associations: None,
        neighbors: Some(NeighborsXml { bitmap: neighbors_hex }),
    }
}

fn node_from_xml(xml: &NodeXml) -> Node {
    let protocol_info = NodeProtocolInfo {
        listening: xml.listening,
        frequent_listening: xml.frequent_listening,
        routing: xml.routing,
        supports_beaming: false,
        supports_security: false,
        max_baud_rate: baud_rate_from_u32(xml.max_baud_rate),
        device_class: DeviceClass { basic: xml.basic, generic: xml.generic, specific: xml.specific },
    };
    Node::from_cache(NodeId::from(xml.id), protocol_info)
}

/// Serializes every node that has reached `CacheLoad` or beyond; nodes
/// still mid-interview are dropped rather than persisted half-formed.
pub fn build_cache_xml(home_id: HomeId, controller_node_id: NodeId, nodes: &HashMap<NodeId, Node>) -> DriverCacheXml {
    let mut persisted: Vec<_> = nodes
        .values()
        .filter(|n| n.interview.stage >= QueryStage::CacheLoad)
        .map(node_to_xml)
        .collect();
    persisted.sort_by_key(|n| n.id);

    DriverCacheXml {
        xmlns: CACHE_XMLNS.to_string(),
        version: CACHE_VERSION,
        home_id: format!("0x{:08x}", home_id.as_u32()),
        node_id: controller_node_id.as_u8(),
        api_capabilities: String::new(),
        controller_capabilities: 0,
        poll_interval: 0,
        poll_interval_between: false,
        revision: 0,
        nodes: persisted,
    }
}

pub fn load_nodes(cache: &DriverCacheXml) -> HashMap<NodeId, Node> {
    cache.nodes.iter().map(|xml| (NodeId::from(xml.id), node_from_xml(xml))).collect()
}

pub fn write_to_dir(dir: &Path, home_id: HomeId, cache: &DriverCacheXml) -> Result<(), CacheError> {
    let xml = cache.to_xml()?;
    fs::write(cache_path(dir, home_id), xml)?;
    Ok(())
}

/// Reads and parses the cache file for `home_id` from `dir`, if present.
/// Returns `Ok(None)` rather than an error when the file doesn't exist yet
/// (first run against this controller).
pub fn read_from_dir(dir: &Path, home_id: HomeId) -> Result<Option<DriverCacheXml>, CacheError> {
    let path = cache_path(dir, home_id);
    match fs::read_to_string(&path) {
        Ok(xml) => Ok(Some(DriverCacheXml::parse(&xml)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interview::QueryStage;

    #[test]
    fn nodes_below_cache_load_are_not_persisted() {
        let mut nodes = HashMap::new();
        let mut unfinished = Node::new(NodeId::from(4u8), NodeProtocolInfo::default());
        unfinished.interview.stage = QueryStage::Probe;
        nodes.insert(unfinished.id, unfinished);

        let mut finished = Node::from_cache(NodeId::from(5u8), NodeProtocolInfo::default());
        finished.interview.stage = QueryStage::Dynamic;
        nodes.insert(finished.id, finished);

        let cache = build_cache_xml(HomeId::new(0x1234_5678), NodeId::from(1u8), &nodes);
        assert_eq!(cache.nodes.len(), 1);
        assert_eq!(cache.nodes[0].id, 5);
    }

    #[test]
    fn write_then_read_round_trips_through_a_temp_dir() {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("zwave-cache-test-{unique}"));
        fs::create_dir_all(&dir).unwrap();
        let home_id = HomeId::new(0xdead_beef);

        let mut nodes = HashMap::new();
        let mut n = Node::from_cache(NodeId::from(9u8), NodeProtocolInfo { listening: true, ..Default::default() });
        n.interview.stage = QueryStage::Complete;
        nodes.insert(n.id, n);

        let cache = build_cache_xml(home_id, NodeId::from(1u8), &nodes);
        write_to_dir(&dir, home_id, &cache).unwrap();

        let read_back = read_from_dir(&dir, home_id).unwrap().unwrap();
        assert_eq!(read_back.nodes.len(), 1);
        assert_eq!(read_back.nodes[0].id, 9);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_cache_file_is_not_an_error() {
        let dir = std::env::temp_dir();
        let home_id = HomeId::new(0x0000_0001);
        let result = read_from_dir(&dir, home_id).unwrap();
        assert!(result.is_none());
    }
}
