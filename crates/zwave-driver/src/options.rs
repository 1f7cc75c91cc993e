//! Driver configuration options (spec.md §6 "Configuration options").
//!
//! No teacher or pack example carries a config-options layer to ground this
//! on; built directly from spec.md §6's table as an `Options`/`OptionValue`
//! map keyed by string, parsed with ad hoc `FromStr`/matching per
//! SPEC_FULL.md §3 (no external config crate in the teacher's stack).

use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// How the device DB should reload a node's interview after a config-file
/// update (the `ReloadAfterUpdate` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadAfterUpdate {
    #[default]
    Never,
    Immediate,
    Awake,
}

impl FromStr for ReloadAfterUpdate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEVER" => Ok(ReloadAfterUpdate::Never),
            "IMMEDIATE" => Ok(ReloadAfterUpdate::Immediate),
            "AWAKE" => Ok(ReloadAfterUpdate::Awake),
            other => Err(format!("not a ReloadAfterUpdate value: {other}")),
        }
    }
}

/// Parses the `NetworkKey` option's "16 comma-separated hex bytes" format.
pub fn parse_network_key(s: &str) -> Result<[u8; 16], String> {
    let mut key = [0u8; 16];
    let mut count = 0;
    for (i, part) in s.split(',').enumerate() {
        if i >= 16 {
            return Err("too many bytes in NetworkKey".to_string());
        }
        let part = part.trim().trim_start_matches("0x");
        key[i] = u8::from_str_radix(part, 16).map_err(|_| format!("not a hex byte: {part}"))?;
        count += 1;
    }
    if count != 16 {
        return Err(format!("NetworkKey needs exactly 16 bytes, got {count}"));
    }
    Ok(key)
}

/// The recognized keys from spec.md §6, with their defaults where the spec
/// gives one. Unrecognized keys are still stored (for forward-compatible
/// pass-through) but have no typed accessor.
pub struct Options {
    values: HashMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert("Logging".to_string(), OptionValue::Bool(false));
        values.insert("NotifyTransactions".to_string(), OptionValue::Bool(false));
        values.insert("PollInterval".to_string(), OptionValue::Int(30_000));
        values.insert("IntervalBetweenPolls".to_string(), OptionValue::Bool(true));
        values.insert("DriverMaxAttempts".to_string(), OptionValue::Int(3));
        values.insert("RetryTimeout".to_string(), OptionValue::Int(40_000));
        values.insert("SaveConfiguration".to_string(), OptionValue::Bool(true));
        values.insert("NotifyOnDriverUnload".to_string(), OptionValue::Bool(false));
        values.insert("EnableSIS".to_string(), OptionValue::Bool(true));
        values.insert("AutoUpdateConfigFile".to_string(), OptionValue::Bool(true));
        values.insert(
            "ReloadAfterUpdate".to_string(),
            OptionValue::String("AWAKE".to_string()),
        );
        Self { values }
    }

    /// Sets `key` from a raw string, parsing it according to the option's
    /// known type; unrecognized keys are stored verbatim as strings.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), String> {
        let value = match key {
            "Logging" | "NotifyTransactions" | "IntervalBetweenPolls" | "SaveConfiguration"
            | "NotifyOnDriverUnload" | "EnableSIS" | "AutoUpdateConfigFile" => {
                OptionValue::Bool(raw.parse().map_err(|_| format!("not a bool: {raw}"))?)
            }
            "PollInterval" | "DriverMaxAttempts" | "RetryTimeout" => {
                OptionValue::Int(raw.parse().map_err(|_| format!("not an int: {raw}"))?)
            }
            "NetworkKey" => {
                parse_network_key(raw)?;
                OptionValue::String(raw.to_string())
            }
            "ReloadAfterUpdate" => {
                ReloadAfterUpdate::from_str(raw)?;
                OptionValue::String(raw.to_ascii_uppercase())
            }
            _ => OptionValue::String(raw.to_string()),
        };
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn network_key(&self) -> Option<[u8; 16]> {
        self.get("NetworkKey")?.as_str().and_then(|s| parse_network_key(s).ok())
    }

    pub fn reload_after_update(&self) -> ReloadAfterUpdate {
        self.get("ReloadAfterUpdate")
            .and_then(|v| v.as_str())
            .and_then(|s| ReloadAfterUpdate::from_str(s).ok())
            .unwrap_or_default()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_spec_defaults() {
        let opts = Options::new();
        assert_eq!(opts.get("RetryTimeout").unwrap().as_int(), Some(40_000));
        assert_eq!(opts.get("DriverMaxAttempts").unwrap().as_int(), Some(3));
        assert_eq!(opts.reload_after_update(), ReloadAfterUpdate::Awake);
    }

    #[test]
    fn setting_a_known_bool_key_parses_it() {
        let mut opts = Options::new();
        opts.set("SaveConfiguration", "false").unwrap();
        assert_eq!(opts.get("SaveConfiguration").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn setting_an_int_key_with_garbage_fails() {
        let mut opts = Options::new();
        assert!(opts.set("PollInterval", "not a number").is_err());
    }

    #[test]
    fn network_key_parses_sixteen_hex_bytes() {
        let raw = (0..16).map(|i| format!("{i:02x}")).collect::<Vec<_>>().join(",");
        let mut opts = Options::new();
        opts.set("NetworkKey", &raw).unwrap();
        let key = opts.network_key().unwrap();
        assert_eq!(key[0], 0x00);
        assert_eq!(key[15], 0x0f);
    }

    #[test]
    fn network_key_rejects_wrong_length() {
        assert!(parse_network_key("01,02,03").is_err());
    }

    #[test]
    fn unrecognized_key_is_stored_as_a_string() {
        let mut opts = Options::new();
        opts.set("SomeFutureOption", "hello").unwrap();
        assert_eq!(opts.get("SomeFutureOption").unwrap().as_str(), Some("hello"));
    }
}
