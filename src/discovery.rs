//! Device discovery for the port selector.
//!
//! Candidates come from two places: the entries in `/dev` (or wherever a
//! prefix points) whose names start with a configured prefix, and whatever
//! `serialport::available_ports()` reports. The merged list is grouped by
//! prefix in configuration order and sorted within each group, so with the
//! default prefixes every `/dev/ttyUSB*` comes before every `/dev/ttyS*`.

use crate::port::PortError;
use serde::Serialize;
use serialport::SerialPortType;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A selectable device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub name: String,
    /// "usb", "pci", "bluetooth" or "unknown"
    pub transport: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl PortEntry {
    fn plain(name: String) -> Self {
        Self {
            name,
            transport: "unknown",
            product: None,
        }
    }
}

/// Order `names` for display: grouped by the first matching prefix (in
/// `prefixes` order), sorted within each group, duplicates removed.
/// Names matching no prefix are dropped unless `prefixes` is empty.
pub fn order_candidates<I>(names: I, prefixes: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for name in names {
        let group = if prefixes.is_empty() {
            Some(0)
        } else {
            prefixes.iter().position(|p| name.starts_with(p.as_str()))
        };
        if let Some(group) = group {
            groups.entry(group).or_default().push(name);
        }
    }

    groups
        .into_values()
        .flat_map(|mut group| {
            group.sort();
            group.dedup();
            group
        })
        .collect()
}

/// Device nodes next to each prefix whose path starts with it.
fn scan_prefixes(prefixes: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    for prefix in prefixes {
        let Some(dir) = Path::new(prefix).parent() else {
            continue;
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        found.extend(
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path().to_string_lossy().into_owned())
                .filter(|path| path.starts_with(prefix.as_str())),
        );
    }
    found
}

/// List candidate ports, ordered for display.
pub fn available_ports(prefixes: &[String]) -> Result<Vec<PortEntry>, PortError> {
    let mut details: BTreeMap<String, PortEntry> = BTreeMap::new();
    match serialport::available_ports() {
        Ok(ports) => {
            for port in ports {
                let entry = match port.port_type {
                    SerialPortType::UsbPort(info) => PortEntry {
                        name: port.port_name.clone(),
                        transport: "usb",
                        product: info.product,
                    },
                    SerialPortType::PciPort => PortEntry {
                        transport: "pci",
                        ..PortEntry::plain(port.port_name.clone())
                    },
                    SerialPortType::BluetoothPort => PortEntry {
                        transport: "bluetooth",
                        ..PortEntry::plain(port.port_name.clone())
                    },
                    SerialPortType::Unknown => PortEntry::plain(port.port_name.clone()),
                };
                details.insert(port.port_name, entry);
            }
        }
        // Enumeration is best effort; the directory scan still applies.
        Err(e) => debug!("serialport enumeration failed: {}", e),
    }

    let names = scan_prefixes(prefixes)
        .into_iter()
        .chain(details.keys().cloned())
        .collect::<Vec<_>>();

    let ordered = order_candidates(names, prefixes)
        .into_iter()
        .map(|name| {
            details
                .remove(&name)
                .unwrap_or_else(|| PortEntry::plain(name))
        })
        .collect();
    Ok(ordered)
}

/// Names only, as the port selectors need them.
pub fn available_port_names(prefixes: &[String]) -> Result<Vec<String>, PortError> {
    Ok(available_ports(prefixes)?
        .into_iter()
        .map(|entry| entry.name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prefixes() -> Vec<String> {
        vec!["/dev/ttyUSB".to_string(), "/dev/ttyS".to_string()]
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_usb_ports_come_first() {
        let ordered = order_candidates(
            names(&["/dev/ttyS1", "/dev/ttyUSB1", "/dev/ttyS0", "/dev/ttyUSB0"]),
            &prefixes(),
        );
        assert_eq!(
            ordered,
            names(&["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyS0", "/dev/ttyS1"])
        );
    }

    #[test]
    fn test_unmatched_and_duplicate_names_dropped() {
        let ordered = order_candidates(
            names(&["/dev/ttyACM0", "/dev/ttyS0", "/dev/ttyS0", "/dev/null"]),
            &prefixes(),
        );
        assert_eq!(ordered, names(&["/dev/ttyS0"]));
    }

    #[test]
    fn test_empty_prefixes_keep_everything() {
        let ordered = order_candidates(names(&["COM3", "COM1"]), &[]);
        assert_eq!(ordered, names(&["COM1", "COM3"]));
    }

    #[test]
    fn test_scan_prefixes_in_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["ttyUSB0", "ttyS3", "other"] {
            std::fs::write(dir.path().join(file), b"").unwrap();
        }
        let prefix = dir.path().join("ttyUSB").to_string_lossy().into_owned();
        let found = scan_prefixes(&[prefix.clone()]);
        assert_eq!(found, vec![format!("{prefix}0")]);
    }

    #[test]
    fn test_prefix_without_directory_is_skipped() {
        assert!(scan_prefixes(&["/nonexistent-dir/ttyUSB".to_string()]).is_empty());
    }
}
