//! Name table built from a directory snapshot.
//!
//! A [`Registry`] is built wholesale from one device list and never mutated
//! afterwards. The [`RegistryStore`] holds the active registry behind an
//! atomic pointer: refreshes swap in a new table, queries read whichever
//! table was active when they loaded it.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::directory::DeviceRecord;

/// A single name in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameEntry {
    /// Device name mapped directly to its addresses.
    Host {
        /// First IPv4 address reported for the device.
        ipv4: Option<Ipv4Addr>,
        /// First IPv6 address reported for the device.
        ipv6: Option<Ipv6Addr>,
    },
    /// Tag-derived name pointing at a device's short name.
    Alias {
        /// Short name of the device carrying the tag.
        target: String,
    },
}

/// Immutable short-name table.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: HashMap<String, NameEntry>,
    devices: usize,
    built_at: Instant,
    generation: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            devices: 0,
            built_at: Instant::now(),
            generation: 0,
        }
    }
}

impl Registry {
    /// Build a registry from a device list.
    ///
    /// Devices are processed in list order and the last insertion for a
    /// name wins, whether it is a host or an alias. Unparseable addresses
    /// are skipped rather than failing the build.
    pub fn build(devices: &[DeviceRecord], alias_tag_prefix: &str) -> Self {
        let tag_prefix = format!("tag:{}", alias_tag_prefix);
        let mut entries = HashMap::with_capacity(devices.len());

        for device in devices {
            let name = short_name(&device.name);
            if name.is_empty() {
                debug!(device = %device.name, "skipping device with empty name");
                continue;
            }

            let (ipv4, ipv6) = first_addresses(device);
            trace!(%name, ?ipv4, ?ipv6, "host entry");
            entries.insert(name.clone(), NameEntry::Host { ipv4, ipv6 });

            for tag in &device.tags {
                let Some(alias) = tag.strip_prefix(&tag_prefix) else {
                    continue;
                };
                let alias = alias.to_ascii_lowercase();
                if alias.is_empty() {
                    continue;
                }
                trace!(%alias, target = %name, "alias entry");
                entries.insert(
                    alias,
                    NameEntry::Alias {
                        target: name.clone(),
                    },
                );
            }
        }

        debug!(
            devices = devices.len(),
            names = entries.len(),
            "built registry"
        );

        Self {
            entries,
            devices: devices.len(),
            built_at: Instant::now(),
            generation: 0,
        }
    }

    /// Look up a short name.
    pub fn get(&self, name: &str) -> Option<&NameEntry> {
        self.entries.get(name)
    }

    /// Number of names (hosts and aliases).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry holds no names.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of devices in the snapshot this registry was built from.
    pub fn device_count(&self) -> usize {
        self.devices
    }

    /// Number of host entries.
    pub fn hosts_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, NameEntry::Host { .. }))
            .count()
    }

    /// Number of alias entries.
    pub fn aliases_count(&self) -> usize {
        self.len() - self.hosts_count()
    }

    /// When this registry was built.
    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    /// Install generation of this registry; 0 until it is installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Iterate over all names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NameEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// First label of a directory name, lower-cased.
fn short_name(name: &str) -> String {
    name.split('.').next().unwrap_or_default().to_ascii_lowercase()
}

fn first_addresses(device: &DeviceRecord) -> (Option<Ipv4Addr>, Option<Ipv6Addr>) {
    let mut ipv4 = None;
    let mut ipv6 = None;

    for addr in &device.addresses {
        match addr.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => {
                ipv4.get_or_insert(v4);
            }
            Ok(IpAddr::V6(v6)) => {
                ipv6.get_or_insert(v6);
            }
            Err(_) => {
                debug!(device = %device.name, address = %addr, "ignoring malformed address");
            }
        }
    }

    (ipv4, ipv6)
}

/// Holder of the active registry.
///
/// Cloning is cheap and every clone shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    active: ArcSwap<Registry>,
    // next generation to hand out; the live value is stamped on the registry
    installs: AtomicU64,
}

impl RegistryStore {
    /// Create a store holding an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active registry. Returns the new generation number.
    ///
    /// The generation is stamped on the registry before the swap, so a
    /// snapshot and its generation always change together.
    pub fn install(&self, mut registry: Registry) -> u64 {
        let generation = self.inner.installs.fetch_add(1, Ordering::AcqRel) + 1;
        registry.generation = generation;
        self.inner.active.store(Arc::new(registry));
        generation
    }

    /// Current registry snapshot. Hold on to it to resolve several names
    /// against the same table.
    pub fn snapshot(&self) -> Arc<Registry> {
        self.inner.active.load_full()
    }

    /// Look up a short name in the active registry.
    pub fn lookup(&self, name: &str) -> Option<NameEntry> {
        self.inner.active.load().get(name).cloned()
    }

    /// Generation of the active registry (number of installs so far).
    pub fn generation(&self) -> u64 {
        self.inner.active.load().generation
    }
}
