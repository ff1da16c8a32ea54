//! The device/endpoint/cluster data model (`spec.md` §3).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShepherdError};

/// An 8-byte IEEE address, printed as `0x` + 16 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IeeeAddr(pub u64);

impl IeeeAddr {
    pub fn parse(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(hex, 16)
            .map(IeeeAddr)
            .map_err(|_| ShepherdError::InvalidArgument(format!("not an ieee address: {s}")))
    }
}

impl fmt::Display for IeeeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Serialize for IeeeAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IeeeAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IeeeAddr::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A query accepted by [`crate::registry::Registry::find`]: either form of
/// address named in `spec.md` §4.A.
#[derive(Debug, Clone, Copy)]
pub enum AddrQuery {
    Ieee(IeeeAddr),
    Nwk(u16),
}

impl From<IeeeAddr> for AddrQuery {
    fn from(v: IeeeAddr) -> Self {
        AddrQuery::Ieee(v)
    }
}

impl From<u16> for AddrQuery {
    fn from(v: u16) -> Self {
        AddrQuery::Nwk(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Coordinator,
    Router,
    EndDevice,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// What an [`Endpoint`] represents, used to enforce the delegator
/// reservation invariant in `spec.md` §3 ("endpoint ids 1-10 on the
/// coordinator are reserved for delegators").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    /// An endpoint hosted on a remote device.
    Remote,
    /// An endpoint hosted on the coordinator for a mounted application.
    Coordpoint,
    /// A coordinator endpoint used only as a binding target for reports.
    Delegator,
}

/// The last-known attribute values for one cluster on one endpoint
/// (`spec.md` §3, §4.D).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterTable {
    pub attrs: HashMap<String, Value>,
}

impl ClusterTable {
    /// Diff a freshly-read snapshot against the cached one. Returns only
    /// the entries whose value changed (present-and-different, or newly
    /// present). A `null` in `new` (a failed-read placeholder, `spec.md`
    /// §4.D) never counts as a change: it carries no information, so it
    /// can't be the non-empty diff a `devChange` requires. Does not
    /// mutate `self`; callers apply the new snapshot separately once
    /// they've captured the diff to emit.
    pub fn diff(&self, new: &HashMap<String, Value>) -> HashMap<String, Value> {
        new.iter()
            .filter(|(_, v)| !v.is_null())
            .filter(|(k, v)| self.attrs.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Overwrite the cache with a new snapshot.
    pub fn apply(&mut self, new: HashMap<String, Value>) {
        self.attrs.extend(new);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub ep_id: u8,
    pub prof_id: u16,
    pub dev_id: u16,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
    pub clusters: HashMap<u16, ClusterTable>,
    pub kind: EndpointKind,
}

impl Endpoint {
    pub fn new(ep_id: u8, prof_id: u16, dev_id: u16, in_clusters: Vec<u16>, out_clusters: Vec<u16>) -> Self {
        Endpoint {
            ep_id,
            prof_id,
            dev_id,
            in_clusters,
            out_clusters,
            clusters: HashMap::new(),
            kind: EndpointKind::Remote,
        }
    }

    pub fn cluster_mut(&mut self, cluster_id: u16) -> &mut ClusterTable {
        self.clusters.entry(cluster_id).or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub join_time: u64,
    pub incomplete: bool,
    pub manufacturer: Option<String>,
    pub firmware: Option<String>,
    pub ep_list: Vec<u8>,
    pub endpoints: HashMap<u8, Endpoint>,

    /// Internal registry id assigned by the `DevBox` on first persistence.
    /// `None` until the device has been through [`crate::registry::Registry::register`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reg_id: Option<u32>,

    /// Set on devices loaded from storage at startup, before they have
    /// passed back through `register`; cleared by `register`.
    #[serde(skip, default)]
    pub recovered: bool,
}

impl Device {
    pub fn new(ieee_addr: IeeeAddr, nwk_addr: u16, device_type: DeviceType) -> Self {
        Device {
            ieee_addr,
            nwk_addr,
            device_type,
            status: DeviceStatus::Online,
            join_time: 0,
            incomplete: true,
            manufacturer: None,
            firmware: None,
            ep_list: Vec::new(),
            endpoints: HashMap::new(),
            reg_id: None,
            recovered: false,
        }
    }

    /// `spec.md` §3 invariant: `epList` is exactly the key set of the
    /// endpoint map.
    pub fn invariant_ep_list_matches_endpoints(&self) -> bool {
        let mut from_list = self.ep_list.clone();
        from_list.sort_unstable();
        let mut from_map: Vec<u8> = self.endpoints.keys().copied().collect();
        from_map.sort_unstable();
        from_list == from_map
    }

    pub fn insert_endpoint(&mut self, ep: Endpoint) {
        if !self.ep_list.contains(&ep.ep_id) {
            self.ep_list.push(ep.ep_id);
        }
        self.endpoints.insert(ep.ep_id, ep);
    }

    pub fn max_ep_id(&self) -> Option<u8> {
        self.ep_list.iter().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ieee_addr_round_trips_through_display_and_parse() {
        let a = IeeeAddr::parse("0x00124b0001").unwrap();
        assert_eq!(a.to_string(), "0x0000000000124b0001");
        assert_eq!(IeeeAddr::parse(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn device_ep_list_invariant() {
        let mut d = Device::new(IeeeAddr::parse("0x00124b0001").unwrap(), 0x1234, DeviceType::Router);
        assert!(d.invariant_ep_list_matches_endpoints());
        d.insert_endpoint(Endpoint::new(1, 0x0104, 0x0000, vec![0x0000], vec![]));
        assert!(d.invariant_ep_list_matches_endpoints());
        assert_eq!(d.ep_list, vec![1]);
    }

    #[test]
    fn cluster_table_diff_reports_only_changes() {
        let mut table = ClusterTable::default();
        table.attrs.insert("onOff".to_string(), Value::Bool(false));

        let mut new = HashMap::new();
        new.insert("onOff".to_string(), Value::Bool(false));
        new.insert("currentLevel".to_string(), Value::from(10));

        let diff = table.diff(&new);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.get("currentLevel"), Some(&Value::from(10)));
    }
}
