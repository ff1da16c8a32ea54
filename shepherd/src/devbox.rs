//! `DevBox`: the persistent object store external collaborator
//! (`spec.md` §6). The Shepherd depends only on this trait; this module
//! also ships [`JsonDevBox`], a single-file JSON-backed reference
//! implementation, because an unimplementable external collaborator would
//! leave the crate impossible to run or test.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ShepherdError};
use crate::model::Device;

pub trait DevBox: std::fmt::Debug {
    fn add(&mut self, dev: Device) -> Result<u32>;
    fn set(&mut self, id: u32, dev: Device) -> Result<u32>;
    fn get(&self, id: u32) -> Option<Device>;
    fn find(&self, pred: &dyn Fn(&Device) -> bool) -> Option<Device>;
    fn remove(&mut self, id: u32) -> Result<()>;
    fn sync(&mut self, id: u32, dev: &Device) -> Result<()>;
    fn export_all_ids(&self) -> Vec<u32>;
    fn export_all_objs(&self) -> Vec<Device>;
    fn is_empty(&self) -> bool;
}

/// A `DevBox` backed by a single JSON file, re-written in full on every
/// mutation. The PAN mirror is small (tens to low hundreds of devices),
/// so whole-file rewrites are the simplest correct strategy -- the same
/// tradeoff the teacher crate makes by keeping its error queue as a
/// small fixed-capacity ring rather than reaching for a database crate.
#[derive(Debug)]
pub struct JsonDevBox {
    path: PathBuf,
    next_id: u32,
    devices: BTreeMap<u32, Device>,
}

impl JsonDevBox {
    /// Open (creating if absent) a JSON-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let devices: BTreeMap<u32, Device> = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| ShepherdError::PersistenceError(e.to_string()))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| ShepherdError::PersistenceError(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };
        let next_id = devices.keys().next_back().map(|id| id + 1).unwrap_or(0);
        Ok(JsonDevBox {
            path,
            next_id,
            devices,
        })
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.devices)
            .map_err(|e| ShepherdError::PersistenceError(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| ShepherdError::PersistenceError(e.to_string()))
    }
}

impl DevBox for JsonDevBox {
    fn add(&mut self, dev: Device) -> Result<u32> {
        let id = self.next_id;
        self.next_id += 1;
        self.devices.insert(id, dev);
        self.persist()?;
        Ok(id)
    }

    fn set(&mut self, id: u32, dev: Device) -> Result<u32> {
        self.devices.insert(id, dev);
        self.persist()?;
        Ok(id)
    }

    fn get(&self, id: u32) -> Option<Device> {
        self.devices.get(&id).cloned()
    }

    fn find(&self, pred: &dyn Fn(&Device) -> bool) -> Option<Device> {
        self.devices.values().find(|d| pred(d)).cloned()
    }

    fn remove(&mut self, id: u32) -> Result<()> {
        self.devices.remove(&id);
        self.persist()
    }

    fn sync(&mut self, id: u32, dev: &Device) -> Result<()> {
        self.devices.insert(id, dev.clone());
        self.persist()
    }

    fn export_all_ids(&self) -> Vec<u32> {
        self.devices.keys().copied().collect()
    }

    fn export_all_objs(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceType, IeeeAddr};

    #[test]
    fn add_assigns_increasing_ids_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let mut box1 = JsonDevBox::open(&path).unwrap();
        let id0 = box1
            .add(Device::new(IeeeAddr::parse("0x1").unwrap(), 1, DeviceType::Router))
            .unwrap();
        let id1 = box1
            .add(Device::new(IeeeAddr::parse("0x2").unwrap(), 2, DeviceType::Router))
            .unwrap();
        assert_eq!((id0, id1), (0, 1));

        // Re-open: state survives.
        let box2 = JsonDevBox::open(&path).unwrap();
        assert_eq!(box2.export_all_ids().len(), 2);
    }

    #[test]
    fn remove_then_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDevBox::open(dir.path().join("devices.json")).unwrap();
        let id = store
            .add(Device::new(IeeeAddr::parse("0x1").unwrap(), 1, DeviceType::Router))
            .unwrap();
        assert!(!store.is_empty());
        store.remove(id).unwrap();
        assert!(store.is_empty());
    }
}
