//! The Device Registry (`spec.md` §4.A): the in-memory + persisted map of
//! devices, endpoints, clusters, attributes.

use crate::devbox::DevBox;
use crate::error::{Result, ShepherdError};
use crate::model::{AddrQuery, Device, IeeeAddr};

pub struct Registry {
    store: Box<dyn DevBox>,
    devices: Vec<Device>,
}

impl Registry {
    pub fn new(store: Box<dyn DevBox>) -> Self {
        Registry {
            store,
            devices: Vec::new(),
        }
    }

    fn matches(dev: &Device, addr: AddrQuery) -> bool {
        match addr {
            AddrQuery::Ieee(ieee) => dev.ieee_addr == ieee,
            AddrQuery::Nwk(nwk) => dev.nwk_addr == nwk,
        }
    }

    /// Linear scan by IEEE or nwk address (`spec.md` §4.A).
    pub fn find(&self, addr: impl Into<AddrQuery>) -> Option<&Device> {
        let addr = addr.into();
        self.devices.iter().find(|d| Self::matches(d, addr))
    }

    pub fn find_mut(&mut self, addr: impl Into<AddrQuery>) -> Option<&mut Device> {
        let addr = addr.into();
        self.devices.iter_mut().find(|d| Self::matches(d, addr))
    }

    /// Register a device created by join admission or loaded during
    /// recovery (`spec.md` §3 "Lifecycles"). Never silently overwrites:
    /// duplicate registry ids or duplicate IEEE addresses are caller
    /// errors.
    pub fn register(&mut self, mut dev: Device, now: u64) -> Result<&Device> {
        if self.find(dev.ieee_addr).is_some() {
            return Err(ShepherdError::DuplicateRegistration(format!(
                "device {} is already registered",
                dev.ieee_addr
            )));
        }

        if let Some(id) = dev.reg_id {
            if self.devices.iter().any(|d| d.reg_id == Some(id)) {
                return Err(ShepherdError::DuplicateRegistration(format!(
                    "registry id {id} is already in use"
                )));
            }
        }

        if dev.recovered {
            let id = dev.reg_id.ok_or_else(|| {
                ShepherdError::InvalidArgument("recovered device missing reg_id".to_string())
            })?;
            self.store.set(id, dev.clone())?;
            dev.recovered = false;
        } else {
            dev.join_time = now;
            let id = self.store.add(dev.clone())?;
            dev.reg_id = Some(id);
        }

        self.devices.push(dev);
        Ok(self.devices.last().unwrap())
    }

    pub fn unregister(&mut self, addr: impl Into<AddrQuery>) -> Result<Device> {
        let addr = addr.into();
        let idx = self
            .devices
            .iter()
            .position(|d| Self::matches(d, addr))
            .ok_or_else(|| ShepherdError::DeviceNotFound(Self::addr_for_error(addr)))?;
        let dev = self.devices.remove(idx);
        if let Some(id) = dev.reg_id {
            self.store.remove(id)?;
        }
        Ok(dev)
    }

    fn addr_for_error(addr: AddrQuery) -> IeeeAddr {
        match addr {
            AddrQuery::Ieee(ieee) => ieee,
            AddrQuery::Nwk(nwk) => IeeeAddr(nwk as u64),
        }
    }

    pub fn sync_one(&mut self, addr: impl Into<AddrQuery>) -> Result<()> {
        let addr = addr.into();
        let dev = self
            .devices
            .iter()
            .find(|d| Self::matches(d, addr))
            .ok_or_else(|| ShepherdError::DeviceNotFound(Self::addr_for_error(addr)))?
            .clone();
        let id = dev
            .reg_id
            .ok_or_else(|| ShepherdError::InvalidArgument("device has no reg_id yet".to_string()))?;
        self.store.sync(id, &dev)
    }

    pub fn export_all(&self) -> &[Device] {
        &self.devices
    }

    /// Used by `stop()`: clears the in-memory mirror only. The on-disk
    /// store is untouched (`spec.md` §4.B, §9).
    pub fn clear_all(&mut self) {
        self.devices.clear();
    }

    /// Used by `reset("hard")`: removes every id from the store and
    /// verifies it ends up empty (`spec.md` §4.B).
    pub fn wipe_store(&mut self) -> Result<()> {
        for id in self.store.export_all_ids() {
            if let Err(e) = self.store.remove(id) {
                tracing::warn!(error = %e, id, "failed to remove device from store during hard reset");
            }
        }
        if !self.store.is_empty() {
            return Err(ShepherdError::PersistenceError(
                "store is not empty after hard reset".to_string(),
            ));
        }
        Ok(())
    }

    /// Re-hydrate the in-memory mirror from the store at startup
    /// (`spec.md` §3 "Lifecycles"). Each loaded device is run back
    /// through `register` with `recovered = true`, which re-persists it
    /// under its existing id and clears the flag.
    pub fn rehydrate(&mut self, now: u64) -> Result<()> {
        for mut dev in self.store.export_all_objs() {
            dev.recovered = true;
            self.register(dev, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devbox::JsonDevBox;
    use crate::model::DeviceType;

    fn registry() -> Registry {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDevBox::open(dir.path().join("db.json")).unwrap();
        Box::leak(Box::new(dir)); // keep tempdir alive for the test's duration
        Registry::new(Box::new(store))
    }

    #[test]
    fn duplicate_ieee_registration_is_rejected() {
        let mut reg = registry();
        let ieee = IeeeAddr::parse("0x00124b0001").unwrap();
        reg.register(Device::new(ieee, 1, DeviceType::Router), 100).unwrap();
        let err = reg
            .register(Device::new(ieee, 2, DeviceType::Router), 100)
            .unwrap_err();
        assert!(matches!(err, ShepherdError::DuplicateRegistration(_)));
    }

    #[test]
    fn find_by_ieee_and_nwk_return_same_device() {
        let mut reg = registry();
        let ieee = IeeeAddr::parse("0x00124b0001").unwrap();
        reg.register(Device::new(ieee, 0x1234, DeviceType::Router), 100).unwrap();
        let by_ieee = reg.find(ieee).unwrap().reg_id;
        let by_nwk = reg.find(0x1234u16).unwrap().reg_id;
        assert_eq!(by_ieee, by_nwk);
    }

    #[test]
    fn hard_reset_empties_the_store() {
        let mut reg = registry();
        for i in 0..3u64 {
            reg.register(
                Device::new(IeeeAddr(i + 1), (i + 1) as u16, DeviceType::Router),
                100,
            )
            .unwrap();
        }
        reg.wipe_store().unwrap();
        assert!(reg.store.is_empty());
    }
}
