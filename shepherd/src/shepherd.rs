//! The Public Façade (`spec.md` §4.G) and the aggregate state it sits on
//! top of. `spec.md` §5 says the Shepherd is not thread-safe and must be
//! confined to one task; we model that directly with `Rc<RefCell<..>>`
//! rather than `Arc<Mutex<..>>`, which would promise a guarantee the spec
//! says does not hold. Multiple [`Shepherd`] handles (`Clone`, cheap `Rc`
//! bumps) can be held by concurrent callers on the same task -- that's
//! the "multiplexes many concurrent application requests" requirement --
//! while the underlying radio access is still serialised through the
//! `Controller`'s own mutex.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex as AsyncMutex, Semaphore};

use crate::af::AfLayer;
use crate::controller::{Controller, DeviceInfo, RemoveConfig};
use crate::devbox::DevBox;
use crate::error::{Result, ShepherdError};
use crate::events::ShepherdEvent;
use crate::model::{AddrQuery, Device, DeviceType, IeeeAddr};
use crate::registry::Registry;
use crate::zive::Zive;

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub(crate) type AcceptHook = Box<dyn Fn(&DeviceInfo) -> bool>;

pub(crate) struct Inner {
    pub(crate) registry: Registry,
    pub(crate) controller: Rc<AsyncMutex<Box<dyn Controller>>>,
    pub(crate) af: Rc<dyn AfLayer>,
    pub(crate) enabled: bool,
    pub(crate) start_time: Option<u64>,
    pub(crate) mounted_apps: HashMap<String, u8>,
    pub(crate) apps: HashMap<u8, Rc<dyn Zive>>,
    pub(crate) delegators: HashMap<u16, u8>,
    pub(crate) accept_incoming: AcceptHook,
    pub(crate) accept_interview: AcceptHook,
    pub(crate) pending_events: VecDeque<ShepherdEvent>,
    pub(crate) join_time_left: Option<u8>,
}

/// The Shepherd handle. Cheaply `Clone`-able; every clone shares the same
/// underlying state.
#[derive(Clone)]
pub struct Shepherd {
    pub(crate) inner: Rc<RefCell<Inner>>,
    pub(crate) mount_lock: Rc<Semaphore>,
}

/// Snapshot returned by [`Shepherd::info`] (`spec.md` §4.G).
#[derive(Debug, Clone)]
pub struct ShepherdInfo {
    pub enabled: bool,
    pub net_state: String,
    pub channel: u8,
    pub pan_id: u16,
    pub ext_pan_id: u64,
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
    pub firmware: String,
    pub start_time: Option<u64>,
    pub join_time_left: Option<u8>,
}

/// A dump of a device's state, minus `id`/`endpoints`, as returned by
/// [`Shepherd::list`] for a specific address lookup (`spec.md` §4.G).
#[derive(Debug, Clone)]
pub struct DeviceDump {
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
    pub device_type: DeviceType,
    pub status: crate::model::DeviceStatus,
    pub join_time: u64,
    pub incomplete: bool,
    pub manufacturer: Option<String>,
    pub firmware: Option<String>,
}

impl From<&Device> for DeviceDump {
    fn from(d: &Device) -> Self {
        DeviceDump {
            ieee_addr: d.ieee_addr,
            nwk_addr: d.nwk_addr,
            device_type: d.device_type,
            status: d.status,
            join_time: d.join_time,
            incomplete: d.incomplete,
            manufacturer: d.manufacturer.clone(),
            firmware: d.firmware.clone(),
        }
    }
}

impl Shepherd {
    pub fn new(
        store: Box<dyn DevBox>,
        controller: Box<dyn Controller>,
        af: impl AfLayer + 'static,
    ) -> Self {
        let inner = Inner {
            registry: Registry::new(store),
            controller: Rc::new(AsyncMutex::new(controller)),
            af: Rc::new(af),
            enabled: false,
            start_time: None,
            mounted_apps: HashMap::new(),
            apps: HashMap::new(),
            delegators: HashMap::new(),
            accept_incoming: Box::new(|_| true),
            accept_interview: Box::new(|_| true),
            pending_events: VecDeque::new(),
            join_time_left: None,
        };
        Shepherd {
            inner: Rc::new(RefCell::new(inner)),
            mount_lock: Rc::new(Semaphore::new(1)),
        }
    }

    /// Override the join-admission hook at any time (`spec.md` §4.B).
    pub fn set_accept_incoming(&self, hook: impl Fn(&DeviceInfo) -> bool + 'static) {
        self.inner.borrow_mut().accept_incoming = Box::new(hook);
    }

    /// Override the interview-admission hook at any time (`spec.md` §4.B).
    pub fn set_accept_interview(&self, hook: impl Fn(&DeviceInfo) -> bool + 'static) {
        self.inner.borrow_mut().accept_interview = Box::new(hook);
    }

    pub(crate) fn controller_handle(&self) -> Rc<AsyncMutex<Box<dyn Controller>>> {
        self.inner.borrow().controller.clone()
    }

    pub(crate) fn af_handle(&self) -> Rc<dyn AfLayer> {
        self.inner.borrow().af.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    /// Drain the next externally-visible event, if one is ready without
    /// blocking, or await the Controller's raw indication stream for the
    /// next one. Returns `None` once the Controller's channel has closed
    /// (e.g. after `stop`). This call *is* the external event stream
    /// (`spec.md` §4.E, §6): callers drive their own loop around it.
    pub async fn poll_event(&self) -> Option<ShepherdEvent> {
        if let Some(ev) = self.inner.borrow_mut().pending_events.pop_front() {
            return Some(ev);
        }
        crate::dispatcher::next_dispatched_event(self).await
    }

    /// `spec.md` §4.G `info()`.
    pub async fn info(&self) -> Result<ShepherdInfo> {
        let controller = self.controller_handle();
        let net = controller.lock().await.get_net_info().await?;
        let firmware = controller.lock().await.get_firmware_info().await?;
        let inner = self.inner.borrow();
        Ok(ShepherdInfo {
            enabled: inner.enabled,
            net_state: net.state,
            channel: net.channel,
            pan_id: net.pan_id,
            ext_pan_id: net.ext_pan_id,
            ieee_addr: net.ieee_addr,
            nwk_addr: net.nwk_addr,
            firmware,
            start_time: inner.start_time,
            join_time_left: inner.join_time_left,
        })
    }

    /// `spec.md` §4.G `list()`: no argument form (every non-incomplete
    /// device).
    pub fn list_all(&self, show_incomplete: bool) -> Vec<DeviceDump> {
        let inner = self.inner.borrow();
        inner
            .registry
            .export_all()
            .iter()
            .filter(|d| show_incomplete || !d.incomplete)
            .map(DeviceDump::from)
            .collect()
    }

    /// `spec.md` §4.G `list(ieeeAddrs)`: look each address up, `None` for
    /// unknown ones, preserving input order and slot count.
    pub fn list_by_addr(&self, addrs: &[IeeeAddr]) -> Vec<Option<DeviceDump>> {
        let inner = self.inner.borrow();
        addrs
            .iter()
            .map(|a| inner.registry.find(*a).map(DeviceDump::from))
            .collect()
    }

    /// `spec.md` §4.G `find(addr, epId)`.
    pub fn find_endpoint(&self, addr: impl Into<AddrQuery>, ep_id: u8) -> Option<(Device, crate::model::Endpoint)> {
        let inner = self.inner.borrow();
        let dev = inner.registry.find(addr.into())?;
        let ep = dev.endpoints.get(&ep_id)?;
        Some((dev.clone(), ep.clone()))
    }

    /// `spec.md` §4.G `rtg(ieeeAddr)`: drop "inactive" routes
    /// (`routeStatus & 7 != 3`).
    pub async fn rtg(&self, ieee_addr: IeeeAddr) -> Result<Vec<crate::controller::RtgEntry>> {
        let nwk_addr = {
            let inner = self.inner.borrow();
            inner
                .registry
                .find(ieee_addr)
                .map(|d| d.nwk_addr)
                .ok_or(ShepherdError::DeviceNotFound(ieee_addr))?
        };
        let controller = self.controller_handle();
        let resp = controller.lock().await.mgmt_rtg_req(nwk_addr).await?;
        if resp.status != 0 {
            return Err(ShepherdError::RequestUnsuccess { status: resp.status });
        }
        Ok(resp
            .entries
            .into_iter()
            .filter(|e| e.route_status & 0x7 != 3)
            .collect())
    }

    /// `spec.md` §4.G `lqi(ieeeAddr)`: single-hop LQI, as used by the
    /// topology scanner.
    pub async fn lqi(&self, ieee_addr: IeeeAddr) -> Result<Vec<crate::controller::LqiNeighbor>> {
        let nwk_addr = {
            let inner = self.inner.borrow();
            inner
                .registry
                .find(ieee_addr)
                .map(|d| d.nwk_addr)
                .ok_or(ShepherdError::DeviceNotFound(ieee_addr))?
        };
        let controller = self.controller_handle();
        let resp = controller.lock().await.mgmt_lqi_req(nwk_addr).await?;
        if resp.status != 0 {
            return Err(ShepherdError::RequestUnsuccess { status: resp.status });
        }
        Ok(resp.neighbors)
    }

    /// `spec.md` §4.G `remove(ieeeAddr, cfg)`.
    pub async fn remove(&self, ieee_addr: IeeeAddr, cfg: RemoveConfig) -> Result<()> {
        {
            let inner = self.inner.borrow();
            if inner.registry.find(ieee_addr).is_none() {
                return Err(ShepherdError::DeviceNotFound(ieee_addr));
            }
        }
        let controller = self.controller_handle();
        controller.lock().await.remove(ieee_addr, cfg).await?;
        self.inner.borrow_mut().registry.unregister(ieee_addr)?;
        Ok(())
    }
}
