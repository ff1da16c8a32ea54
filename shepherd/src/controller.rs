//! The Controller: the serial transport and radio command codec external
//! collaborator (`spec.md` §6). `shepherd` depends only on [`Controller`];
//! this module also ships [`MockController`], an in-process stand-in used
//! by the test suite and `shepherd-gateway`, since a trait with no
//! implementation at all would leave the crate impossible to exercise.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::af::{FoundationCmd, FunctionalCmd};
use crate::error::Result;
use crate::model::{DeviceStatus, DeviceType, Endpoint, IeeeAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Hard,
}

impl TryFrom<&str> for ResetMode {
    type Error = crate::error::ShepherdError;
    fn try_from(s: &str) -> Result<Self> {
        match s {
            "soft" => Ok(ResetMode::Soft),
            "hard" => Ok(ResetMode::Hard),
            other => Err(crate::error::ShepherdError::InvalidArgument(format!(
                "unknown reset mode: {other}"
            ))),
        }
    }
}

impl TryFrom<i32> for ResetMode {
    type Error = crate::error::ShepherdError;
    fn try_from(n: i32) -> Result<Self> {
        match n {
            1 => Ok(ResetMode::Soft),
            0 => Ok(ResetMode::Hard),
            other => Err(crate::error::ShepherdError::InvalidArgument(format!(
                "unknown reset mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermitJoinType {
    #[default]
    All,
    Coord,
}

impl TryFrom<&str> for PermitJoinType {
    type Error = crate::error::ShepherdError;
    fn try_from(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(PermitJoinType::All),
            "coord" => Ok(PermitJoinType::Coord),
            other => Err(crate::error::ShepherdError::InvalidArgument(format!(
                "unknown permit join type: {other}"
            ))),
        }
    }
}

/// Either side of a bind: a `(nwkAddr, epId)` pair. Used for both the bind
/// source (which may be a remote endpoint, e.g. `report`'s "from the remote
/// endpoint") and the bind target (`spec.md` §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindTarget {
    pub nwk_addr: u16,
    pub ep_id: u8,
}

/// A ZCL command inbound to the coordinator, addressed to a mounted app's
/// coordpoint (`spec.md` §4.C: "wire `onZclFoundation`/`onZclFunctional`").
#[derive(Debug, Clone)]
pub enum ZclRequest {
    Foundation(FoundationCmd),
    Functional(FunctionalCmd),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveConfig {
    pub reconfigure: bool,
}

#[derive(Debug, Clone)]
pub struct EndpointInfo {
    pub ep_id: u8,
    pub prof_id: u16,
    pub dev_id: u16,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
    pub device_type: DeviceType,
    pub endpoints: Vec<EndpointInfo>,
    pub manufacturer: Option<String>,
    pub firmware: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewStatus {
    InProgress,
    Successful,
    Failed,
}

#[derive(Debug, Clone)]
pub struct InterviewProgress {
    pub ieee_addr: IeeeAddr,
    pub status: InterviewStatus,
}

#[derive(Debug, Clone)]
pub struct NetInfo {
    pub state: String,
    pub channel: u8,
    pub pan_id: u16,
    pub ext_pan_id: u64,
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
}

#[derive(Debug, Clone)]
pub struct LqiNeighbor {
    pub ieee_addr: IeeeAddr,
    pub nwk_addr: u16,
    pub lqi: u8,
}

#[derive(Debug, Clone, Default)]
pub struct LqiResponse {
    pub status: u8,
    pub neighbors: Vec<LqiNeighbor>,
}

#[derive(Debug, Clone)]
pub struct RtgEntry {
    pub dest_nwk_addr: u16,
    pub route_status: u8,
    pub next_hop_nwk_addr: u16,
}

#[derive(Debug, Clone, Default)]
pub struct RtgResponse {
    pub status: u8,
    pub entries: Vec<RtgEntry>,
}

/// Raw indications produced by the radio (`spec.md` §4.E, §6).
#[derive(Debug, Clone)]
pub enum Indication {
    Incoming(DeviceInfo),
    Interview(InterviewProgress),
    Leaving { ieee_addr: IeeeAddr },
    AttrReport {
        nwk_addr: u16,
        ep_id: u8,
        cluster_id: u16,
        attrs: std::collections::HashMap<String, serde_json::Value>,
    },
    DataConfirm {
        nwk_addr: u16,
        ep_id: u8,
        status: u8,
    },
    StatusChange {
        nwk_addr: u16,
        ep_id: u8,
        cluster_id: u16,
        zone_status: u16,
        extended_status: u8,
    },
    DevStatus {
        nwk_addr: u16,
        status: DeviceStatus,
    },
    PermitJoining {
        time_left: u8,
    },
    ZclRequest {
        ep_id: u8,
        cluster_id: u16,
        request: ZclRequest,
    },
}

#[async_trait(?Send)]
pub trait Controller {
    async fn start(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
    async fn reset(&mut self, mode: ResetMode) -> Result<()>;
    async fn permit_join(&mut self, time: u8, join_type: PermitJoinType) -> Result<()>;
    async fn register_ep(&mut self, ep: &Endpoint) -> Result<()>;
    /// Create a bind table entry at `src` for `cluster_id`, pointing at
    /// `target`. `src` carries its own `nwkAddr` because the bind source is
    /// not always the coordinator (`spec.md` §4.D `report`: "binds cId from
    /// the remote endpoint to the delegator").
    async fn bind(&mut self, src: BindTarget, cluster_id: u16, target: BindTarget) -> Result<()>;
    async fn unbind(&mut self, src: BindTarget, cluster_id: u16, target: BindTarget) -> Result<()>;
    async fn remove(&mut self, ieee_addr: IeeeAddr, cfg: RemoveConfig) -> Result<()>;
    async fn get_coord(&mut self) -> Result<DeviceInfo>;
    async fn get_net_info(&mut self) -> Result<NetInfo>;
    async fn get_firmware_info(&mut self) -> Result<String>;
    async fn mgmt_lqi_req(&mut self, nwk_addr: u16) -> Result<LqiResponse>;
    async fn mgmt_rtg_req(&mut self, nwk_addr: u16) -> Result<RtgResponse>;

    /// The receiver side of the raw indication stream. The Indication
    /// Dispatcher (`spec.md` §4.E) awaits on this directly.
    fn indications(&mut self) -> &mut mpsc::UnboundedReceiver<Indication>;
}

/// An in-process stand-in radio used by tests and `shepherd-gateway`.
/// Canned responses are configured via the public fields before the
/// Shepherd drives it; calls made against it are recorded for assertions.
#[derive(Debug)]
pub struct MockController {
    pub net_info: NetInfo,
    pub firmware: String,
    pub lqi_responses: std::collections::HashMap<u16, LqiResponse>,
    pub rtg_responses: std::collections::HashMap<u16, RtgResponse>,
    pub register_ep_calls: Vec<u8>,
    pub bind_calls: std::rc::Rc<std::cell::RefCell<Vec<(BindTarget, u16, BindTarget)>>>,
    pub permit_join_calls: Vec<(u8, PermitJoinType)>,
    pub reset_calls: Vec<ResetMode>,
    pub removed: Vec<IeeeAddr>,
    rx: mpsc::UnboundedReceiver<Indication>,
}

/// A clonable handle used to feed indications into a [`MockController`]
/// from outside the Shepherd, simulating radio-side events, and to read
/// back the bind calls it has recorded once the controller itself is
/// boxed away inside a [`crate::Shepherd`].
#[derive(Debug, Clone)]
pub struct MockControllerHandle {
    tx: mpsc::UnboundedSender<Indication>,
    bind_calls: std::rc::Rc<std::cell::RefCell<Vec<(BindTarget, u16, BindTarget)>>>,
}

impl MockControllerHandle {
    pub fn send(&self, ind: Indication) {
        let _ = self.tx.send(ind);
    }

    pub fn bind_calls(&self) -> Vec<(BindTarget, u16, BindTarget)> {
        self.bind_calls.borrow().clone()
    }
}

impl MockController {
    pub fn new(coord_ieee: IeeeAddr, coord_nwk: u16) -> (Self, MockControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bind_calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let controller = MockController {
            net_info: NetInfo {
                state: "online".to_string(),
                channel: 15,
                pan_id: 0x1a62,
                ext_pan_id: 0x00124b0001020304,
                ieee_addr: coord_ieee,
                nwk_addr: coord_nwk,
            },
            firmware: "mock-1.0".to_string(),
            lqi_responses: std::collections::HashMap::new(),
            rtg_responses: std::collections::HashMap::new(),
            register_ep_calls: Vec::new(),
            bind_calls: bind_calls.clone(),
            permit_join_calls: Vec::new(),
            reset_calls: Vec::new(),
            removed: Vec::new(),
            rx,
        };
        (controller, MockControllerHandle { tx, bind_calls })
    }
}

#[async_trait(?Send)]
impl Controller for MockController {
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn reset(&mut self, mode: ResetMode) -> Result<()> {
        self.reset_calls.push(mode);
        Ok(())
    }

    async fn permit_join(&mut self, time: u8, join_type: PermitJoinType) -> Result<()> {
        self.permit_join_calls.push((time, join_type));
        Ok(())
    }

    async fn register_ep(&mut self, ep: &Endpoint) -> Result<()> {
        self.register_ep_calls.push(ep.ep_id);
        Ok(())
    }

    async fn bind(&mut self, src: BindTarget, cluster_id: u16, target: BindTarget) -> Result<()> {
        self.bind_calls.borrow_mut().push((src, cluster_id, target));
        Ok(())
    }

    async fn unbind(&mut self, _src: BindTarget, _cluster_id: u16, _target: BindTarget) -> Result<()> {
        Ok(())
    }

    async fn remove(&mut self, ieee_addr: IeeeAddr, _cfg: RemoveConfig) -> Result<()> {
        self.removed.push(ieee_addr);
        Ok(())
    }

    async fn get_coord(&mut self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            ieee_addr: self.net_info.ieee_addr,
            nwk_addr: self.net_info.nwk_addr,
            device_type: DeviceType::Coordinator,
            endpoints: Vec::new(),
            manufacturer: Some("mock".to_string()),
            firmware: Some(self.firmware.clone()),
        })
    }

    async fn get_net_info(&mut self) -> Result<NetInfo> {
        Ok(self.net_info.clone())
    }

    async fn get_firmware_info(&mut self) -> Result<String> {
        Ok(self.firmware.clone())
    }

    async fn mgmt_lqi_req(&mut self, nwk_addr: u16) -> Result<LqiResponse> {
        Ok(self.lqi_responses.get(&nwk_addr).cloned().unwrap_or_default())
    }

    async fn mgmt_rtg_req(&mut self, nwk_addr: u16) -> Result<RtgResponse> {
        Ok(self.rtg_responses.get(&nwk_addr).cloned().unwrap_or_default())
    }

    fn indications(&mut self) -> &mut mpsc::UnboundedReceiver<Indication> {
        &mut self.rx
    }
}
