//! The unified external event stream (`spec.md` §4.E, §6, §9: "Emit into
//! a single typed sink; the external `ind` event is one sum type over the
//! payload variants, not a stringly-typed dispatch").

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{DeviceStatus, Endpoint, IeeeAddr};

/// One payload variant of the unified `ind` event (`spec.md` §4.E table).
#[derive(Debug, Clone)]
pub enum IndEvent {
    DevIncoming {
        endpoints: Vec<Endpoint>,
        ieee_addr: IeeeAddr,
    },
    DevInterview {
        status: crate::controller::InterviewStatus,
        ieee_addr: IeeeAddr,
    },
    DevLeaving {
        endpoints: Vec<u8>,
        ieee_addr: IeeeAddr,
    },
    DevChange {
        endpoint: Endpoint,
        cluster_id: u16,
        diff: HashMap<String, Value>,
    },
    DataConfirm {
        endpoint: Endpoint,
        status: u8,
    },
    StatusChange {
        endpoint: Endpoint,
        cluster_id: u16,
        zone_status: u16,
        msg: String,
    },
    AttReport {
        endpoint: Endpoint,
        cluster_id: u16,
        data: HashMap<String, Value>,
    },
    DevStatus {
        endpoints: Vec<u8>,
        status: DeviceStatus,
    },
}

/// Everything the Shepherd can hand back to a caller driving its event
/// loop: `ready`, `permitJoining(time)`, and the unified `ind` stream.
#[derive(Debug, Clone)]
pub enum ShepherdEvent {
    Ready,
    PermitJoining(u8),
    Ind(IndEvent),
}
