//! A host-side, stateful façade in front of a Zigbee coordinator radio.
//!
//! [`Shepherd`] owns the Device Registry, drives the device lifecycle
//! (start/stop/reset/permit-join and join admission), serializes mounting
//! local applications onto coordinator endpoints, routes ZCL requests to
//! remote endpoints, dispatches the radio's raw indication stream into a
//! single typed event sum, and walks the network topology over LQI.
//!
//! It is deliberately **not** thread-safe: every [`Shepherd`] clone shares
//! one `Rc`-rooted state tree and is meant to live on a single task. See
//! the module docs on [`crate::shepherd`] for why.
//!
//! Three external collaborators are defined as traits and must be
//! supplied by the caller: [`Controller`] (the radio transport/codec),
//! [`AfLayer`] (the ZCL frame builder), and [`DevBox`] (persistence).
//! Reference implementations ([`MockController`], [`JsonDevBox`]) are
//! included so the crate is runnable end to end without real hardware.

mod af;
pub mod config;
mod controller;
mod devbox;
mod dispatcher;
mod error;
mod events;
mod lifecycle;
mod model;
mod mount;
mod registry;
mod router;
mod scanner;
mod shepherd;
mod zive;

pub use af::{
    AfLayer, AttrRecord, EndpointAddr, FoundationCmd, FoundationResponse, FunctionalCmd,
    FunctionalResponse, MockAfLayer, ReportConfigRecord, RequestConfig, WriteAttrRecord,
};
pub use config::{NetConfig, SerialSettings, ShepherdOptions};
pub use controller::{
    BindTarget, Controller, DeviceInfo, EndpointInfo, Indication, InterviewProgress,
    InterviewStatus, LqiNeighbor, LqiResponse, MockController, MockControllerHandle, NetInfo,
    PermitJoinType, RemoveConfig, ResetMode, RtgEntry, RtgResponse, ZclRequest,
};
pub use devbox::{DevBox, JsonDevBox};
pub use error::{Result, ShepherdError};
pub use events::{IndEvent, ShepherdEvent};
pub use model::{
    AddrQuery, ClusterTable, Device, DeviceStatus, DeviceType, Endpoint, EndpointKind, IeeeAddr,
};
pub use scanner::ScanRecord;
pub use shepherd::{DeviceDump, Shepherd, ShepherdInfo};
pub use zive::{SimpleDescriptor, Zive};

pub use zcl_catalog as catalog;
