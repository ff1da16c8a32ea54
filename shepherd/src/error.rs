//! Error taxonomy (`spec.md` §7). Every public façade call returns a
//! settled `Result`; failures never bubble out-of-band except argument
//! shape violations, which are programmer errors and panic at the call
//! site the way an out-of-bounds index would.

use crate::model::IeeeAddr;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShepherdError>;

#[derive(Debug, thiserror::Error)]
pub enum ShepherdError {
    /// Operation attempted before [`crate::Shepherd::start`] succeeded.
    #[error("shepherd is not enabled")]
    NotEnabled,

    /// A second `start()` while already enabled.
    #[error("shepherd is already enabled")]
    AlreadyEnabled,

    #[error("device not found: {0}")]
    DeviceNotFound(IeeeAddr),

    #[error("endpoint {ep_id} not found on device {addr}")]
    EndpointNotFound { addr: IeeeAddr, ep_id: u8 },

    #[error("application is already mounted")]
    DuplicateMount,

    #[error("coordinator device is not present in the registry")]
    CoordinatorNotReady,

    #[error("no delegator endpoint for profile {profile_id:#06x}")]
    ProfileUnsupported { profile_id: u16 },

    #[error("request unsuccess: {status}")]
    RequestUnsuccess { status: u8 },

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// A registry id collision, or a second device with the same IEEE
    /// address (`spec.md` §4.A: "the registry never silently overwrites").
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// Caller passed an argument combination the façade does not accept
    /// (`spec.md` §7: "argument-shape violations ... raised synchronously
    /// as programmer errors").
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
