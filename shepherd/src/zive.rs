//! `Zive`: the mounted local application external collaborator
//! (`spec.md` §1, §4.C). A `Zive` is a piece of application code the
//! caller wants exposed on the coordinator as if it were a device
//! endpoint -- it supplies a simple descriptor and handles incoming
//! foundation/functional commands.
//!
//! `spec.md` §9 calls out "dynamic callbacks per endpoint" as something to
//! re-architect into "a capability trait implemented once and
//! parameterised over the endpoint." `Zive` is that trait: the teacher's
//! per-instance method attachment (`_attachZclMethods`) becomes a single
//! trait two different endpoint kinds (remote endpoints, mounted apps)
//! implement.

use crate::af::{FoundationCmd, FoundationResponse, FunctionalCmd, FunctionalResponse};

#[derive(Debug, Clone)]
pub struct SimpleDescriptor {
    pub prof_id: u16,
    pub dev_id: u16,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
}

/// A mountable local application (`spec.md`'s "Zive collaborator").
pub trait Zive {
    /// Stable identity used to refuse double-mounting the same app
    /// (`spec.md` §4.C: "refuse to mount the same zApp twice").
    fn id(&self) -> &str;

    fn simple_descriptor(&self) -> SimpleDescriptor;

    /// Handle an incoming ZCL foundation command addressed to this app's
    /// coordpoint. Invoked by the indication dispatcher on an
    /// `Indication::ZclRequest` for this app's endpoint; apps that don't
    /// care about foundation commands can leave the default no-op.
    fn on_zcl_foundation(&self, cluster_id: u16, cmd: &FoundationCmd) -> FoundationResponse {
        let _ = (cluster_id, cmd);
        FoundationResponse::default()
    }

    /// Handle an incoming ZCL functional command addressed to this app's
    /// coordpoint.
    fn on_zcl_functional(&self, cluster_id: u16, cmd: &FunctionalCmd) -> FunctionalResponse {
        let _ = (cluster_id, cmd);
        FunctionalResponse::default()
    }
}
