//! The Indication Dispatcher (`spec.md` §4.E): translates raw
//! [`crate::controller::Indication`]s off the radio into the unified
//! [`ShepherdEvent`] stream, applying whatever registry reconciliation
//! each indication implies along the way.

use crate::controller::{Indication, ZclRequest};
use crate::events::{IndEvent, ShepherdEvent};
use crate::model::AddrQuery;
use crate::shepherd::Shepherd;

/// Await the next raw indication and turn it into the externally visible
/// event, or `None` once the Controller's channel has closed. Indications
/// that don't resolve to a visible device (an attribute report for an
/// address the registry doesn't know, say) are dropped with a warning
/// rather than surfaced, since `spec.md` does not define a raw fallback
/// event shape to put them in.
pub(crate) async fn next_dispatched_event(shepherd: &Shepherd) -> Option<ShepherdEvent> {
    loop {
        let ind = {
            let controller = shepherd.controller_handle();
            let mut c = controller.lock().await;
            c.indications().recv().await?
        };

        if let Some(ev) = translate(shepherd, ind) {
            return Some(ev);
        }
    }
}

fn translate(shepherd: &Shepherd, ind: Indication) -> Option<ShepherdEvent> {
    let ind_event = match ind {
        Indication::Incoming(info) => shepherd.handle_incoming(info),
        Indication::Interview(progress) => Some(IndEvent::DevInterview {
            status: progress.status,
            ieee_addr: progress.ieee_addr,
        }),
        Indication::Leaving { ieee_addr } => shepherd.handle_leaving(ieee_addr),
        Indication::PermitJoining { time_left } => {
            shepherd.inner.borrow_mut().join_time_left = Some(time_left);
            return Some(ShepherdEvent::PermitJoining(time_left));
        }
        Indication::AttrReport {
            nwk_addr,
            ep_id,
            cluster_id,
            attrs,
        } => with_endpoint(shepherd, nwk_addr, ep_id, |endpoint| {
            let table = endpoint.cluster_mut(cluster_id);
            table.apply(attrs.clone());
            IndEvent::AttReport {
                endpoint: endpoint.clone(),
                cluster_id,
                data: attrs,
            }
        }),
        Indication::DataConfirm { nwk_addr, ep_id, status } => {
            with_endpoint(shepherd, nwk_addr, ep_id, |endpoint| IndEvent::DataConfirm {
                endpoint: endpoint.clone(),
                status,
            })
        }
        Indication::StatusChange {
            nwk_addr,
            ep_id,
            cluster_id,
            zone_status,
            extended_status,
        } => with_endpoint(shepherd, nwk_addr, ep_id, |endpoint| IndEvent::StatusChange {
            endpoint: endpoint.clone(),
            cluster_id,
            zone_status,
            msg: format!("extended status {extended_status:#04x}"),
        }),
        Indication::ZclRequest { ep_id, cluster_id, request } => {
            dispatch_to_app(shepherd, ep_id, cluster_id, request);
            None
        }
        Indication::DevStatus { nwk_addr, status } => {
            let mut inner = shepherd.inner.borrow_mut();
            let dev = inner.registry.find_mut(AddrQuery::Nwk(nwk_addr))?;
            dev.status = status;
            let endpoints = dev.ep_list.clone();
            let ieee_addr = dev.ieee_addr;
            drop(inner);
            if let Err(e) = shepherd.inner.borrow_mut().registry.sync_one(ieee_addr) {
                tracing::warn!(error = %e, "failed to persist device status change");
            }
            Some(IndEvent::DevStatus { endpoints, status })
        }
    };
    ind_event.map(ShepherdEvent::Ind)
}

/// Route a ZCL request addressed to a coordpoint into its mounted app's
/// foundation/functional handler (`spec.md` §4.C: "wire `onZclFoundation`/
/// `onZclFunctional` on the endpoint to the app's handlers"). Produces no
/// externally-visible event of its own; the app's response, if any, is the
/// app's own business, not something the Shepherd surfaces on `poll_event`.
fn dispatch_to_app(shepherd: &Shepherd, ep_id: u8, cluster_id: u16, request: ZclRequest) {
    let Some(app) = shepherd.app_for_endpoint(ep_id) else {
        tracing::warn!(ep_id, "zcl request for an unmounted coordpoint, dropped");
        return;
    };
    match request {
        ZclRequest::Foundation(cmd) => {
            app.on_zcl_foundation(cluster_id, &cmd);
        }
        ZclRequest::Functional(cmd) => {
            app.on_zcl_functional(cluster_id, &cmd);
        }
    }
}

/// Resolve `(nwkAddr, epId)` to a live `Endpoint` and run `f` over it,
/// logging and dropping the indication if the device or endpoint is
/// unknown to the registry.
fn with_endpoint(
    shepherd: &Shepherd,
    nwk_addr: u16,
    ep_id: u8,
    f: impl FnOnce(&mut crate::model::Endpoint) -> IndEvent,
) -> Option<IndEvent> {
    let mut inner = shepherd.inner.borrow_mut();
    let ieee_addr = match inner.registry.find(AddrQuery::Nwk(nwk_addr)) {
        Some(dev) => dev.ieee_addr,
        None => {
            tracing::warn!(nwk_addr, "indication for unknown device, dropped");
            return None;
        }
    };
    let dev = inner.registry.find_mut(AddrQuery::Nwk(nwk_addr))?;
    let endpoint = match dev.endpoints.get_mut(&ep_id) {
        Some(ep) => ep,
        None => {
            tracing::warn!(nwk_addr, ep_id, "indication for unknown endpoint, dropped");
            return None;
        }
    };
    let event = f(endpoint);
    drop(inner);
    if let Err(e) = shepherd.inner.borrow_mut().registry.sync_one(ieee_addr) {
        tracing::warn!(error = %e, "failed to persist indication side effects");
    }
    Some(event)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::af::{FoundationCmd, FoundationResponse, MockAfLayer};
    use crate::controller::MockController;
    use crate::devbox::JsonDevBox;
    use crate::model::IeeeAddr;
    use crate::zive::{SimpleDescriptor, Zive};

    struct RecordingApp {
        foundation_calls: RefCell<Vec<u16>>,
    }

    impl Zive for RecordingApp {
        fn id(&self) -> &str {
            "recorder"
        }

        fn simple_descriptor(&self) -> SimpleDescriptor {
            SimpleDescriptor {
                prof_id: 0x0104,
                dev_id: 0x0000,
                in_clusters: vec![0x0000],
                out_clusters: vec![],
            }
        }

        fn on_zcl_foundation(&self, cluster_id: u16, _cmd: &FoundationCmd) -> FoundationResponse {
            self.foundation_calls.borrow_mut().push(cluster_id);
            FoundationResponse::default()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn zcl_request_dispatches_into_the_mounted_apps_handler() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDevBox::open(dir.path().join("db.json")).unwrap();
        let coord_ieee = IeeeAddr::parse("0x00124b0001020304").unwrap();
        let (controller, _handle) = MockController::new(coord_ieee, 0x0000);
        let af = MockAfLayer::new();
        let shepherd = Shepherd::new(Box::new(store), Box::new(controller), af);
        shepherd.start(true).await.unwrap();

        let app = Rc::new(RecordingApp {
            foundation_calls: RefCell::new(Vec::new()),
        });
        let ep_id = shepherd.mount(app.clone() as Rc<dyn Zive>).await.unwrap();

        let ev = translate(
            &shepherd,
            Indication::ZclRequest {
                ep_id,
                cluster_id: 0x0006,
                request: ZclRequest::Foundation(FoundationCmd::Read(vec![0x0000])),
            },
        );

        assert!(ev.is_none(), "a dispatched zcl request has no externally-visible event of its own");
        assert_eq!(*app.foundation_calls.borrow(), vec![0x0006]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn zcl_request_for_an_unmounted_endpoint_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDevBox::open(dir.path().join("db.json")).unwrap();
        let coord_ieee = IeeeAddr::parse("0x00124b0001020304").unwrap();
        let (controller, _handle) = MockController::new(coord_ieee, 0x0000);
        let af = MockAfLayer::new();
        let shepherd = Shepherd::new(Box::new(store), Box::new(controller), af);
        shepherd.start(true).await.unwrap();

        let ev = translate(
            &shepherd,
            Indication::ZclRequest {
                ep_id: 42,
                cluster_id: 0x0006,
                request: ZclRequest::Foundation(FoundationCmd::Read(vec![0x0000])),
            },
        );
        assert!(ev.is_none());
    }
}
