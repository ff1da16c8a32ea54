//! The Mount Serializer (`spec.md` §4.C): provisioning a coordinator
//! endpoint for a locally-mounted application, one at a time.
//!
//! `spec.md` §9 Design Note asks for "a bounded FIFO + boolean flag, not a
//! mutex" so waiters get fairness without blocking the whole Shepherd.
//! Tokio's [`tokio::sync::Semaphore`] is exactly that: a single permit,
//! acquired in FIFO order, released automatically when the guard drops.

use std::rc::Rc;

use crate::error::{Result, ShepherdError};
use crate::model::{Endpoint, EndpointKind};
use crate::shepherd::Shepherd;
use crate::zive::Zive;

impl Shepherd {
    /// Provision a coordinator endpoint for `app` and register it for
    /// routing. Refuses a second mount of the same [`Zive::id`]
    /// (`spec.md` §4.C). Mounts are serialized: only one is in flight on
    /// the radio at a time, in call order.
    pub async fn mount(&self, app: Rc<dyn Zive>) -> Result<u8> {
        if !self.is_enabled() {
            return Err(ShepherdError::NotEnabled);
        }

        let app_id = app.id().to_string();
        {
            let inner = self.inner.borrow();
            if inner.mounted_apps.contains_key(&app_id) {
                return Err(ShepherdError::DuplicateMount);
            }
        }

        // Acquire the serializer permit before touching the radio. Held
        // across every `.await` below; dropped (and the next waiter woken)
        // when this guard goes out of scope at the end of the function.
        // A plain (non-owned) permit is enough: the `Rc<Semaphore>` clone
        // it borrows from lives in `lock` for the rest of this call.
        let lock = self.mount_lock.clone();
        let _permit = lock.acquire().await.expect("mount semaphore is never closed");

        // Re-check under the permit: a racing mount of the same app could
        // have slipped in between the first check and acquiring it.
        {
            let inner = self.inner.borrow();
            if inner.mounted_apps.contains_key(&app_id) {
                return Err(ShepherdError::DuplicateMount);
            }
        }

        let coord_ieee = self.coordinator_ieee()?;
        let ep_id = {
            let inner = self.inner.borrow();
            let taken: Vec<u8> = inner
                .registry
                .find(coord_ieee)
                .map(|d| d.ep_list.clone())
                .unwrap_or_default();
            (11..=254u8)
                .find(|id| !taken.contains(id))
                .ok_or_else(|| ShepherdError::InvalidArgument("no free coordinator endpoint ids left".to_string()))?
        };

        let desc = app.simple_descriptor();
        let mut endpoint = Endpoint::new(
            ep_id,
            desc.prof_id,
            desc.dev_id,
            desc.in_clusters,
            desc.out_clusters,
        );
        endpoint.kind = EndpointKind::Coordpoint;

        let controller = self.controller_handle();
        controller.lock().await.register_ep(&endpoint).await?;

        // Refresh the coordinator device from the radio and persist it,
        // the way `start()` does (`spec.md` §4.C).
        let coord_info = controller.lock().await.get_coord().await?;
        self.reconcile_coordinator(coord_info).await?;

        let mut inner = self.inner.borrow_mut();
        if let Some(dev) = inner.registry.find_mut(coord_ieee) {
            dev.insert_endpoint(endpoint);
        }
        inner.mounted_apps.insert(app_id, ep_id);
        inner.apps.insert(ep_id, app);
        drop(inner);
        self.inner.borrow_mut().registry.sync_one(coord_ieee)?;

        Ok(ep_id)
    }

    /// Look up the mounted application bound to a coordinator endpoint, if
    /// any (used by the indication dispatcher when routing an inbound ZCL
    /// request addressed to a coordpoint).
    pub(crate) fn app_for_endpoint(&self, ep_id: u8) -> Option<Rc<dyn Zive>> {
        self.inner.borrow().apps.get(&ep_id).cloned()
    }
}
