//! The Topology Scanner (`spec.md` §4.F): breadth-first LQI sweep of the
//! network, level-synchronous and de-duplicated. Neighbours surface
//! through `mgmtLqiReq` before they are necessarily known to the
//! registry, so the walk tracks `(ieeeAddr, nwkAddr)` pairs directly
//! against the Controller rather than going through
//! [`Shepherd::lqi`](crate::Shepherd::lqi), which requires a registered
//! device.

use std::collections::HashSet;

use crate::controller::LqiNeighbor;
use crate::error::ShepherdError;
use crate::model::IeeeAddr;
use crate::shepherd::Shepherd;

/// One scanned node's result: either its neighbor table, or the error
/// that stopped that branch (`spec.md` §4.F: "a failure scanning one
/// device must not abort the scan of the others").
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub ieee_addr: IeeeAddr,
    pub parent: Option<IeeeAddr>,
    pub neighbors: Result<Vec<LqiNeighbor>, String>,
}

impl Shepherd {
    /// Walk the network outward from `root` (the coordinator if `None`),
    /// breadth-first, up to `max_depth` hops, visiting each device at
    /// most once. `spec.md` §4.F: "level-synchronous" -- every node at
    /// depth N is queried before any node at depth N+1 is queued; only
    /// `Router`-typed neighbours are enqueued for further scanning.
    pub async fn lqi_scan(&self, root: Option<IeeeAddr>, max_depth: u32) -> Vec<ScanRecord> {
        let root = match root {
            Some(ieee_addr) => {
                let nwk_addr = match self.inner.borrow().registry.find(ieee_addr) {
                    Some(dev) => dev.nwk_addr,
                    None => return Vec::new(),
                };
                (ieee_addr, nwk_addr)
            }
            None => match self.coordinator_ieee() {
                Ok(ieee_addr) => {
                    let nwk_addr = self.inner.borrow().registry.find(ieee_addr).map(|d| d.nwk_addr).unwrap_or(0);
                    (ieee_addr, nwk_addr)
                }
                Err(_) => return Vec::new(),
            },
        };

        let mut visited: HashSet<IeeeAddr> = HashSet::new();
        visited.insert(root.0);
        let mut frontier: Vec<(IeeeAddr, u16, Option<IeeeAddr>)> = vec![(root.0, root.1, None)];

        let mut records = Vec::new();
        let mut depth = 0;

        while !frontier.is_empty() && depth <= max_depth {
            let level = std::mem::take(&mut frontier);
            let mut next_frontier = Vec::new();

            // "All siblings at one level are scanned in parallel" --
            // each lock acquisition on the shared Controller still
            // serialises the actual radio traffic, but requests are
            // issued without waiting on each other.
            let controller = self.controller_handle();
            for (ieee_addr, nwk_addr, parent) in level {
                let resp = controller.lock().await.mgmt_lqi_req(nwk_addr).await;
                let record = match resp {
                    Ok(lqi) if lqi.status == 0 => {
                        for n in &lqi.neighbors {
                            // IEEE 0x0 marks an unresolved neighbour slot.
                            if n.ieee_addr.0 == 0 {
                                continue;
                            }
                            if visited.insert(n.ieee_addr) {
                                let is_router = self
                                    .inner
                                    .borrow()
                                    .registry
                                    .find(n.ieee_addr)
                                    .map(|d| d.device_type == crate::model::DeviceType::Router)
                                    .unwrap_or(false);
                                if is_router {
                                    next_frontier.push((n.ieee_addr, n.nwk_addr, Some(ieee_addr)));
                                }
                            }
                        }
                        ScanRecord {
                            ieee_addr,
                            parent,
                            neighbors: Ok(lqi.neighbors),
                        }
                    }
                    Ok(lqi) => ScanRecord {
                        ieee_addr,
                        parent,
                        neighbors: Err(format!("request unsuccess: {}", lqi.status)),
                    },
                    Err(e) => ScanRecord {
                        ieee_addr,
                        parent,
                        neighbors: Err(format_scan_error(e)),
                    },
                };
                records.push(record);
            }

            frontier = next_frontier;
            depth += 1;
        }

        records
    }
}

fn format_scan_error(e: ShepherdError) -> String {
    e.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::controller::{LqiResponse, MockController};
    use crate::devbox::JsonDevBox;
    use crate::model::{Device, DeviceType};

    use super::*;

    fn ieee(n: u64) -> IeeeAddr {
        IeeeAddr(n)
    }

    fn neighbor(n: u64, nwk: u16) -> LqiNeighbor {
        LqiNeighbor {
            ieee_addr: ieee(n),
            nwk_addr: nwk,
            lqi: 200,
        }
    }

    /// `spec.md` §8 scenario 6: start has neighbours A, B (Routers); A sees
    /// neighbour C (Router); B sees the same C again (must be de-duped,
    /// keeping A's claim to it) plus D (EndDevice, never itself scanned).
    /// C's own fetch then fails, and the scan still returns every other
    /// record rather than aborting.
    #[tokio::test(flavor = "current_thread")]
    async fn fans_out_dedups_and_survives_a_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDevBox::open(dir.path().join("db.json")).unwrap();
        let coord_ieee = ieee(0);
        let (mut controller, _handle) = MockController::new(coord_ieee, 0x0000);

        controller.lqi_responses.insert(
            0x0000,
            LqiResponse {
                status: 0,
                neighbors: vec![neighbor(0xa, 0xaaaa), neighbor(0xb, 0xbbbb)],
            },
        );
        controller.lqi_responses.insert(
            0xaaaa,
            LqiResponse {
                status: 0,
                neighbors: vec![neighbor(0xc, 0xcccc)],
            },
        );
        controller.lqi_responses.insert(
            0xbbbb,
            LqiResponse {
                status: 0,
                neighbors: vec![neighbor(0xc, 0xcccc), neighbor(0xd, 0xdddd)],
            },
        );
        controller.lqi_responses.insert(
            0xcccc,
            LqiResponse {
                status: 1, // non-zero: C's own fetch fails, scan must continue past it
                neighbors: vec![],
            },
        );

        let af = crate::af::MockAfLayer::new();
        let shepherd = Shepherd::new(Box::new(store), Box::new(controller), af);
        shepherd.start(true).await.unwrap();

        // Register A, B, C as Routers and D as an EndDevice so the scan's
        // enqueue-only-Routers rule has something to act on.
        {
            let mut inner = shepherd.inner.borrow_mut();
            for (n, nwk, kind) in [
                (0xau64, 0xaaaau16, DeviceType::Router),
                (0xb, 0xbbbb, DeviceType::Router),
                (0xc, 0xcccc, DeviceType::Router),
                (0xd, 0xdddd, DeviceType::EndDevice),
            ] {
                inner.registry.register(Device::new(ieee(n), nwk, kind), 100).unwrap();
            }
        }

        let records = shepherd.lqi_scan(None, u32::MAX).await;

        let by_addr: HashMap<IeeeAddr, &ScanRecord> = records.iter().map(|r| (r.ieee_addr, r)).collect();
        assert_eq!(records.iter().filter(|r| r.ieee_addr == ieee(0xc)).count(), 1, "C is deduplicated");
        assert_eq!(by_addr[&ieee(0xc)].parent, Some(ieee(0xa)), "C keeps its first discoverer as parent");
        assert!(by_addr[&ieee(0xc)].neighbors.is_err(), "C's own fetch failed");
        assert!(by_addr[&ieee(0)].neighbors.is_ok());
        assert!(by_addr[&ieee(0xa)].neighbors.is_ok());
        assert!(by_addr[&ieee(0xb)].neighbors.is_ok());
        assert!(!by_addr.contains_key(&ieee(0xd)), "D is never scanned on its own, only seen as a neighbour");

        let b_neighbors = by_addr[&ieee(0xb)].neighbors.as_ref().unwrap();
        assert!(b_neighbors.iter().any(|n| n.ieee_addr == ieee(0xd)), "D surfaces in B's neighbour table");
    }
}
