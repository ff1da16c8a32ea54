//! The AF layer: the ZCL/ZDO frame builder external collaborator
//! (`spec.md` §6). `shepherd` depends only on [`AfLayer`]; callers supply
//! a real implementation that talks to the radio, or (in tests and the
//! bundled gateway) [`crate::controller::MockController`]'s paired AF
//! implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Destination of a foundation/functional request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointAddr {
    pub nwk_addr: u16,
    pub ep_id: u8,
}

/// One attribute record returned by a foundation `read`/`write` response.
#[derive(Debug, Clone)]
pub struct AttrRecord {
    pub attr_id: u16,
    pub status: u8,
    pub data_type: Option<u16>,
    pub attr_data: Value,
}

#[derive(Debug, Clone)]
pub struct WriteAttrRecord {
    pub attr_id: u16,
    pub data_type: u16,
    pub attr_data: Value,
}

#[derive(Debug, Clone)]
pub struct ReportConfigRecord {
    pub direction: u8,
    pub attr_id: u16,
    pub data_type: u16,
    pub min_repintval: u16,
    pub max_repintval: u16,
    pub rep_change: Option<Value>,
}

/// A ZCL foundation (generic) command (`spec.md` §4.D).
#[derive(Debug, Clone)]
pub enum FoundationCmd {
    Read(Vec<u16>),
    Write(Vec<WriteAttrRecord>),
    WriteUndiv(Vec<WriteAttrRecord>),
    WriteNoRsp(Vec<WriteAttrRecord>),
    ConfigReport(Vec<ReportConfigRecord>),
    Discover { start_attr_id: u16, max: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct FoundationResponse {
    pub records: Vec<AttrRecord>,
}

/// A ZCL functional (cluster-specific) command.
#[derive(Debug, Clone)]
pub struct FunctionalCmd {
    pub cmd_id: u8,
    pub payload: Value,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionalResponse {
    pub payload: Value,
}

/// Per-request options. `skip_finalize` mirrors `spec.md` §4.D's
/// `skipFinalize` config option for functional commands (default `true`:
/// do not refresh the cluster cache after a functional command).
#[derive(Debug, Clone, Copy)]
pub struct RequestConfig {
    pub skip_finalize: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig { skip_finalize: true }
    }
}

#[async_trait(?Send)]
pub trait AfLayer {
    async fn zcl_foundation(
        &self,
        src_ep: u8,
        dst: EndpointAddr,
        cluster_id: u16,
        cmd: FoundationCmd,
        cfg: RequestConfig,
    ) -> Result<FoundationResponse>;

    async fn zcl_functional(
        &self,
        src_ep: u8,
        dst: EndpointAddr,
        cluster_id: u16,
        cmd: FunctionalCmd,
        cfg: RequestConfig,
    ) -> Result<FunctionalResponse>;

    /// Used by the write-then-requery cache refresh path (`spec.md`
    /// §4.D): queries the full current attribute snapshot of a cluster.
    async fn zcl_cluster_attrs_req(
        &self,
        dst: EndpointAddr,
        cluster_id: u16,
    ) -> Result<HashMap<String, Value>>;
}

/// An in-process stand-in frame builder paired with
/// [`crate::controller::MockController`]: reads/writes land in an
/// in-memory per-`(nwkAddr, clusterId)` attribute table instead of going
/// over the air.
#[derive(Debug, Default)]
pub struct MockAfLayer {
    attrs: std::cell::RefCell<HashMap<(u16, u16), HashMap<String, Value>>>,
}

/// Catalog name for an attribute, falling back to its numeric id --
/// mirrors the Request Router's own `attr_key` so a mock seeded by name
/// (`"hwVersion"`) and a live lookup by id agree on the same key.
fn attr_name(cluster_id: u16, attr_id: u16) -> String {
    zcl_catalog::attr(cluster_id, attr_id)
        .map(|e| e.name.to_string())
        .unwrap_or_else(|| attr_id.to_string())
}

impl MockAfLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite the attribute table for `(nwkAddr, clusterId)`,
    /// as if a real device had those values.
    pub fn seed(&self, nwk_addr: u16, cluster_id: u16, attrs: HashMap<String, Value>) {
        self.attrs.borrow_mut().insert((nwk_addr, cluster_id), attrs);
    }
}

#[async_trait(?Send)]
impl AfLayer for MockAfLayer {
    async fn zcl_foundation(
        &self,
        _src_ep: u8,
        dst: EndpointAddr,
        cluster_id: u16,
        cmd: FoundationCmd,
        _cfg: RequestConfig,
    ) -> Result<FoundationResponse> {
        let key = (dst.nwk_addr, cluster_id);
        match cmd {
            FoundationCmd::Read(attr_ids) => {
                let table = self.attrs.borrow();
                let known = table.get(&key);
                let records = attr_ids
                    .into_iter()
                    .map(|attr_id| match known.and_then(|t| t.get(&attr_name(cluster_id, attr_id))) {
                        Some(v) => AttrRecord {
                            attr_id,
                            status: 0,
                            data_type: None,
                            attr_data: v.clone(),
                        },
                        None => AttrRecord {
                            attr_id,
                            status: 0x86, // UNSUPPORTED_ATTRIBUTE
                            data_type: None,
                            attr_data: Value::Null,
                        },
                    })
                    .collect();
                Ok(FoundationResponse { records })
            }
            FoundationCmd::Write(records) | FoundationCmd::WriteUndiv(records) | FoundationCmd::WriteNoRsp(records) => {
                let mut table = self.attrs.borrow_mut();
                let entry = table.entry(key).or_default();
                let mut resp_records = Vec::with_capacity(records.len());
                for rec in records {
                    entry.insert(attr_name(cluster_id, rec.attr_id), rec.attr_data);
                    resp_records.push(AttrRecord {
                        attr_id: rec.attr_id,
                        status: 0,
                        data_type: None,
                        attr_data: Value::Null,
                    });
                }
                Ok(FoundationResponse { records: resp_records })
            }
            FoundationCmd::ConfigReport(_) | FoundationCmd::Discover { .. } => Ok(FoundationResponse::default()),
        }
    }

    async fn zcl_functional(
        &self,
        _src_ep: u8,
        _dst: EndpointAddr,
        _cluster_id: u16,
        _cmd: FunctionalCmd,
        _cfg: RequestConfig,
    ) -> Result<FunctionalResponse> {
        Ok(FunctionalResponse::default())
    }

    async fn zcl_cluster_attrs_req(
        &self,
        dst: EndpointAddr,
        cluster_id: u16,
    ) -> Result<HashMap<String, Value>> {
        Ok(self
            .attrs
            .borrow()
            .get(&(dst.nwk_addr, cluster_id))
            .cloned()
            .unwrap_or_default())
    }
}

/// Lets a shared handle (as returned by tests holding onto a
/// [`MockAfLayer`] for seeding after construction) be passed anywhere an
/// `AfLayer` is expected, including straight into [`crate::Shepherd::new`].
#[async_trait(?Send)]
impl<T: AfLayer + ?Sized> AfLayer for std::rc::Rc<T> {
    async fn zcl_foundation(
        &self,
        src_ep: u8,
        dst: EndpointAddr,
        cluster_id: u16,
        cmd: FoundationCmd,
        cfg: RequestConfig,
    ) -> Result<FoundationResponse> {
        (**self).zcl_foundation(src_ep, dst, cluster_id, cmd, cfg).await
    }

    async fn zcl_functional(
        &self,
        src_ep: u8,
        dst: EndpointAddr,
        cluster_id: u16,
        cmd: FunctionalCmd,
        cfg: RequestConfig,
    ) -> Result<FunctionalResponse> {
        (**self).zcl_functional(src_ep, dst, cluster_id, cmd, cfg).await
    }

    async fn zcl_cluster_attrs_req(
        &self,
        dst: EndpointAddr,
        cluster_id: u16,
    ) -> Result<HashMap<String, Value>> {
        (**self).zcl_cluster_attrs_req(dst, cluster_id).await
    }
}
