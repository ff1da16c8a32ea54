//! The ZCL identifier catalog.
//!
//! `spec.md` names the ZCL identifier catalog ("cluster/attribute/command
//! names <-> numeric IDs") as an external collaborator of the Shepherd: a
//! lookup table, not Shepherd logic. This crate is that table. It mirrors
//! how the teacher crate family splits a dependency-light core (`shepherd`,
//! cf. `scpi`) from a higher-level catalog built on the core's derive macro
//! (`zcl-catalog`, cf. `scpi-contrib`).
//!
//! Every lookup here round-trips an unrecognised numeric id rather than
//! failing: `cluster(0xfdec)` still returns a `ClusterId`, just one whose
//! [`ClusterId::name`] is `None` and whose `Display` impl prints the raw
//! hex id. Callers that need the "is this id known" distinction use
//! [`cluster`]/[`attr`]/[`foundation`], which return `None` for unknown ids.

mod attributes;
mod clusters;
mod foundation;
mod status;

pub use attributes::{attr, attr_type, AttrEntry, DataType};
pub use clusters::ClusterId;
pub use foundation::FoundationCommand;
pub use status::ZclStatus;

/// Resolve a cluster id to a catalog entry, or `None` if unrecognised.
pub fn cluster(id: u16) -> Option<ClusterId> {
    let c = ClusterId::from_id(id);
    c.name().is_some().then_some(c)
}

/// Resolve a foundation command id to a catalog entry, or `None` if
/// unrecognised.
pub fn foundation(id: u16) -> Option<FoundationCommand> {
    let c = FoundationCommand::from_id(id);
    c.name().is_some().then_some(c)
}

/// Resolve a ZCL status code. Always succeeds: unknown codes come back as
/// [`ZclStatus::Unknown`], which still renders its raw value via `Display`.
pub fn status(code: u8) -> ZclStatus {
    ZclStatus::from_id(code as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_cluster_round_trips_name() {
        let c = cluster(0x0000).expect("genBasic must be known");
        assert_eq!(c.name(), Some("genBasic"));
        assert_eq!(c.id(), 0x0000);
    }

    #[test]
    fn unknown_cluster_is_none_but_from_id_keeps_the_number() {
        assert!(cluster(0xfdec).is_none());
        let raw = ClusterId::from_id(0xfdec);
        assert_eq!(raw.id(), 0xfdec);
        assert_eq!(raw.name(), None);
        assert_eq!(format!("{raw}"), "0xfdec");
    }

    #[test]
    fn status_0x86_is_unsupported_attribute() {
        let s = status(0x86);
        assert_eq!(s.name(), Some("UNSUPPORTED_ATTRIBUTE"));
    }

    #[test]
    fn attr_resolves_hw_version_on_gen_basic() {
        let entry = attr(0x0000, 0x0003).expect("hwVersion must be known on genBasic");
        assert_eq!(entry.name, "hwVersion");
        assert_eq!(entry.data_type, DataType::Uint8);
    }
}
