use shepherd_derive::ZclId;

/// ZCL status codes. The Request Router (`spec.md` §4.D) checks `status==0`
/// on read/write responses; `0x86` (`UNSUPPORTED_ATTRIBUTE`) is the
/// literal failure case used in `spec.md` §8 scenario 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ZclId)]
pub enum ZclStatus {
    #[zcl(id = 0x00, name = "SUCCESS")]
    Success,
    #[zcl(id = 0x01, name = "FAILURE")]
    Failure,
    #[zcl(id = 0x7e, name = "NOT_AUTHORIZED")]
    NotAuthorized,
    #[zcl(id = 0x80, name = "MALFORMED_COMMAND")]
    MalformedCommand,
    #[zcl(id = 0x81, name = "UNSUP_CLUSTER_COMMAND")]
    UnsupClusterCommand,
    #[zcl(id = 0x86, name = "UNSUPPORTED_ATTRIBUTE")]
    UnsupportedAttribute,
    #[zcl(id = 0x87, name = "INVALID_VALUE")]
    InvalidValue,
    #[zcl(id = 0x88, name = "READ_ONLY")]
    ReadOnly,
    #[zcl(id = 0x89, name = "INSUFFICIENT_SPACE")]
    InsufficientSpace,
    #[zcl(id = 0x8a, name = "DUPLICATE_EXISTS")]
    DuplicateExists,
    #[zcl(id = 0x8b, name = "NOT_FOUND")]
    NotFound,
    #[zcl(id = 0x8c, name = "UNREPORTABLE_ATTRIBUTE")]
    UnreportableAttribute,
    #[zcl(id = 0x8d, name = "INVALID_DATA_TYPE")]
    InvalidDataType,
    #[zcl(id = 0x8e, name = "INVALID_SELECTOR")]
    InvalidSelector,
    #[zcl(id = 0x94, name = "TIMEOUT")]
    Timeout,
    #[zcl(id = 0x9a, name = "NOTIFICATION_PENDING")]
    NotificationPending,
    Unknown(u16),
}

impl ZclStatus {
    /// `true` when a foundation response with this status should have its
    /// payload trusted (`spec.md` §4.D: `on status==0 store attrData`).
    pub fn is_success(&self) -> bool {
        matches!(self, ZclStatus::Success)
    }
}
