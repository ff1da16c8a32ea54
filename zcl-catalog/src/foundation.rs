use shepherd_derive::ZclId;

/// ZCL foundation (generic) command identifiers. These are the commands
/// the Request Router's "Foundation" path issues (`spec.md` §4.D): `read`,
/// `write`, `writeUndiv`, `writeNoRsp`, `configReport`, discovery, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, ZclId)]
pub enum FoundationCommand {
    #[zcl(id = 0x00, name = "read")]
    Read,
    #[zcl(id = 0x01, name = "readRsp")]
    ReadRsp,
    #[zcl(id = 0x02, name = "write")]
    Write,
    #[zcl(id = 0x03, name = "writeUndiv")]
    WriteUndiv,
    #[zcl(id = 0x04, name = "writeRsp")]
    WriteRsp,
    #[zcl(id = 0x05, name = "writeNoRsp")]
    WriteNoRsp,
    #[zcl(id = 0x06, name = "configReport")]
    ConfigReport,
    #[zcl(id = 0x07, name = "configReportRsp")]
    ConfigReportRsp,
    #[zcl(id = 0x08, name = "readReportConfig")]
    ReadReportConfig,
    #[zcl(id = 0x09, name = "readReportConfigRsp")]
    ReadReportConfigRsp,
    #[zcl(id = 0x0a, name = "reportAttr")]
    ReportAttr,
    #[zcl(id = 0x0b, name = "defaultRsp")]
    DefaultRsp,
    #[zcl(id = 0x0c, name = "discover")]
    Discover,
    #[zcl(id = 0x0d, name = "discoverRsp")]
    DiscoverRsp,
    Unknown(u16),
}
