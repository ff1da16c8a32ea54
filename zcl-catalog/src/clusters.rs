use shepherd_derive::ZclId;

/// ZCL cluster identifiers. Names follow the Zigbee Cluster Library naming
/// convention (`genBasic`, `genOnOff`, ...) so they line up directly with
/// the names the Request Router stores in a cluster cache (`spec.md`
/// §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ZclId)]
pub enum ClusterId {
    #[zcl(id = 0x0000, name = "genBasic")]
    GenBasic,
    #[zcl(id = 0x0001, name = "genPowerCfg")]
    GenPowerCfg,
    #[zcl(id = 0x0002, name = "genDeviceTempCfg")]
    GenDeviceTempCfg,
    #[zcl(id = 0x0003, name = "genIdentify")]
    GenIdentify,
    #[zcl(id = 0x0004, name = "genGroups")]
    GenGroups,
    #[zcl(id = 0x0005, name = "genScenes")]
    GenScenes,
    #[zcl(id = 0x0006, name = "genOnOff")]
    GenOnOff,
    #[zcl(id = 0x0008, name = "genLevelCtrl")]
    GenLevelCtrl,
    #[zcl(id = 0x0009, name = "genAlarms")]
    GenAlarms,
    #[zcl(id = 0x000a, name = "genTime")]
    GenTime,
    #[zcl(id = 0x0019, name = "genOta")]
    GenOta,
    #[zcl(id = 0x0101, name = "closuresDoorLock")]
    ClosuresDoorLock,
    #[zcl(id = 0x0201, name = "hvacThermostat")]
    HvacThermostat,
    #[zcl(id = 0x0300, name = "lightingColorCtrl")]
    LightingColorCtrl,
    #[zcl(id = 0x0400, name = "msIlluminanceMeasurement")]
    MsIlluminanceMeasurement,
    #[zcl(id = 0x0402, name = "msTemperatureMeasurement")]
    MsTemperatureMeasurement,
    #[zcl(id = 0x0405, name = "msRelativeHumidity")]
    MsRelativeHumidity,
    #[zcl(id = 0x0406, name = "msOccupancySensing")]
    MsOccupancySensing,
    #[zcl(id = 0x0500, name = "ssIasZone")]
    SsIasZone,
    #[zcl(id = 0x0b04, name = "haElectricalMeasurement")]
    HaElectricalMeasurement,
    #[zcl(id = 0x1000, name = "touchlink")]
    Touchlink,
    Unknown(u16),
}
