use shepherd_derive::ZclId;

/// ZCL attribute data types, as carried in a foundation `read`/`write`
/// record's `dataType` field (`spec.md` §4.D, §8 scenario 3: `dataType:
/// 0x21` is `Uint16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ZclId)]
pub enum DataType {
    #[zcl(id = 0x10, name = "bool")]
    Bool,
    #[zcl(id = 0x18, name = "bitmap8")]
    Bitmap8,
    #[zcl(id = 0x19, name = "bitmap16")]
    Bitmap16,
    #[zcl(id = 0x20, name = "uint8")]
    Uint8,
    #[zcl(id = 0x21, name = "uint16")]
    Uint16,
    #[zcl(id = 0x22, name = "uint24")]
    Uint24,
    #[zcl(id = 0x23, name = "uint32")]
    Uint32,
    #[zcl(id = 0x28, name = "int8")]
    Int8,
    #[zcl(id = 0x29, name = "int16")]
    Int16,
    #[zcl(id = 0x2b, name = "int32")]
    Int32,
    #[zcl(id = 0x30, name = "enum8")]
    Enum8,
    #[zcl(id = 0x31, name = "enum16")]
    Enum16,
    #[zcl(id = 0x39, name = "floatSingle")]
    FloatSingle,
    #[zcl(id = 0x41, name = "octStr")]
    OctStr,
    #[zcl(id = 0x42, name = "charStr")]
    CharStr,
    #[zcl(id = 0xe0, name = "dateTime")]
    DateTime,
    #[zcl(id = 0xe8, name = "clusterId")]
    ClusterIdType,
    #[zcl(id = 0xf0, name = "ieeeAddr")]
    IeeeAddr,
    #[zcl(id = 0xf1, name = "secKey")]
    SecKey,
    Unknown(u16),
}

/// A resolved attribute: its catalog name and declared data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrEntry {
    pub name: &'static str,
    pub data_type: DataType,
}

macro_rules! attr_table {
    ($($cluster:expr => { $($id:expr => ($name:expr, $ty:expr)),* $(,)? }),* $(,)?) => {
        &[
            $(
                $(
                    ($cluster, $id, $name, $ty)
                ),*
            ),*
        ]
    };
}

#[allow(clippy::type_complexity)]
static ATTRS: &[(u16, u16, &str, DataType)] = attr_table! {
    0x0000 => {
        0x0000 => ("zclVersion", DataType::Uint8),
        0x0001 => ("appVersion", DataType::Uint8),
        0x0002 => ("stackVersion", DataType::Uint8),
        0x0003 => ("hwVersion", DataType::Uint8),
        0x0004 => ("manufacturerName", DataType::CharStr),
        0x0005 => ("modelId", DataType::CharStr),
        0x0006 => ("dateCode", DataType::CharStr),
        0x0007 => ("powerSource", DataType::Enum8),
        0x4000 => ("swBuildId", DataType::CharStr),
    },
    0x0001 => {
        0x0020 => ("batteryVoltage", DataType::Uint8),
        0x0021 => ("batteryPercentageRemaining", DataType::Uint8),
    },
    0x0003 => {
        0x0000 => ("identifyTime", DataType::Uint16),
    },
    0x0006 => {
        0x0000 => ("onOff", DataType::Bool),
        0x4000 => ("globalSceneCtrl", DataType::Bool),
        0x4001 => ("onTime", DataType::Uint16),
        0x4002 => ("offWaitTime", DataType::Uint16),
    },
    0x0008 => {
        0x0000 => ("currentLevel", DataType::Uint8),
        0x0010 => ("onOffTransitionTime", DataType::Uint16),
    },
    0x0402 => {
        0x0000 => ("measuredValue", DataType::Int16),
        0x0001 => ("minMeasuredValue", DataType::Int16),
        0x0002 => ("maxMeasuredValue", DataType::Int16),
    },
    0x0405 => {
        0x0000 => ("measuredValue", DataType::Uint16),
    },
    0x0500 => {
        0x0000 => ("zoneState", DataType::Enum8),
        0x0001 => ("zoneType", DataType::Enum16),
        0x0002 => ("zoneStatus", DataType::Bitmap16),
    },
};

/// Resolve an attribute name + data type on a cluster, or `None` if the
/// catalog does not know it (`spec.md` §4.D: "names resolved via the
/// catalog; unknown id -> numeric").
pub fn attr(cluster_id: u16, attr_id: u16) -> Option<AttrEntry> {
    ATTRS
        .iter()
        .find(|(c, a, _, _)| *c == cluster_id && *a == attr_id)
        .map(|(_, _, name, ty)| AttrEntry {
            name,
            data_type: *ty,
        })
}

/// Resolve only the declared data type of an attribute.
pub fn attr_type(cluster_id: u16, attr_id: u16) -> Option<DataType> {
    attr(cluster_id, attr_id).map(|e| e.data_type)
}
