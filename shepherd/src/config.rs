//! Construction input (`spec.md` §6).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Serial port settings forwarded to the Controller's transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub rts_cts: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            baud_rate: 115_200,
            rts_cts: true,
        }
    }
}

/// Network/NV parameters forwarded to the Controller (`setNvParams`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetConfig {
    pub pan_id: Option<u16>,
    pub ext_pan_id: Option<u64>,
    pub channel_list: Vec<u8>,
    pub precfg_key: Option<[u8; 16]>,
}

#[derive(Debug, Clone)]
pub struct ShepherdOptions {
    pub sp: SerialSettings,
    pub net: NetConfig,
    pub db_path: PathBuf,
}

impl ShepherdOptions {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        ShepherdOptions {
            sp: SerialSettings::default(),
            net: NetConfig::default(),
            db_path: db_path.into(),
        }
    }
}
