use crate::model::DeviceType;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub device_sn: String,
    pub device_id: Option<u64>,
    pub datalogger_sn: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub last_update_time: Option<String>,
    pub lost: Option<bool>,
    pub status: Option<i64>,
    #[serde(rename = "type")]
    pub type_id: u64,
}

impl Device {
    pub fn device_type(&self) -> Option<DeviceType> {
        DeviceType::from_id(self.type_id)
    }
}

/// `data` of `v1/device/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plant {
    pub plant_id: u64,
    pub name: Option<String>,
    pub city: Option<String>,
    pub peak_power: Option<f64>,
    pub status: Option<i64>,
}

/// `data` of `v1/plant/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub plants: Vec<Plant>,
}
