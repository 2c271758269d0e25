pub type Endpoint = str;

pub const LOGIN: &Endpoint = "newTwoLoginAPI.do";
pub const PLANT_LIST: &Endpoint = "PlantListAPI.do";
pub const PLANT_DETAIL: &Endpoint = "PlantDetailAPI.do";
pub const TWO_PLANT: &Endpoint = "newTwoPlantAPI.do";
pub const PLANT: &Endpoint = "newPlantAPI.do";
pub const INVERTER: &Endpoint = "newInverterAPI.do";
pub const TLX: &Endpoint = "newTlxApi.do";
pub const LOGIN_API: &Endpoint = "newLoginAPI.do";
pub const MIX: &Endpoint = "newMixApi.do";
pub const STORAGE: &Endpoint = "newStorageAPI.do";
pub const TCP_SET: &Endpoint = "newTcpsetAPI.do";
pub const NOAH_IS_PLANT_NOAH_SYSTEM: &Endpoint = "noahDeviceApi/noah/isPlantNoahSystem";
pub const NOAH_SYSTEM_STATUS: &Endpoint = "noahDeviceApi/noah/getSystemStatus";
pub const NOAH_INFO: &Endpoint = "noahDeviceApi/noah/getNoahInfoBySn";
pub const NOAH_SET: &Endpoint = "noahDeviceApi/noah/set";

/// Pages below `<server_url>v1/`.
pub mod v1 {
    use super::Endpoint;

    pub const PLANT_LIST: &Endpoint = "plant/list";
    pub const PLANT_DETAILS: &Endpoint = "plant/details";
    pub const PLANT_DATA: &Endpoint = "plant/data";
    pub const PLANT_POWER: &Endpoint = "plant/power";
    pub const PLANT_ENERGY: &Endpoint = "plant/energy";
    pub const DEVICE_LIST: &Endpoint = "device/list";

    pub const MIN_DATA_INFO: &Endpoint = "device/tlx/tlx_data_info";
    pub const MIN_LAST_DATA: &Endpoint = "device/tlx/tlx_last_data";
    pub const MIN_DATA: &Endpoint = "device/tlx/tlx_data";
    pub const MIN_SET_INFO: &Endpoint = "device/tlx/tlx_set_info";
    pub const MIN_READ_PARAM: &Endpoint = "readMinParam";
    pub const MIN_SET: &Endpoint = "tlxSet";

    pub const SPH_DATA_INFO: &Endpoint = "device/mix/mix_data_info";
    pub const SPH_LAST_DATA: &Endpoint = "device/mix/mix_last_data";
    pub const SPH_DATA: &Endpoint = "device/mix/mix_data";
    pub const SPH_READ_PARAM: &Endpoint = "readMixParam";
    pub const SPH_SET: &Endpoint = "mixSet";
}
