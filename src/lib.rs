pub mod api;
pub mod dashboard;
pub mod model;
pub mod registers;
pub mod v1;

pub use api::{api, hash_password, login, Error};

use model::V1Api;
use serde_json::Value;
use std::collections::BTreeMap;

/*
Dump devices

Iterate through all plants and all devices within those plants, collecting the raw V1 device
records keyed by serial number. Devices without V1 support are included as listed.
*/

pub async fn dump_devices(api: &V1Api) -> Result<BTreeMap<String, Value>, Error> {
    let plants = v1::plants(api).await?;
    let mut dump: BTreeMap<String, Value> = BTreeMap::new();

    for plant in plants.plants {
        match v1::device_list(api, plant.plant_id).await {
            Ok(devices) => {
                for device in devices.devices {
                    let detail = match v1::get_device(api, &device.device_sn, device.type_id) {
                        Some(supported) => supported.detail().await.unwrap_or_else(|e| {
                            log::warn!("No detail returned for device {}: {}", device.device_sn, e);
                            Value::Null
                        }),
                        None => Value::Null,
                    };

                    let mut entry = serde_json::Map::new();
                    entry.insert("plant_id".to_string(), Value::from(plant.plant_id));
                    entry.insert("type".to_string(), Value::from(device.type_id));
                    entry.insert("detail".to_string(), detail);
                    dump.insert(device.device_sn, Value::Object(entry));
                }
            }
            Err(e) => log::error!("Unable to list devices of plant {}: {}", plant.plant_id, e),
        }
    }

    Ok(dump)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::testing::read_resource;
    use mockito::Matcher;

    #[tokio::test]
    async fn dump_devices_walks_plants() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/plant/list")
            .match_query(Matcher::Any)
            .with_body(
                r#"{"error_code": 0, "data": {"count": 1, "plants": [{"plant_id": 42, "name": "Home"}]}}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/v1/device/list")
            .match_query(Matcher::UrlEncoded("plant_id".into(), "42".into()))
            .with_body(read_resource("v1_deviceList.json"))
            .create_async()
            .await;
        let min = server
            .mock("GET", "/v1/device/tlx/tlx_data_info")
            .match_query(Matcher::UrlEncoded("device_sn".into(), "ZT00100001".into()))
            .with_body(r#"{"error_code": 0, "data": {"serialNum": "ZT00100001"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/device/mix/mix_data_info")
            .match_query(Matcher::UrlEncoded("device_sn".into(), "ZT00100002".into()))
            .with_body(r#"{"error_code": 10012, "error_msg": "error_permission_denied"}"#)
            .create_async()
            .await;

        let api = v1::testing::api(&server);
        let dump = dump_devices(&api).await.unwrap();

        min.assert_async().await;
        assert_eq!(2, dump.len());
        assert_eq!("ZT00100001", dump["ZT00100001"]["detail"]["serialNum"]);
        assert_eq!(42, dump["ZT00100001"]["plant_id"]);
        assert_eq!(Value::Null, dump["ZT00100002"]["detail"]);
    }
}
