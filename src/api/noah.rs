//! Noah balcony storage (`noahDeviceApi/noah/*`). All calls are form posts.

use super::settings::{as_params, merge_parameters, SettingParameters};
use super::{endpoint, post, Error};
use crate::model::LoggedInApi;
use serde_json::Value;

/// `obj.isPlantNoahSystem`, `obj.isPlantHaveNoah` and the `deviceSn` of the Noah.
pub async fn is_plant_noah_system(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let form = vec![("plantId", plant_id.to_owned())];
    post(api, endpoint::NOAH_IS_PLANT_NOAH_SYSTEM, &vec![], Some(&form)).await
}

/// Live values, power with units attached (`"200Watt"`).
pub async fn noah_system_status(api: &LoggedInApi, serial_number: &str) -> Result<Value, Error> {
    let form = vec![("deviceSn", serial_number.to_owned())];
    post(api, endpoint::NOAH_SYSTEM_STATUS, &vec![], Some(&form)).await
}

pub async fn noah_info(api: &LoggedInApi, serial_number: &str) -> Result<Value, Error> {
    let form = vec![("deviceSn", serial_number.to_owned())];
    post(api, endpoint::NOAH_INFO, &vec![], Some(&form)).await
}

pub async fn update_noah_settings(
    api: &LoggedInApi,
    serial_number: &str,
    setting_type: &str,
    parameters: SettingParameters,
) -> Result<Value, Error> {
    let defaults = [("serialNum", serial_number), ("type", setting_type)];
    let merged = merge_parameters(&defaults, parameters);
    post(api, endpoint::NOAH_SET, &vec![], Some(&as_params(&merged))).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::testing;
    use mockito::Matcher;

    #[tokio::test]
    async fn noah_status_by_serial() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/noahDeviceApi/noah/getSystemStatus")
            .match_query(Matcher::Any)
            .match_body(Matcher::UrlEncoded("deviceSn".into(), "NOAH1".into()))
            .with_body(r#"{"result": 1, "obj": {"soc": "80", "ppv": "200Watt"}}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let status = noah_system_status(&api, "NOAH1").await.unwrap();

        mock.assert_async().await;
        assert_eq!("80", status["obj"]["soc"]);
    }

    #[tokio::test]
    async fn noah_settings_are_a_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/noahDeviceApi/noah/set")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("serialNum".into(), "NOAH1".into()),
                Matcher::UrlEncoded("type".into(), "default_power".into()),
                Matcher::UrlEncoded("param1".into(), "150".into()),
            ]))
            .with_body(r#"{"result": 1}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        update_noah_settings(&api, "NOAH1", "default_power", vec!["150"].into())
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
