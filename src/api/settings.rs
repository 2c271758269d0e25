//! Writing and reading inverter settings through `newTcpsetAPI.do`.

use super::{endpoint, map_api_err, post, Error, Params};
use crate::model::{self, LoggedInApi, ReadTarget};
use chrono::NaiveTime;
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameters of a setting call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingParameters {
    /// Sent as `param1`.
    Single(String),
    /// Sent as `param1..N`.
    List(Vec<String>),
    /// Sent as is.
    Named(BTreeMap<String, String>),
}

impl SettingParameters {
    pub fn into_named(self) -> BTreeMap<String, String> {
        match self {
            SettingParameters::Single(value) => BTreeMap::from([(String::from("param1"), value)]),
            SettingParameters::List(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (format!("param{}", i + 1), value))
                .collect(),
            SettingParameters::Named(map) => map,
        }
    }
}

impl From<&str> for SettingParameters {
    fn from(value: &str) -> Self {
        SettingParameters::Single(value.to_owned())
    }
}

impl From<Vec<&str>> for SettingParameters {
    fn from(values: Vec<&str>) -> Self {
        SettingParameters::List(values.into_iter().map(str::to_owned).collect())
    }
}

/// `defaults` overridden by `parameters`.
pub(crate) fn merge_parameters(
    defaults: &[(&str, &str)],
    parameters: SettingParameters,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = defaults
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    merged.extend(parameters.into_named());
    merged
}

pub(crate) fn as_params(map: &BTreeMap<String, String>) -> Params<'_> {
    map.iter().map(|(k, v)| (k.as_str(), v.to_owned())).collect()
}

/// Applies a setting; the whole parameter set travels in the query string.
pub async fn update_inverter_setting(
    api: &LoggedInApi,
    defaults: &[(&str, &str)],
    parameters: SettingParameters,
) -> Result<Value, Error> {
    let merged = merge_parameters(defaults, parameters);
    post(api, endpoint::TCP_SET, &as_params(&merged), None).await
}

pub async fn update_mix_inverter_setting(
    api: &LoggedInApi,
    serial_number: &str,
    setting_type: &str,
    parameters: SettingParameters,
) -> Result<Value, Error> {
    let defaults = [
        ("op", "mixSetApiNew"),
        ("serialNum", serial_number),
        ("type", setting_type),
    ];
    update_inverter_setting(api, &defaults, parameters).await
}

/// AC coupled (SPA) inverters.
pub async fn update_ac_inverter_setting(
    api: &LoggedInApi,
    serial_number: &str,
    setting_type: &str,
    parameters: SettingParameters,
) -> Result<Value, Error> {
    let defaults = [
        ("op", "spaSetApi"),
        ("serialNum", serial_number),
        ("type", setting_type),
    ];
    update_inverter_setting(api, &defaults, parameters).await
}

pub async fn update_tlx_inverter_setting(
    api: &LoggedInApi,
    serial_number: &str,
    setting_type: &str,
    parameters: SettingParameters,
) -> Result<Value, Error> {
    let defaults = [
        ("op", "tlxSet"),
        ("serialNum", serial_number),
        ("type", setting_type),
    ];
    update_inverter_setting(api, &defaults, parameters).await
}

/// Writes time-of-use segment `segment_id` of a TLX hybrid inverter. Fails unless the server
/// reports `success`.
pub async fn update_tlx_inverter_time_segment(
    api: &LoggedInApi,
    serial_number: &str,
    segment_id: u8,
    batt_mode: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
    enabled: bool,
) -> Result<Value, Error> {
    let form = vec![
        ("serialNum", serial_number.to_owned()),
        ("type", format!("time_segment{}", segment_id)),
        ("param1", batt_mode.to_string()),
        ("param2", start_time.format("%H").to_string()),
        ("param3", start_time.format("%M").to_string()),
        ("param4", end_time.format("%H").to_string()),
        ("param5", end_time.format("%M").to_string()),
        ("param6", String::from(if enabled { "1" } else { "0" })),
    ];
    let result = post(
        api,
        endpoint::TCP_SET,
        &vec![("op", String::from("tlxSet"))],
        Some(&form),
    )
    .await?;

    if result.get("success").and_then(Value::as_bool) != Some(true) {
        let msg = result
            .get("msg")
            .map(model::value_to_string)
            .unwrap_or_else(|| String::from("Unknown error"));
        return Err(Error::ApiError(format!(
            "Failed to update TLX inverter time segment: {}",
            msg
        )));
    }

    Ok(result)
}

/// Outcome of reading a named setting. Failures reported by the server stay in here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InverterSetting {
    pub success: bool,
    pub error_message: Option<String>,
    /// `paramN` values by `N`.
    pub params: BTreeMap<u8, String>,
}

/// Outcome of reading holding registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterRead {
    pub success: bool,
    pub error_message: Option<String>,
    pub registers: BTreeMap<u16, String>,
}

/// Raw `readParam` result: `Err(message)` when the server refused.
async fn read_param(
    api: &LoggedInApi,
    serial_number: &str,
    device_type: &str,
    target: &ReadTarget,
) -> Result<Result<Value, String>, Error> {
    let (param_id, start, end) = target.resolve()?;
    let form = vec![
        ("serialNum", serial_number.to_owned()),
        ("deviceType", device_type.to_owned()),
        ("paramId", param_id),
        ("startAddr", start.to_string()),
        ("endAddr", end.to_string()),
    ];
    log::debug!("POST {} readParam {:?}", endpoint::TCP_SET, form);

    let response = api
        .client
        .post(api.get_url(endpoint::TCP_SET))
        .query(&[("op", "readParam")])
        .form(&form)
        .send()
        .await
        .map_err(map_api_err)?;

    // The server answers 500 while the inverter does not respond in time.
    let status = response.status();
    if status.is_server_error() {
        return Ok(Err(status.to_string()));
    }

    let response_text = response
        .error_for_status()
        .map_err(map_api_err)?
        .text()
        .await
        .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))?;
    log::trace!("endpoint: {}, response_text: {}", endpoint::TCP_SET, response_text);

    let value = serde_json::from_str::<Value>(&response_text)
        .map_err(|e| Error::InvalidResponse(response_text, e.to_string()))?;

    if value.get("success").and_then(Value::as_bool) == Some(true) {
        Ok(Ok(value))
    } else {
        Ok(Err(value
            .get("msg")
            .map(model::value_to_string)
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| String::from("(no error message received)"))))
    }
}

fn obj_or_root(value: &Value) -> &Value {
    match value.get("obj") {
        Some(obj) if obj.is_object() => obj,
        _ => value,
    }
}

/// Reads a named setting (`pv_active_p_rate`...) or the registers of `target`.
pub async fn read_inverter_setting(
    api: &LoggedInApi,
    serial_number: &str,
    device_type: &str,
    target: &ReadTarget,
) -> Result<InverterSetting, Error> {
    match read_param(api, serial_number, device_type, target).await? {
        Ok(value) => {
            let params = obj_or_root(&value)
                .as_object()
                .into_iter()
                .flatten()
                .filter_map(|(key, v)| {
                    let n = key.strip_prefix("param")?.parse::<u8>().ok()?;
                    Some((n, model::value_to_string(v)))
                })
                .collect();
            Ok(InverterSetting {
                success: true,
                error_message: None,
                params,
            })
        }
        Err(message) => Ok(InverterSetting {
            success: false,
            error_message: Some(message),
            params: BTreeMap::new(),
        }),
    }
}

/// Reads holding registers `start..=end`.
pub async fn read_inverter_registers(
    api: &LoggedInApi,
    serial_number: &str,
    device_type: &str,
    start: u16,
    end: u16,
) -> Result<RegisterRead, Error> {
    let target = ReadTarget::range(start, end);
    match read_param(api, serial_number, device_type, &target).await? {
        Ok(value) => {
            let registers = obj_or_root(&value)
                .as_object()
                .into_iter()
                .flatten()
                .filter_map(|(key, v)| Some((key.parse::<u16>().ok()?, model::value_to_string(v))))
                .collect();
            Ok(RegisterRead {
                success: true,
                error_message: None,
                registers,
            })
        }
        Err(message) => Ok(RegisterRead {
            success: false,
            error_message: Some(message),
            registers: BTreeMap::new(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::testing;
    use mockito::Matcher;

    #[test]
    fn parameters_are_numbered() {
        assert_eq!(
            BTreeMap::from([(String::from("param1"), String::from("100"))]),
            SettingParameters::from("100").into_named()
        );
        let list = SettingParameters::from(vec!["1", "0"]).into_named();
        assert_eq!("1", list["param1"]);
        assert_eq!("0", list["param2"]);
    }

    #[test]
    fn parameters_override_defaults() {
        let named = SettingParameters::Named(BTreeMap::from([
            (String::from("type"), String::from("backflow_setting")),
            (String::from("param1"), String::from("1")),
        ]));
        let merged = merge_parameters(&[("op", "tlxSet"), ("type", "x")], named);
        assert_eq!("backflow_setting", merged["type"]);
        assert_eq!("tlxSet", merged["op"]);
        assert_eq!(3, merged.len());
    }

    #[tokio::test]
    async fn tlx_setting_is_sent_as_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("op".into(), "tlxSet".into()),
                Matcher::UrlEncoded("serialNum".into(), "TLX1".into()),
                Matcher::UrlEncoded("type".into(), "pv_active_p_rate".into()),
                Matcher::UrlEncoded("param1".into(), "100".into()),
                Matcher::UrlEncoded("param2".into(), "0".into()),
            ]))
            .with_body(r#"{"success": true, "msg": "inv_set_success"}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let result = update_tlx_inverter_setting(
            &api,
            "TLX1",
            "pv_active_p_rate",
            vec!["100", "0"].into(),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(true, result["success"]);
    }

    #[tokio::test]
    async fn mix_and_ac_ops() {
        let mut server = mockito::Server::new_async().await;
        let mix = server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("op".into(), "mixSetApiNew".into()),
                Matcher::UrlEncoded("param1".into(), "1".into()),
            ]))
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;
        let ac = server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::UrlEncoded("op".into(), "spaSetApi".into()))
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        update_mix_inverter_setting(&api, "MIX1", "backflow_setting", "1".into())
            .await
            .unwrap();
        update_ac_inverter_setting(&api, "SPA1", "ac_charge", "1".into())
            .await
            .unwrap();

        mix.assert_async().await;
        ac.assert_async().await;
    }

    #[tokio::test]
    async fn time_segment_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::UrlEncoded("op".into(), "tlxSet".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("serialNum".into(), "TLX1".into()),
                Matcher::UrlEncoded("type".into(), "time_segment2".into()),
                Matcher::UrlEncoded("param1".into(), "1".into()),
                Matcher::UrlEncoded("param2".into(), "07".into()),
                Matcher::UrlEncoded("param3".into(), "05".into()),
                Matcher::UrlEncoded("param4".into(), "22".into()),
                Matcher::UrlEncoded("param5".into(), "30".into()),
                Matcher::UrlEncoded("param6".into(), "1".into()),
            ]))
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let start = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        let end = NaiveTime::from_hms_opt(22, 30, 0).unwrap();
        update_tlx_inverter_time_segment(&api, "TLX1", 2, 1, start, end, true)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn time_segment_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::Any)
            .with_body(r#"{"success": false, "msg": "inv_set_fail"}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        match update_tlx_inverter_time_segment(&api, "TLX1", 1, 0, time, time, false).await {
            Err(Error::ApiError(msg)) => assert_eq!(
                "Failed to update TLX inverter time segment: inv_set_fail",
                msg
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_named_setting() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::UrlEncoded("op".into(), "readParam".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("serialNum".into(), "TLX1".into()),
                Matcher::UrlEncoded("deviceType".into(), "tlx".into()),
                Matcher::UrlEncoded("paramId".into(), "pv_active_p_rate".into()),
                Matcher::UrlEncoded("startAddr".into(), "0".into()),
                Matcher::UrlEncoded("endAddr".into(), "0".into()),
            ]))
            .with_body(r#"{"success": true, "msg": "", "obj": {"param1": "100", "param2": 0}}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let setting =
            read_inverter_setting(&api, "TLX1", "tlx", &ReadTarget::named("pv_active_p_rate"))
                .await
                .unwrap();

        mock.assert_async().await;
        assert!(setting.success);
        assert_eq!("100", setting.params[&1]);
        assert_eq!("0", setting.params[&2]);
    }

    #[tokio::test]
    async fn read_registers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::UrlEncoded("op".into(), "readParam".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("paramId".into(), "set_any_reg".into()),
                Matcher::UrlEncoded("startAddr".into(), "0".into()),
                Matcher::UrlEncoded("endAddr".into(), "2".into()),
            ]))
            .with_body(r#"{"success": true, "obj": {"0": "1", "1": "0", "2": "3000"}}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let read = read_inverter_registers(&api, "TLX1", "tlx", 0, 2).await.unwrap();

        assert!(read.success);
        assert_eq!(3, read.registers.len());
        assert_eq!("3000", read.registers[&2]);
    }

    #[tokio::test]
    async fn read_failures_stay_in_the_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::Any)
            .match_body(Matcher::UrlEncoded("startAddr".into(), "0".into()))
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("POST", "/newTcpsetAPI.do")
            .match_query(Matcher::Any)
            .match_body(Matcher::UrlEncoded("startAddr".into(), "10".into()))
            .with_body(r#"{"success": false, "msg": "device offline"}"#)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        let timeout = read_inverter_registers(&api, "TLX1", "tlx", 0, 5).await.unwrap();
        assert!(!timeout.success);
        assert!(timeout.error_message.unwrap().starts_with("500"));

        let offline = read_inverter_registers(&api, "TLX1", "tlx", 10, 12).await.unwrap();
        assert_eq!(Some(String::from("device offline")), offline.error_message);
    }
}
