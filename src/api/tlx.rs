//! TLX / MIN hybrid inverters (`newTlxApi.do`).

use super::response::field_or;
use super::{endpoint, get, post, Error, Params};
use crate::model::{self, LoggedInApi, PowerFlow, Timespan};
use chrono::NaiveDate;
use serde_json::{json, Value};

async fn post_obj(api: &LoggedInApi, op: &str, form: &Params<'_>) -> Result<Value, Error> {
    let value = post(api, endpoint::TLX, &vec![("op", op.to_owned())], Some(form)).await?;
    Ok(field_or(value, "obj", json!({})))
}

/// Current system status, power values in kW.
pub async fn tlx_system_status(
    api: &LoggedInApi,
    plant_id: &str,
    tlx_id: &str,
) -> Result<Value, Error> {
    let form = vec![("plantId", plant_id.to_owned()), ("id", tlx_id.to_owned())];
    post_obj(api, "getSystemStatus_KW", &form).await
}

/// [`tlx_system_status`] as numbers, in watts.
pub async fn tlx_system_status_watts(
    api: &LoggedInApi,
    plant_id: &str,
    tlx_id: &str,
) -> Result<PowerFlow, Error> {
    let status = tlx_system_status(api, plant_id, tlx_id).await?;
    Ok(PowerFlow::from_system_status(&status))
}

pub async fn tlx_energy_overview(
    api: &LoggedInApi,
    plant_id: &str,
    tlx_id: &str,
) -> Result<Value, Error> {
    let form = vec![("plantId", plant_id.to_owned()), ("id", tlx_id.to_owned())];
    post_obj(api, "getEnergyOverview", &form).await
}

/// Production and consumption chart for `timespan`, in kW.
pub async fn tlx_energy_prod_cons(
    api: &LoggedInApi,
    plant_id: &str,
    tlx_id: &str,
    timespan: Timespan,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let form = vec![
        ("date", timespan.format_date(date)),
        ("plantId", plant_id.to_owned()),
        ("language", String::from("1")),
        ("id", tlx_id.to_owned()),
        ("type", timespan.value().to_string()),
    ];
    post_obj(api, "getEnergyProdAndCons_KW", &form).await
}

pub async fn tlx_data(
    api: &LoggedInApi,
    tlx_id: &str,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getTlxData")),
        ("id", tlx_id.to_owned()),
        ("type", String::from("1")),
        ("date", Timespan::Day.format_date(date)),
    ];
    get(api, endpoint::TLX, &query).await
}

pub async fn tlx_detail(api: &LoggedInApi, tlx_id: &str) -> Result<Value, Error> {
    let query = vec![("op", String::from("getTlxDetailData")), ("id", tlx_id.to_owned())];
    get(api, endpoint::TLX, &query).await
}

pub async fn tlx_params(api: &LoggedInApi, tlx_id: &str) -> Result<Value, Error> {
    let query = vec![("op", String::from("getTlxParams")), ("id", tlx_id.to_owned())];
    get(api, endpoint::TLX, &query).await
}

/// Every setting the inverter knows about (`obj.tlxSetBean`, `null` when absent).
pub async fn tlx_all_settings(api: &LoggedInApi, tlx_id: &str) -> Result<Value, Error> {
    let obj = post_obj(api, "getTlxSetData", &vec![("serialNum", tlx_id.to_owned())]).await?;
    Ok(field_or(obj, "tlxSetBean", Value::Null))
}

/// Settings enabled for the logged in user.
pub async fn tlx_enabled_settings(api: &LoggedInApi, tlx_id: &str) -> Result<Value, Error> {
    let form = vec![
        ("deviceSn", tlx_id.to_owned()),
        ("stringTime", Timespan::Day.format_date(Some(model::today()))),
        ("type", String::from("5")),
    ];
    let value = post(
        api,
        endpoint::LOGIN_API,
        &vec![("op", String::from("getSetPass"))],
        Some(&form),
    )
    .await?;
    Ok(field_or(value, "obj", json!({})))
}

pub async fn tlx_battery_info(api: &LoggedInApi, serial_num: &str) -> Result<Value, Error> {
    let form = vec![("lan", String::from("1")), ("serialNum", serial_num.to_owned())];
    post_obj(api, "getBatInfo", &form).await
}

/// Whole response, not just `obj`.
pub async fn tlx_battery_info_detailed(
    api: &LoggedInApi,
    plant_id: &str,
    serial_num: &str,
) -> Result<Value, Error> {
    let form = vec![
        ("lan", String::from("1")),
        ("plantId", plant_id.to_owned()),
        ("id", serial_num.to_owned()),
    ];
    post(
        api,
        endpoint::TLX,
        &vec![("op", String::from("getBatDetailData"))],
        Some(&form),
    )
    .await
}
