//! Plain inverter and storage endpoints.

use super::response::field_or;
use super::{endpoint, get, post, Error};
use crate::model::{LoggedInApi, Timespan};
use chrono::NaiveDate;
use serde_json::{json, Value};

/// Inverter chart data. Only the day view is supported by the endpoint.
pub async fn inverter_data(
    api: &LoggedInApi,
    inverter_id: &str,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getInverterData")),
        ("id", inverter_id.to_owned()),
        ("type", Timespan::Day.value().to_string()),
        ("date", Timespan::Day.format_date(date)),
    ];
    get(api, endpoint::INVERTER, &query).await
}

pub async fn inverter_detail(api: &LoggedInApi, inverter_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getInverterDetailData")),
        ("inverterId", inverter_id.to_owned()),
    ];
    get(api, endpoint::INVERTER, &query).await
}

pub async fn inverter_detail_two(api: &LoggedInApi, inverter_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getInverterDetailData_two")),
        ("inverterId", inverter_id.to_owned()),
    ];
    get(api, endpoint::INVERTER, &query).await
}

pub async fn storage_detail(api: &LoggedInApi, storage_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getStorageInfo_sacolar")),
        ("storageId", storage_id.to_owned()),
    ];
    get(api, endpoint::STORAGE, &query).await
}

pub async fn storage_params(api: &LoggedInApi, storage_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getStorageParams_sacolar")),
        ("storageId", storage_id.to_owned()),
    ];
    get(api, endpoint::STORAGE, &query).await
}

/// Energy overview of a storage device (the `obj` of the response).
pub async fn storage_energy_overview(
    api: &LoggedInApi,
    plant_id: &str,
    storage_id: &str,
) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getEnergyOverviewData_sacolar")),
        ("plantId", plant_id.to_owned()),
        ("storageSn", storage_id.to_owned()),
    ];
    let value = post(api, endpoint::STORAGE, &query, None).await?;
    Ok(field_or(value, "obj", json!({})))
}
