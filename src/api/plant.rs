//! Plant level endpoints of the ShinePhone API.

use super::response::field_or;
use super::{endpoint, get, post, send, Error};
use crate::model::{self, LoggedInApi, Plant, Timespan};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Fields `updatePlant` refuses to work without, paired with their name in `plant_settings`.
const PLANT_FORM_FIELDS: [(&str, &str); 17] = [
    ("plantCoal", "formulaCoal"),
    ("plantSo2", "formulaSo2"),
    ("accountName", "userAccount"),
    ("plantID", "id"),
    ("plantCountry", "country"),
    ("plantType", "plantType"),
    ("plantIncome", "formulaMoneyStr"),
    ("plantAddress", "plantAddress"),
    ("plantTimezone", "timezone"),
    ("plantLng", "plant_lng"),
    ("plantCity", "city"),
    ("plantCo2", "formulaCo2"),
    ("plantMoney", "formulaMoneyUnitId"),
    ("plantPower", "nominalPower"),
    ("plantLat", "plant_lat"),
    ("plantDate", "createDateText"),
    ("plantName", "plantName"),
];

/// Plants connected to the account of `user_id` (the `back` object).
pub async fn plant_list(api: &LoggedInApi, user_id: &str) -> Result<Value, Error> {
    let value = get(api, endpoint::PLANT_LIST, &vec![("userId", user_id.to_owned())]).await?;
    Ok(field_or(value, "back", json!([])))
}

/// Typed view of `plant_list(...).data`.
pub async fn plants(api: &LoggedInApi) -> Result<Vec<Plant>, Error> {
    let back = plant_list(api, api.user_id()).await?;
    serde_json::from_value::<Vec<Plant>>(field_or(back, "data", json!([])))
        .or(Err(Error::UnexpectedApiResponse))
}

pub async fn plant_detail(
    api: &LoggedInApi,
    plant_id: &str,
    timespan: Timespan,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let query = vec![
        ("plantId", plant_id.to_owned()),
        ("type", timespan.value().to_string()),
        ("date", timespan.format_date(date)),
    ];
    let value = get(api, endpoint::PLANT_DETAIL, &query).await?;
    Ok(field_or(value, "back", json!({})))
}

/// All plants with detailed information (first page of 15).
pub async fn plant_list_two(api: &LoggedInApi) -> Result<Value, Error> {
    let form = vec![
        ("language", String::from("1")),
        ("nominalPower", String::new()),
        ("order", String::from("1")),
        ("pageSize", String::from("15")),
        ("plantName", String::new()),
        ("plantStatus", String::new()),
        ("toPageNum", String::from("1")),
    ];
    let value = post(
        api,
        endpoint::TWO_PLANT,
        &vec![("op", String::from("getAllPlantListTwo"))],
        Some(&form),
    )
    .await?;
    Ok(field_or(value, "PlantList", json!([])))
}

/// Basic plant information including `deviceList`.
pub async fn plant_info(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getAllDeviceListTwo")),
        ("plantId", plant_id.to_owned()),
        ("pageNum", String::from("1")),
        ("pageSize", String::from("1")),
    ];
    get(api, endpoint::TWO_PLANT, &query).await
}

pub async fn all_devices(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getAllDeviceList")),
        ("plantId", plant_id.to_owned()),
        ("language", String::from("1")),
    ];
    let value = get(api, endpoint::TWO_PLANT, &query).await?;
    Ok(field_or(value, "deviceList", json!([])))
}

/// Every device of the plant. TLX plants report an empty `deviceList` in `plant_info`, so
/// `all_devices` is asked instead.
pub async fn device_list(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let devices = field_or(plant_info(api, plant_id).await?, "deviceList", json!([]));

    match devices.as_array() {
        Some(list) if !list.is_empty() => Ok(devices),
        _ => {
            log::debug!("empty device list for plant {}, asking getAllDeviceList", plant_id);
            all_devices(api, plant_id).await
        }
    }
}

#[deprecated(note = "the list contains more than inverters, use `device_list`")]
pub async fn inverter_list(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    log::warn!("inverter_list may be removed in the future, use device_list instead");
    device_list(api, plant_id).await
}

/// Energy data shown in the "Plant" tab of the app.
pub async fn plant_energy_data(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let form = vec![("language", String::from("1")), ("plantId", plant_id.to_owned())];
    post(
        api,
        endpoint::TWO_PLANT,
        &vec![("op", String::from("getUserCenterEnertyDataByPlantid"))],
        Some(&form),
    )
    .await
}

/// Dashboard data for `timespan`. All values carry units (`"20.5kWh"`, `"45%"`). Several totals
/// are known to be wrong on MIX systems and TLX systems return nothing here; use
/// `plant_energy_data` for those.
pub async fn dashboard_data(
    api: &LoggedInApi,
    plant_id: &str,
    timespan: Timespan,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let query = vec![
        ("action", String::from("getEnergyStorageData")),
        ("date", timespan.format_date(date)),
        ("type", timespan.value().to_string()),
        ("plantId", plant_id.to_owned()),
    ];
    post(api, endpoint::PLANT, &query, None).await
}

pub async fn plant_settings(api: &LoggedInApi, plant_id: &str) -> Result<Value, Error> {
    let query = vec![("op", String::from("getPlant")), ("plantId", plant_id.to_owned())];
    get(api, endpoint::PLANT, &query).await
}

/// Builds the `updatePlant` form: every required field from `current`, then `changes` on top.
pub fn plant_settings_form(
    current: &Value,
    changes: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, Error> {
    let mut form = BTreeMap::new();

    for (field, setting) in PLANT_FORM_FIELDS.iter() {
        let value = current.get(*setting).ok_or_else(|| {
            Error::InvalidResponse(
                current.to_string(),
                format!("plant setting `{}` missing", setting),
            )
        })?;
        form.insert(field.to_string(), model::value_to_string(value));
    }
    form.insert(String::from("plantFirm"), String::from("0"));

    for (setting, value) in changes {
        form.insert(setting.to_owned(), value.to_owned());
    }

    Ok(form)
}

/// Applies `changes` (form field name to value, e.g. `plantTimezone`) to the plant. When
/// `current` is `None`, the settings are fetched first.
pub async fn update_plant_settings(
    api: &LoggedInApi,
    plant_id: &str,
    changes: &BTreeMap<String, String>,
    current: Option<&Value>,
) -> Result<Value, Error> {
    let fetched;
    let current = match current {
        Some(current) => current,
        None => {
            fetched = plant_settings(api, plant_id).await?;
            &fetched
        }
    };

    let form = plant_settings_form(current, changes)?
        .into_iter()
        .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
            form.text(name, value)
        });

    let request = api
        .client
        .post(api.get_url(endpoint::TWO_PLANT))
        .query(&[("op", "updatePlant")])
        .multipart(form);
    send(request, endpoint::TWO_PLANT).await
}
