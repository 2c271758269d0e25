//! OpenAPI V1: token authenticated, every response wrapped in
//! `{"error_code": .., "error_msg": .., "data": ..}`.

pub mod min;
pub mod sph;
pub mod time;

use crate::api::endpoint::{self, v1 as page};
use crate::api::response::v1::{DeviceList, PlantList};
use crate::api::{send, Error, Params};
use crate::model::{self, PeriodSetting, ReadTarget, V1Api};
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::header;
use serde_json::Value;
use std::collections::BTreeMap;

pub use min::Min;
pub use sph::Sph;

const MAX_HISTORY_DAYS: i64 = 7;
const MAX_HISTORY_YEARS: i32 = 20;

pub fn user_agent() -> String {
    format!(
        "Rust/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

pub fn api(token: &str) -> Result<V1Api, Error> {
    api_with_url(model::SERVER_URL, token)
}

/// `server_url` is the classic base url; pages live below `<server_url>v1/`.
pub fn api_with_url(server_url: &str, token: &str) -> Result<V1Api, Error> {
    let mut headers = header::HeaderMap::new();
    let token = header::HeaderValue::from_str(token)
        .map_err(|e| Error::ParameterError(format!("invalid token: {}", e)))?;
    headers.insert("token", token);

    let client = reqwest::ClientBuilder::new()
        .user_agent(user_agent())
        .default_headers(headers)
        .build()
        .or(Err(Error::InternalError))?;

    Ok(V1Api {
        api_url: format!("{}v1/", server_url),
        client,
    })
}

/// Unwraps `data`, failing unless `error_code` is present and zero.
pub fn process_response(mut response: Value, operation: &str) -> Result<Value, Error> {
    let error_code = response.get("error_code").and_then(Value::as_i64);
    if error_code != Some(0) {
        let error_msg = response
            .get("error_msg")
            .map(model::value_to_string)
            .unwrap_or_else(|| String::from("Unknown error"));
        return Err(Error::V1ApiError {
            operation: operation.to_owned(),
            error_code,
            error_msg,
        });
    }
    Ok(response
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

pub(crate) async fn get(
    api: &V1Api,
    page: &endpoint::Endpoint,
    query: &Params<'_>,
    operation: &str,
) -> Result<Value, Error> {
    log::debug!("GET v1/{} {:?}", page, query);
    let response = send(api.client.get(api.get_url(page)).query(query), page).await?;
    process_response(response, operation)
}

pub(crate) async fn post(
    api: &V1Api,
    page: &endpoint::Endpoint,
    form: &Params<'_>,
    operation: &str,
) -> Result<Value, Error> {
    log::debug!("POST v1/{} {:?}", page, form);
    let response = send(api.client.post(api.get_url(page)).form(form), page).await?;
    process_response(response, operation)
}

/// Values for `param1..paramN` of a write call. Unset positions are sent empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValues {
    None,
    Single(String),
    List(Vec<String>),
    /// 1 based positions; positions past the device maximum are ignored.
    Positional(BTreeMap<usize, String>),
}

impl ParameterValues {
    pub(crate) fn expand(&self, max: usize) -> Vec<String> {
        let mut params = vec![String::new(); max];
        match self {
            ParameterValues::None => {}
            ParameterValues::Single(value) => {
                if let Some(first) = params.first_mut() {
                    *first = value.to_owned();
                }
            }
            ParameterValues::List(values) => {
                for (param, value) in params.iter_mut().zip(values) {
                    *param = value.to_owned();
                }
            }
            ParameterValues::Positional(values) => {
                for (&position, value) in values {
                    if (1..=max).contains(&position) {
                        params[position - 1] = value.to_owned();
                    }
                }
            }
        }
        params
    }
}

impl From<&str> for ParameterValues {
    fn from(value: &str) -> Self {
        ParameterValues::Single(value.to_owned())
    }
}

impl From<Vec<&str>> for ParameterValues {
    fn from(values: Vec<&str>) -> Self {
        ParameterValues::List(values.into_iter().map(str::to_owned).collect())
    }
}

/// Form of a `tlxSet` / `mixSet` call with every `paramN` present.
pub(crate) fn write_form(
    sn_field: &str,
    device_sn: &str,
    setting_type: &str,
    values: &[String],
) -> Vec<(String, String)> {
    let mut form = vec![
        (sn_field.to_owned(), device_sn.to_owned()),
        (String::from("type"), setting_type.to_owned()),
    ];
    form.extend(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("param{}", i + 1), v.to_owned())),
    );
    form
}

pub(crate) async fn post_owned(
    api: &V1Api,
    page: &endpoint::Endpoint,
    form: &[(String, String)],
    operation: &str,
) -> Result<Value, Error> {
    let form: Params = form.iter().map(|(k, v)| (k.as_str(), v.to_owned())).collect();
    post(api, page, &form, operation).await
}

/// Missing dates default to each other, both to today (UTC).
pub fn resolve_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(date), None) | (None, Some(date)) => (date, date),
        (None, None) => {
            let today = Utc::now().date_naive();
            (today, today)
        }
    }
}

/// Device histories are limited to a week.
pub(crate) fn check_history_interval(start: NaiveDate, end: NaiveDate) -> Result<(), Error> {
    if (end - start).num_days() > MAX_HISTORY_DAYS {
        return Err(Error::ParameterError(String::from(
            "date interval must not exceed 7 days",
        )));
    }
    Ok(())
}

fn push_opt<'a, T: ToString>(params: &mut Params<'a>, key: &'a str, value: Option<T>) {
    if let Some(value) = value {
        params.push((key, value.to_string()));
    }
}

pub(crate) fn history_form<'a>(
    sn_field: &'a str,
    device_sn: &str,
    start: NaiveDate,
    end: NaiveDate,
    timezone: Option<&str>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Params<'a> {
    let mut form = vec![
        (sn_field, device_sn.to_owned()),
        ("start_date", start.format("%Y-%m-%d").to_string()),
        ("end_date", end.format("%Y-%m-%d").to_string()),
    ];
    push_opt(&mut form, "timezone_id", timezone);
    push_opt(&mut form, "page", page);
    push_opt(&mut form, "perpage", limit);
    form
}

/// `[start hour, start minute, end hour, end minute, flag]`, hours not padded.
pub(crate) fn period_params(start: NaiveTime, end: NaiveTime, enabled: bool) -> [String; 5] {
    use chrono::Timelike;
    [
        start.hour().to_string(),
        start.minute().to_string(),
        end.hour().to_string(),
        end.minute().to_string(),
        String::from(if enabled { "1" } else { "0" }),
    ]
}

/// Settings may be passed as the whole response or its `data`.
pub(crate) fn settings_data(settings: &Value) -> &Value {
    match (settings.get("error_code"), settings.get("data")) {
        (Some(_), Some(data)) => data,
        _ => settings,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    /// The server's limit for this unit, when `start..end` exceeds it.
    pub fn interval_warning(self, start: NaiveDate, end: NaiveDate) -> Option<&'static str> {
        use chrono::Datelike;
        match self {
            TimeUnit::Day if (end - start).num_days() > MAX_HISTORY_DAYS => {
                Some("Date interval must not exceed 7 days in 'day' mode.")
            }
            TimeUnit::Month if end.year() - start.year() > 1 => {
                Some("Start date must be within same or previous year in 'month' mode.")
            }
            TimeUnit::Year if end.year() - start.year() > MAX_HISTORY_YEARS => {
                Some("Date interval must not exceed 20 years in 'year' mode.")
            }
            _ => None,
        }
    }
}

pub async fn plant_list(api: &V1Api) -> Result<Value, Error> {
    let form = vec![
        ("page", String::new()),
        ("perpage", String::new()),
        ("search_type", String::new()),
        ("search_keyword", String::new()),
    ];
    log::debug!("GET v1/{}", page::PLANT_LIST);
    let request = api.client.get(api.get_url(page::PLANT_LIST)).form(&form);
    let response = send(request, page::PLANT_LIST).await?;
    process_response(response, "getting plant list")
}

pub async fn plants(api: &V1Api) -> Result<PlantList, Error> {
    let data = plant_list(api).await?;
    serde_json::from_value(data.clone())
        .map_err(|e| Error::InvalidResponse(data.to_string(), e.to_string()))
}

pub async fn plant_details(api: &V1Api, plant_id: u64) -> Result<Value, Error> {
    let query = vec![("plant_id", plant_id.to_string())];
    get(api, page::PLANT_DETAILS, &query, "getting plant details").await
}

pub async fn plant_energy_overview(api: &V1Api, plant_id: u64) -> Result<Value, Error> {
    let query = vec![("plant_id", plant_id.to_string())];
    get(api, page::PLANT_DATA, &query, "getting plant energy overview").await
}

/// Power readings of `day` (UTC today by default), one every 5 minutes.
pub async fn plant_power_overview(
    api: &V1Api,
    plant_id: u64,
    day: Option<NaiveDate>,
) -> Result<Value, Error> {
    let day = day.unwrap_or_else(|| Utc::now().date_naive());
    let query = vec![
        ("plant_id", plant_id.to_string()),
        ("date", day.format("%Y-%m-%d").to_string()),
    ];
    get(api, page::PLANT_POWER, &query, "getting plant power overview").await
}

/// Checks the interval against the server's limits; violations are logged, not refused.
pub async fn plant_energy_history(
    api: &V1Api,
    plant_id: u64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    time_unit: TimeUnit,
    page: Option<u32>,
    perpage: Option<u32>,
) -> Result<Value, Error> {
    let (start, end) = resolve_dates(start, end);
    if let Some(warning) = time_unit.interval_warning(start, end) {
        log::warn!("{}", warning);
    }

    let mut query = vec![
        ("plant_id", plant_id.to_string()),
        ("start_date", start.format("%Y-%m-%d").to_string()),
        ("end_date", end.format("%Y-%m-%d").to_string()),
        ("time_unit", time_unit.as_str().to_string()),
    ];
    push_opt(&mut query, "page", page);
    push_opt(&mut query, "perpage", perpage);

    get(api, page::PLANT_ENERGY, &query, "getting plant energy history").await
}

/// Devices of the plant; `type` tells MIN (7) and SPH (5) apart.
pub async fn device_list(api: &V1Api, plant_id: u64) -> Result<DeviceList, Error> {
    let query = vec![
        ("plant_id", plant_id.to_string()),
        ("page", String::new()),
        ("perpage", String::new()),
    ];
    let data = get(api, page::DEVICE_LIST, &query, "getting device list").await?;
    serde_json::from_value(data.clone())
        .map_err(|e| Error::InvalidResponse(data.to_string(), e.to_string()))
}

/// A device with V1 support.
pub enum Device<'a> {
    Min(Min<'a>),
    Sph(Sph<'a>),
}

impl Device<'_> {
    pub fn device_sn(&self) -> &str {
        match self {
            Device::Min(min) => &min.device_sn,
            Device::Sph(sph) => &sph.device_sn,
        }
    }

    pub async fn detail(&self) -> Result<Value, Error> {
        match self {
            Device::Min(min) => min.detail().await,
            Device::Sph(sph) => sph.detail().await,
        }
    }

    pub async fn energy(&self) -> Result<Value, Error> {
        match self {
            Device::Min(min) => min.energy().await,
            Device::Sph(sph) => sph.energy().await,
        }
    }
}

/// `None` (with a warning) for device types without V1 support.
pub fn get_device<'a>(api: &'a V1Api, device_sn: &str, type_id: u64) -> Option<Device<'a>> {
    match model::DeviceType::from_id(type_id) {
        Some(model::DeviceType::Min) => Some(Device::Min(Min::new(api, device_sn))),
        Some(model::DeviceType::Sph) => Some(Device::Sph(Sph::new(api, device_sn))),
        _ => {
            log::warn!("Device for type id: {} has not been implemented yet.", type_id);
            None
        }
    }
}

pub async fn min_detail(api: &V1Api, device_sn: &str) -> Result<Value, Error> {
    Min::new(api, device_sn).detail().await
}

pub async fn min_energy(api: &V1Api, device_sn: &str) -> Result<Value, Error> {
    Min::new(api, device_sn).energy().await
}

pub async fn min_energy_history(
    api: &V1Api,
    device_sn: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    timezone: Option<&str>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<Value, Error> {
    Min::new(api, device_sn)
        .energy_history(start, end, timezone, page, limit)
        .await
}

pub async fn min_settings(api: &V1Api, device_sn: &str) -> Result<Value, Error> {
    Min::new(api, device_sn).settings().await
}

pub async fn min_read_parameter(
    api: &V1Api,
    device_sn: &str,
    target: &ReadTarget,
) -> Result<Value, Error> {
    Min::new(api, device_sn).read_parameter(target).await
}

pub async fn min_write_parameter(
    api: &V1Api,
    device_sn: &str,
    parameter_id: &str,
    values: &ParameterValues,
) -> Result<Value, Error> {
    Min::new(api, device_sn)
        .write_parameter(parameter_id, values)
        .await
}

pub async fn min_write_time_segment(
    api: &V1Api,
    device_sn: &str,
    segment_id: u8,
    batt_mode: u8,
    start: NaiveTime,
    end: NaiveTime,
    enabled: bool,
) -> Result<Value, Error> {
    Min::new(api, device_sn)
        .write_time_segment(segment_id, batt_mode, start, end, enabled)
        .await
}

pub async fn min_read_time_segments(
    api: &V1Api,
    device_sn: &str,
    settings: Option<&Value>,
) -> Result<Vec<model::TimeSegment>, Error> {
    Min::new(api, device_sn).read_time_segments(settings).await
}

pub async fn sph_detail(api: &V1Api, device_sn: &str) -> Result<Value, Error> {
    Sph::new(api, device_sn).detail().await
}

pub async fn sph_energy(api: &V1Api, device_sn: &str) -> Result<Value, Error> {
    Sph::new(api, device_sn).energy().await
}

pub async fn sph_energy_history(
    api: &V1Api,
    device_sn: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    timezone: Option<&str>,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<Value, Error> {
    Sph::new(api, device_sn)
        .energy_history(start, end, timezone, page, limit)
        .await
}

pub async fn sph_read_parameter(
    api: &V1Api,
    device_sn: &str,
    target: &ReadTarget,
) -> Result<Value, Error> {
    Sph::new(api, device_sn).read_parameter(target).await
}

pub async fn sph_write_parameter(
    api: &V1Api,
    device_sn: &str,
    parameter_id: &str,
    values: &ParameterValues,
) -> Result<Value, Error> {
    Sph::new(api, device_sn)
        .write_parameter(parameter_id, values)
        .await
}

pub async fn sph_write_ac_charge_times(
    api: &V1Api,
    device_sn: &str,
    charge_power: u8,
    charge_stop_soc: u8,
    mains_enabled: bool,
    periods: &[PeriodSetting],
) -> Result<Value, Error> {
    Sph::new(api, device_sn)
        .write_ac_charge_times(charge_power, charge_stop_soc, mains_enabled, periods)
        .await
}

pub async fn sph_write_ac_discharge_times(
    api: &V1Api,
    device_sn: &str,
    discharge_power: u8,
    discharge_stop_soc: u8,
    periods: &[PeriodSetting],
) -> Result<Value, Error> {
    Sph::new(api, device_sn)
        .write_ac_discharge_times(discharge_power, discharge_stop_soc, periods)
        .await
}

pub async fn sph_read_ac_charge_times(
    api: &V1Api,
    device_sn: &str,
    settings: Option<&Value>,
) -> Result<model::AcChargeTimes, Error> {
    Sph::new(api, device_sn).read_ac_charge_times(settings).await
}

pub async fn sph_read_ac_discharge_times(
    api: &V1Api,
    device_sn: &str,
    settings: Option<&Value>,
) -> Result<model::AcDischargeTimes, Error> {
    Sph::new(api, device_sn)
        .read_ac_discharge_times(settings)
        .await
}
