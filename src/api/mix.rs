//! MIX / SPH hybrid inverters (`newMixApi.do`).

use super::response::field_or;
use super::{endpoint, get, post, Error};
use crate::model::{parse_f64, LoggedInApi, Timespan};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Chart points are 5 minute windows.
const CHART_WINDOW_HOURS: f64 = 5.0 / 60.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn post_obj(
    api: &LoggedInApi,
    op: &str,
    mix_id: &str,
    plant_id: &str,
) -> Result<Value, Error> {
    let query = vec![
        ("op", op.to_owned()),
        ("mixId", mix_id.to_owned()),
        ("plantId", plant_id.to_owned()),
    ];
    let value = post(api, endpoint::MIX, &query, None).await?;
    Ok(field_or(value, "obj", json!({})))
}

/// High level values (`epvToday`, `eBatChargeToday`, `soc`, `vbat`...). The app sends
/// `plant_id` but the endpoint does not need it.
pub async fn mix_info(
    api: &LoggedInApi,
    mix_id: &str,
    plant_id: Option<&str>,
) -> Result<Value, Error> {
    let mut query = vec![("op", String::from("getMixInfo")), ("mixId", mix_id.to_owned())];
    if let Some(plant_id) = plant_id {
        query.push(("plantId", plant_id.to_owned()));
    }
    let value = get(api, endpoint::MIX, &query).await?;
    Ok(field_or(value, "obj", json!({})))
}

/// Today and overall totals (`elocalLoadToday`, `etoGridToday`, `epvTotal`...).
pub async fn mix_totals(api: &LoggedInApi, mix_id: &str, plant_id: &str) -> Result<Value, Error> {
    post_obj(api, "getEnergyOverview", mix_id, plant_id).await
}

/// Instantaneous values in kW (`chargePower`, `pdisCharge1`, `SOC`, `ppv`...).
pub async fn mix_system_status(
    api: &LoggedInApi,
    mix_id: &str,
    plant_id: &str,
) -> Result<Value, Error> {
    post_obj(api, "getSystemStatus_KW", mix_id, plant_id).await
}

/// Totals for `timespan` plus `chartData`, keyed by 5 minute window (`"00:05"`).
pub async fn mix_detail(
    api: &LoggedInApi,
    mix_id: &str,
    plant_id: &str,
    timespan: Timespan,
    date: Option<NaiveDate>,
) -> Result<Value, Error> {
    let query = vec![
        ("op", String::from("getEnergyProdAndCons_KW")),
        ("plantId", plant_id.to_owned()),
        ("mixId", mix_id.to_owned()),
        ("type", timespan.value().to_string()),
        ("date", timespan.format_date(date)),
    ];
    let value = post(api, endpoint::MIX, &query, None).await?;
    Ok(field_or(value, "obj", json!({})))
}

/// Solar energy that went into the batteries today, in kWh:
/// `epvToday - eAcCharge - eChargeToday`.
pub fn solar_to_battery(mix_info: &Value, mix_detail: &Value) -> Option<f64> {
    let pv = mix_info.get("epvToday").and_then(parse_f64)?;
    let exported = mix_detail.get("eAcCharge").and_then(parse_f64)?;
    let self_consumed = mix_detail.get("eChargeToday").and_then(parse_f64)?;
    Some(round2(pv - exported - self_consumed))
}

/// Sums `mix_detail.chartData` per series into kWh, assuming each kW reading holds for its
/// whole window. Values that do not parse count as zero.
pub fn integrate_chart_data(mix_detail: &Value) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();

    if let Some(chart) = mix_detail.get("chartData").and_then(Value::as_object) {
        for points in chart.values().filter_map(Value::as_object) {
            for (series, value) in points {
                *totals.entry(series.to_owned()).or_insert(0.0) +=
                    parse_f64(value).unwrap_or(0.0) * CHART_WINDOW_HOURS;
            }
        }
    }

    totals.into_iter().map(|(k, v)| (k, round2(v))).collect()
}
