use chrono::{Local, NaiveDate, NaiveTime};
use num_derive::FromPrimitive;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::api::Error;

type Watts = f64;

pub const SERVER_URL: &str = "https://openapi.growatt.com/";
pub const AGENT_IDENTIFIER: &str =
    "Dalvik/2.1.0 (Linux; U; Android 12; https://github.com/indykoning/PyPi_GrowattServer)";

/// Credentials and client settings for the ShinePhone API, before login.
#[derive(Debug, Clone)]
pub struct Api {
    pub server_url: String,
    pub agent_identifier: String,
    pub username: String,
    pub password: String,
    /// `password` already went through [`crate::api::hash_password`].
    pub is_password_hashed: bool,
}

impl Api {
    /// Appends a random 5 digit id to the user agent (`"<agent> - 01234"`).
    pub fn with_random_user_id(mut self) -> Self {
        let mut rng = rand::thread_rng();
        let random_number: String = (0..5)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        self.agent_identifier = format!("{} - {}", self.agent_identifier, random_number);
        self
    }

    pub fn with_agent_identifier(mut self, agent_identifier: &str) -> Self {
        self.agent_identifier = agent_identifier.to_owned();
        self
    }

    pub fn with_server_url(mut self, server_url: &str) -> Self {
        self.server_url = server_url.to_owned();
        self
    }
}

#[derive(Debug)]
pub struct LoggedInApi {
    pub server_url: String,
    pub login: LoginResult,
    pub client: reqwest::Client,
}

impl LoggedInApi {
    pub fn get_url(&self, page: &str) -> String {
        format!("{}{}", self.server_url, page)
    }

    pub fn user_id(&self) -> &str {
        &self.login.user_id
    }
}

/// Token authenticated client for the OpenAPI V1 surface.
#[derive(Debug)]
pub struct V1Api {
    pub api_url: String,
    pub client: reqwest::Client,
}

impl V1Api {
    pub fn get_url(&self, page: &str) -> String {
        format!("{}{}", self.api_url, page)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginResult {
    pub user_id: String,
    pub user_level: Option<i64>,
    pub plants: Vec<Plant>,
    /// Whole `back` object, with `userId` and `userLevel` added.
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Plant {
    #[serde(rename = "plantId", deserialize_with = "crate::api::response::string_or_number")]
    pub id: String,
    #[serde(rename = "plantName", default)]
    pub name: String,
}

/// Time window of chart style endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Timespan {
    Hour = 0,
    Day = 1,
    Month = 2,
}

impl Timespan {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// `%Y-%m` for months, `%Y-%m-%d` otherwise; `date` defaults to today.
    pub fn format_date(self, date: Option<NaiveDate>) -> String {
        let date = date.unwrap_or_else(today);
        match self {
            Timespan::Month => date.format("%Y-%m").to_string(),
            _ => date.format("%Y-%m-%d").to_string(),
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Charge/discharge priority of hybrid inverters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize)]
pub enum BatteryMode {
    LoadFirst = 0,
    BatteryFirst = 1,
    GridFirst = 2,
}

impl BatteryMode {
    pub fn name(self) -> &'static str {
        match self {
            BatteryMode::LoadFirst => "Load First",
            BatteryMode::BatteryFirst => "Battery First",
            BatteryMode::GridFirst => "Grid First",
        }
    }
}

/// `type` of a device in the V1 device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum DeviceType {
    Inverter = 1,
    Storage = 2,
    Other = 3,
    Max = 4,
    /// Also reported for MIX.
    Sph = 5,
    Spa = 6,
    /// Also reported for TLX.
    Min = 7,
    Pcs = 8,
    Hps = 9,
    Pbd = 10,
}

impl DeviceType {
    pub fn from_id(id: u64) -> Option<DeviceType> {
        num::FromPrimitive::from_u64(id)
    }
}

/// Which parameter a read request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    /// A named setting such as `pv_active_p_rate`.
    Named(String),
    /// Raw holding registers; a missing bound mirrors the other one.
    Registers { start: Option<u16>, end: Option<u16> },
}

pub const ANY_REGISTER: &str = "set_any_reg";

impl ReadTarget {
    pub fn named(parameter_id: &str) -> Self {
        ReadTarget::Named(parameter_id.to_owned())
    }

    pub fn register(address: u16) -> Self {
        ReadTarget::Registers {
            start: Some(address),
            end: Some(address),
        }
    }

    pub fn range(start: u16, end: u16) -> Self {
        ReadTarget::Registers {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Resolves into `(paramId, startAddr, endAddr)` as the read endpoints expect them.
    pub fn resolve(&self) -> Result<(String, u16, u16), Error> {
        match self {
            ReadTarget::Named(id) if id.is_empty() => Err(Error::ParameterError(
                "specify either parameter_id or start_address/end_address".to_string(),
            )),
            ReadTarget::Named(id) => Ok((id.to_owned(), 0, 0)),
            ReadTarget::Registers { start, end } => match (start, end) {
                (None, None) => Err(Error::ParameterError(
                    "specify either parameter_id or start_address/end_address".to_string(),
                )),
                (Some(start), None) => Ok((ANY_REGISTER.to_string(), *start, *start)),
                (None, Some(end)) => Ok((ANY_REGISTER.to_string(), *end, *end)),
                (Some(start), Some(end)) => Ok((ANY_REGISTER.to_string(), *start, *end)),
            },
        }
    }
}

/// One of the 9 time-of-use segments of a MIN/TLX inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSegment {
    pub segment_id: u8,
    pub batt_mode: Option<BatteryMode>,
    pub mode_name: String,
    pub start_time: String,
    pub end_time: String,
    pub enabled: bool,
}

/// One of the 3 AC charge/discharge periods of an SPH inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub period_id: u8,
    pub start_time: String,
    pub end_time: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcChargeTimes {
    pub charge_power: i64,
    pub charge_stop_soc: i64,
    pub mains_enabled: bool,
    pub periods: Vec<TimePeriod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcDischargeTimes {
    pub discharge_power: i64,
    pub discharge_stop_soc: i64,
    pub periods: Vec<TimePeriod>,
}

/// Period to be written with `write_ac_charge_times` / `write_ac_discharge_times`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSetting {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub enabled: bool,
}

impl PeriodSetting {
    pub fn disabled() -> Self {
        PeriodSetting {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            enabled: false,
        }
    }
}

/// Power flow of a MIX/TLX system, in watts regardless of the unit reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerFlow {
    pub soc: Option<f64>,
    pub pv: Option<Watts>,
    pub charge: Option<Watts>,
    pub discharge: Option<Watts>,
    pub export_to_grid: Option<Watts>,
    pub import_from_grid: Option<Watts>,
    pub local_load: Option<Watts>,
}

impl PowerFlow {
    /// Reads a `getSystemStatus_KW` object. Values are scaled by the object's `unit` (`kW` unless
    /// told otherwise).
    pub fn from_system_status(status: &Value) -> Self {
        let scale = match status.get("unit").and_then(Value::as_str) {
            Some(unit) if unit.eq_ignore_ascii_case("w") => 1.0,
            _ => 1000.0,
        };
        let watts = |key: &str| status.get(key).and_then(parse_f64).map(|v| v * scale);

        PowerFlow {
            soc: status.get("SOC").and_then(parse_f64),
            pv: watts("ppv"),
            charge: watts("chargePower"),
            discharge: watts("pdisCharge1"),
            export_to_grid: watts("pactogrid"),
            import_from_grid: watts("pactouser"),
            local_load: watts("pLocalLoad"),
        }
    }
}

/// Growatt sends most numbers as strings, some with units attached (`"20.5kWh"`, `"45%"`).
pub fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
                .map(|(i, _)| i)
                .unwrap_or_else(|| s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

/// Renders a JSON scalar the way it ends up in a form field.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        Value::Null => String::new(),
        v => v.to_string(),
    }
}
