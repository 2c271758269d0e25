//! MIN / TLX inverters (V1 device type 7).

use super::{
    check_history_interval, get, history_form, period_params, post, post_owned, resolve_dates,
    settings_data, time, write_form, ParameterValues,
};
use crate::api::endpoint::v1 as page;
use crate::api::Error;
use crate::model::{TimeSegment, V1Api};
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

const MAX_PARAMS: usize = 19;
const MAX_SEGMENTS: u8 = 9;
const MAX_BATT_MODE: u8 = 2;

pub struct Min<'a> {
    api: &'a V1Api,
    pub device_sn: String,
}

impl<'a> Min<'a> {
    pub fn new(api: &'a V1Api, device_sn: &str) -> Self {
        Min {
            api,
            device_sn: device_sn.to_owned(),
        }
    }

    pub async fn detail(&self) -> Result<Value, Error> {
        let query = vec![("device_sn", self.device_sn.to_owned())];
        get(self.api, page::MIN_DATA_INFO, &query, "getting MIN inverter details").await
    }

    /// Latest readings.
    pub async fn energy(&self) -> Result<Value, Error> {
        let form = vec![("tlx_sn", self.device_sn.to_owned())];
        post(self.api, page::MIN_LAST_DATA, &form, "getting MIN inverter energy data").await
    }

    /// Readings between `start` and `end`, at most 7 days apart.
    pub async fn energy_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        timezone: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value, Error> {
        let (start, end) = resolve_dates(start, end);
        check_history_interval(start, end)?;

        let form = history_form("tlx_sn", &self.device_sn, start, end, timezone, page, limit);
        post(self.api, page::MIN_DATA, &form, "getting MIN inverter energy history").await
    }

    pub async fn settings(&self) -> Result<Value, Error> {
        let query = vec![("device_sn", self.device_sn.to_owned())];
        get(self.api, page::MIN_SET_INFO, &query, "getting MIN inverter settings").await
    }

    pub async fn read_parameter(&self, target: &crate::model::ReadTarget) -> Result<Value, Error> {
        let (parameter_id, start, end) = target.resolve()?;
        let operation = format!("reading parameter {}", parameter_id);
        let form = vec![
            ("device_sn", self.device_sn.to_owned()),
            ("paramId", parameter_id),
            ("startAddr", start.to_string()),
            ("endAddr", end.to_string()),
        ];
        post(self.api, page::MIN_READ_PARAM, &form, &operation).await
    }

    pub async fn write_parameter(
        &self,
        parameter_id: &str,
        values: &ParameterValues,
    ) -> Result<Value, Error> {
        let form = write_form("tlx_sn", &self.device_sn, parameter_id, &values.expand(MAX_PARAMS));
        let operation = format!("writing parameter {}", parameter_id);
        post_owned(self.api, page::MIN_SET, &form, &operation).await
    }

    /// `batt_mode`: 0 load first, 1 battery first, 2 grid first.
    pub async fn write_time_segment(
        &self,
        segment_id: u8,
        batt_mode: u8,
        start: NaiveTime,
        end: NaiveTime,
        enabled: bool,
    ) -> Result<Value, Error> {
        if !(1..=MAX_SEGMENTS).contains(&segment_id) {
            return Err(Error::ParameterError(format!(
                "segment_id must be between 1 and {}",
                MAX_SEGMENTS
            )));
        }
        if batt_mode > MAX_BATT_MODE {
            return Err(Error::ParameterError(format!(
                "batt_mode must be between 0 and {}",
                MAX_BATT_MODE
            )));
        }

        let mut values = vec![batt_mode.to_string()];
        values.extend(period_params(start, end, enabled));
        values.resize(MAX_PARAMS, String::new());

        let form = write_form(
            "tlx_sn",
            &self.device_sn,
            &format!("time_segment{}", segment_id),
            &values,
        );
        let operation = format!("writing time segment {}", segment_id);
        post_owned(self.api, page::MIN_SET, &form, &operation).await
    }

    /// The 9 time-of-use segments. Pass the result of [`Min::settings`] (whole response or
    /// `data`) to save a request.
    pub async fn read_time_segments(
        &self,
        settings: Option<&Value>,
    ) -> Result<Vec<TimeSegment>, Error> {
        let fetched;
        let settings = match settings {
            Some(settings) => settings_data(settings),
            None => {
                fetched = self.settings().await?;
                &fetched
            }
        };
        Ok(time::parse_segments(settings))
    }
}
