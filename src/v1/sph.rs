//! SPH / MIX hybrid inverters (V1 device type 5).

use super::{
    check_history_interval, get, history_form, period_params, post, post_owned, resolve_dates,
    settings_data, time, write_form, ParameterValues,
};
use crate::api::endpoint::v1 as page;
use crate::api::Error;
use crate::model::{AcChargeTimes, AcDischargeTimes, PeriodSetting, ReadTarget, V1Api};
use chrono::NaiveDate;
use serde_json::Value;

const MAX_PARAMS: usize = 18;
const PERIODS: usize = 3;
const MAX_PERCENT: u8 = 100;

pub struct Sph<'a> {
    api: &'a V1Api,
    pub device_sn: String,
}

fn check_percent(name: &str, value: u8) -> Result<(), Error> {
    if value > MAX_PERCENT {
        return Err(Error::ParameterError(format!(
            "{} must be between 0 and {}",
            name, MAX_PERCENT
        )));
    }
    Ok(())
}

fn check_periods(periods: &[PeriodSetting]) -> Result<(), Error> {
    if periods.len() != PERIODS {
        return Err(Error::ParameterError(String::from(
            "periods must contain exactly 3 period definitions",
        )));
    }
    Ok(())
}

impl<'a> Sph<'a> {
    pub fn new(api: &'a V1Api, device_sn: &str) -> Self {
        Sph {
            api,
            device_sn: device_sn.to_owned(),
        }
    }

    /// Details including the AC charge/discharge configuration.
    pub async fn detail(&self) -> Result<Value, Error> {
        let query = vec![("device_sn", self.device_sn.to_owned())];
        get(self.api, page::SPH_DATA_INFO, &query, "getting SPH inverter details").await
    }

    pub async fn energy(&self) -> Result<Value, Error> {
        let form = vec![("mix_sn", self.device_sn.to_owned())];
        post(self.api, page::SPH_LAST_DATA, &form, "getting SPH inverter energy data").await
    }

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

        let form = history_form("mix_sn", &self.device_sn, start, end, timezone, page, limit);
        post(self.api, page::SPH_DATA, &form, "getting SPH inverter energy history").await
    }

    pub async fn read_parameter(&self, target: &ReadTarget) -> Result<Value, Error> {
        let (parameter_id, start, end) = target.resolve()?;
        let operation = format!("reading parameter {}", parameter_id);
        let form = vec![
            ("device_sn", self.device_sn.to_owned()),
            ("paramId", parameter_id),
            ("startAddr", start.to_string()),
            ("endAddr", end.to_string()),
        ];
        post(self.api, page::SPH_READ_PARAM, &form, &operation).await
    }

    pub async fn write_parameter(
        &self,
        parameter_id: &str,
        values: &ParameterValues,
    ) -> Result<Value, Error> {
        let form = write_form("mix_sn", &self.device_sn, parameter_id, &values.expand(MAX_PARAMS));
        let operation = format!("writing parameter {}", parameter_id);
        post_owned(self.api, page::SPH_SET, &form, &operation).await
    }

    /// Power and stop SOC in percent; periods land in `param4..param18`.
    pub async fn write_ac_charge_times(
        &self,
        charge_power: u8,
        charge_stop_soc: u8,
        mains_enabled: bool,
        periods: &[PeriodSetting],
    ) -> Result<Value, Error> {
        check_percent("charge_power", charge_power)?;
        check_percent("charge_stop_soc", charge_stop_soc)?;
        check_periods(periods)?;

        let mut values = vec![
            charge_power.to_string(),
            charge_stop_soc.to_string(),
            String::from(if mains_enabled { "1" } else { "0" }),
        ];
        for period in periods {
            values.extend(period_params(period.start, period.end, period.enabled));
        }

        let form = write_form("mix_sn", &self.device_sn, "mix_ac_charge_time_period", &values);
        post_owned(self.api, page::SPH_SET, &form, "writing AC charge time periods").await
    }

    /// Periods land in `param3..param17`.
    pub async fn write_ac_discharge_times(
        &self,
        discharge_power: u8,
        discharge_stop_soc: u8,
        periods: &[PeriodSetting],
    ) -> Result<Value, Error> {
        check_percent("discharge_power", discharge_power)?;
        check_percent("discharge_stop_soc", discharge_stop_soc)?;
        check_periods(periods)?;

        let mut values = vec![discharge_power.to_string(), discharge_stop_soc.to_string()];
        for period in periods {
            values.extend(period_params(period.start, period.end, period.enabled));
        }

        let form = write_form(
            "mix_sn",
            &self.device_sn,
            "mix_ac_discharge_time_period",
            &values,
        );
        post_owned(self.api, page::SPH_SET, &form, "writing AC discharge time periods").await
    }

    async fn settings_or_detail(&self, settings: Option<&Value>) -> Result<Value, Error> {
        match settings {
            Some(settings) => Ok(settings_data(settings).clone()),
            None => self.detail().await,
        }
    }

    /// Reads the AC charge configuration from `settings` (a [`Sph::detail`] result) or fetches it.
    pub async fn read_ac_charge_times(
        &self,
        settings: Option<&Value>,
    ) -> Result<AcChargeTimes, Error> {
        let settings = self.settings_or_detail(settings).await?;
        Ok(AcChargeTimes {
            charge_power: time::parse_int_or(settings.get("chargePowerCommand"), 0),
            charge_stop_soc: time::parse_int_or(settings.get("wchargeSOCLowLimit"), 100),
            mains_enabled: time::parse_flag(settings.get("acChargeEnable")),
            periods: time::parse_periods(&settings, "Charge"),
        })
    }

    pub async fn read_ac_discharge_times(
        &self,
        settings: Option<&Value>,
    ) -> Result<AcDischargeTimes, Error> {
        let settings = self.settings_or_detail(settings).await?;
        Ok(AcDischargeTimes {
            discharge_power: time::parse_int_or(settings.get("disChargePowerCommand"), 0),
            discharge_stop_soc: time::parse_int_or(settings.get("wdisChargeSOCLowLimit"), 10),
            periods: time::parse_periods(&settings, "Discharge"),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::testing::read_resource;
    use crate::v1::testing;
    use chrono::NaiveTime;
    use mockito::Matcher;

    fn period(start: (u32, u32), end: (u32, u32), enabled: bool) -> PeriodSetting {
        PeriodSetting {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            enabled,
        }
    }

    #[tokio::test]
    async fn ac_charge_times_layout() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/mixSet")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("mix_sn".into(), "SPH1".into()),
                Matcher::UrlEncoded("type".into(), "mix_ac_charge_time_period".into()),
                Matcher::UrlEncoded("param1".into(), "80".into()),
                Matcher::UrlEncoded("param2".into(), "95".into()),
                Matcher::UrlEncoded("param3".into(), "1".into()),
                Matcher::UrlEncoded("param4".into(), "23".into()),
                Matcher::UrlEncoded("param5".into(), "30".into()),
                Matcher::UrlEncoded("param6".into(), "5".into()),
                Matcher::UrlEncoded("param7".into(), "0".into()),
                Matcher::UrlEncoded("param8".into(), "1".into()),
                Matcher::UrlEncoded("param13".into(), "0".into()),
                Matcher::UrlEncoded("param18".into(), "0".into()),
            ]))
            .with_body(r#"{"error_code": 0, "error_msg": ""}"#)
            .create_async()
            .await;

        let api = testing::api(&server);
        let periods = [
            period((23, 30), (5, 0), true),
            PeriodSetting::disabled(),
            PeriodSetting::disabled(),
        ];
        Sph::new(&api, "SPH1")
            .write_ac_charge_times(80, 95, true, &periods)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ac_discharge_times_layout() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/mixSet")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "mix_ac_discharge_time_period".into()),
                Matcher::UrlEncoded("param1".into(), "100".into()),
                Matcher::UrlEncoded("param2".into(), "10".into()),
                Matcher::UrlEncoded("param3".into(), "17".into()),
                Matcher::UrlEncoded("param5".into(), "21".into()),
                Matcher::UrlEncoded("param7".into(), "1".into()),
                Matcher::UrlEncoded("param17".into(), "0".into()),
            ]))
            .with_body(r#"{"error_code": 0, "error_msg": ""}"#)
            .create_async()
            .await;

        let api = testing::api(&server);
        let periods = [
            period((17, 0), (21, 0), true),
            PeriodSetting::disabled(),
            PeriodSetting::disabled(),
        ];
        Sph::new(&api, "SPH1")
            .write_ac_discharge_times(100, 10, &periods)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ac_times_are_validated() {
        let server = mockito::Server::new_async().await;
        let api = testing::api(&server);
        let sph = Sph::new(&api, "SPH1");
        let three = [PeriodSetting::disabled(); 3];

        assert!(matches!(
            sph.write_ac_charge_times(101, 50, false, &three).await,
            Err(Error::ParameterError(_))
        ));
        assert!(matches!(
            sph.write_ac_charge_times(50, 50, false, &three[..2]).await,
            Err(Error::ParameterError(_))
        ));
        assert!(matches!(
            sph.write_ac_discharge_times(50, 101, &three).await,
            Err(Error::ParameterError(_))
        ));
    }

    #[tokio::test]
    async fn write_parameter_pads_to_18() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/mixSet")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "pv_on_off".into()),
                Matcher::UrlEncoded("param1".into(), "1".into()),
                Matcher::UrlEncoded("param18".into(), "".into()),
            ]))
            .with_body(r#"{"error_code": 0}"#)
            .create_async()
            .await;
        let too_many = server
            .mock("POST", "/v1/mixSet")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("param19".to_string()))
            .expect(0)
            .create_async()
            .await;

        let api = testing::api(&server);
        Sph::new(&api, "SPH1")
            .write_parameter("pv_on_off", &"1".into())
            .await
            .unwrap();

        mock.assert_async().await;
        too_many.assert_async().await;
    }

    #[tokio::test]
    async fn read_ac_times_from_detail() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/device/mix/mix_data_info")
            .match_query(Matcher::UrlEncoded("device_sn".into(), "SPH1".into()))
            .with_body(read_resource("v1_mix_data_info.json"))
            .create_async()
            .await;

        let api = testing::api(&server);
        let sph = Sph::new(&api, "SPH1");
        let charge = sph.read_ac_charge_times(None).await.unwrap();
        mock.assert_async().await;

        assert_eq!(80, charge.charge_power);
        assert_eq!(100, charge.charge_stop_soc);
        assert!(charge.mains_enabled);
        assert_eq!("23:30", charge.periods[0].start_time);
        assert_eq!("05:00", charge.periods[0].end_time);
        assert!(charge.periods[0].enabled);
        assert!(!charge.periods[1].enabled);

        let detail: Value =
            serde_json::from_str(&read_resource("v1_mix_data_info.json")).unwrap();
        let discharge = sph.read_ac_discharge_times(Some(&detail)).await.unwrap();
        assert_eq!(0, discharge.discharge_power);
        assert_eq!(10, discharge.discharge_stop_soc);
        assert_eq!("17:00", discharge.periods[0].start_time);
    }
}
