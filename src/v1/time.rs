//! Parsing of the loosely typed time-of-use fields in settings responses.

use crate::model::{BatteryMode, TimePeriod, TimeSegment};
use serde_json::Value;

fn is_missing(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty() || s == "null",
        Some(_) => false,
    }
}

fn as_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// `"7:5"` becomes `"07:05"`; missing or malformed values become `"00:00"`.
pub fn parse_hh_mm(raw: Option<&Value>) -> String {
    let parsed = raw.and_then(Value::as_str).and_then(|s| {
        let mut parts = s.split(':');
        let hour = parts.next()?.trim().parse::<u32>().ok()?;
        let minute = parts.next()?.trim().parse::<u32>().ok()?;
        Some(format!("{:02}:{:02}", hour, minute))
    });
    parsed.unwrap_or_else(|| String::from("00:00"))
}

/// `1` / `"1"` is true, anything else false.
pub fn parse_flag(raw: Option<&Value>) -> bool {
    raw.and_then(as_i64) == Some(1)
}

pub fn parse_int_or(raw: Option<&Value>, default: i64) -> i64 {
    if is_missing(raw) {
        return default;
    }
    raw.and_then(as_i64).unwrap_or(default)
}

/// Segments 1..=9 of a MIN settings object.
pub fn parse_segments(settings: &Value) -> Vec<TimeSegment> {
    (1..=9u8)
        .map(|i| {
            let batt_mode = settings
                .get(format!("time{}Mode", i))
                .and_then(as_i64)
                .and_then(num::FromPrimitive::from_i64);

            TimeSegment {
                segment_id: i,
                batt_mode,
                mode_name: batt_mode
                    .map_or("Unknown", BatteryMode::name)
                    .to_string(),
                start_time: parse_hh_mm(settings.get(format!("forcedTimeStart{}", i))),
                end_time: parse_hh_mm(settings.get(format!("forcedTimeStop{}", i))),
                enabled: parse_flag(settings.get(format!("forcedStopSwitch{}", i))),
            }
        })
        .collect()
}

/// Periods 1..=3 of an SPH detail object; `kind` is `Charge` or `Discharge`.
pub fn parse_periods(settings: &Value, kind: &str) -> Vec<TimePeriod> {
    (1..=3u8)
        .map(|i| TimePeriod {
            period_id: i,
            start_time: parse_hh_mm(settings.get(format!("forced{}TimeStart{}", kind, i))),
            end_time: parse_hh_mm(settings.get(format!("forced{}TimeStop{}", kind, i))),
            enabled: parse_flag(settings.get(format!("forced{}StopSwitch{}", kind, i))),
        })
        .collect()
}
