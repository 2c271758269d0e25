//! Plain text views of device data.

use crate::model::parse_f64;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

fn number(energy: &Value, key: &str) -> f64 {
    energy.get(key).and_then(parse_f64).unwrap_or(0.0)
}

fn today_total(energy: &Value, today: f64, total_key: &str) -> String {
    format!("{:.1}/{:.1}", today, number(energy, total_key))
}

/// Generation and power overview of a MIN/TLX device from its latest energy data
/// (`v1::min_energy`). Missing values show as zero.
pub fn render_min_dashboard(energy: &Value) -> String {
    let pair = |prefix: &str| {
        today_total(
            energy,
            number(energy, &format!("{}Today", prefix)),
            &format!("{}Total", prefix),
        )
    };
    // epvToday is not reported
    let epv_today = number(energy, "epv1Today") + number(energy, "epv2Today");

    let generation = [
        ("Solar production", today_total(energy, epv_today, "epvTotal")),
        (" Solar production, PV1", pair("epv1")),
        (" Solar production, PV2", pair("epv2")),
        ("Energy Output", pair("eac")),
        ("System production", pair("esystem")),
        ("Self consumption", pair("eself")),
        ("Load consumption", pair("elocalLoad")),
        ("Battery Charged", pair("echarge")),
        (" Charged from grid", pair("eacCharge")),
        ("Battery Discharged", pair("edischarge")),
        ("Import from grid", pair("etoUser")),
        ("Export to grid", pair("etoGrid")),
    ];
    let power = [
        ("AC Power", "pac"),
        ("Self power", "pself"),
        ("Export power", "pacToGridTotal"),
        ("Import power", "pacToUserTotal"),
        ("Local load power", "pacToLocalLoad"),
        ("PV power", "ppv"),
        ("PV #1 power", "ppv1"),
        ("PV #2 power", "ppv2"),
        ("Battery charge power", "bdc1ChargePower"),
        ("Battery discharge power", "bdc1DischargePower"),
    ];

    let mut out = String::from("\nGeneration overview             Today/Total(kWh)\n");
    for (label, value) in generation.iter() {
        let _ = writeln!(out, "{:<26}{:>22}", label, value);
    }

    out.push_str("\nPower overview                          (Watts)\n");
    for (label, key) in power.iter() {
        let _ = writeln!(out, "{:<25}{:>22.1}", label, number(energy, key));
    }
    let _ = writeln!(
        out,
        "{:<25}{:>21}%",
        "Battery SOC",
        number(energy, "bdc1Soc") as i64
    );

    out
}

/// ASCII bar chart of `points`, ordered by key. Wide series are thinned to fit `max_width`.
pub fn miniplot(
    points: &BTreeMap<String, f64>,
    rows_to_plot: usize,
    max_width: usize,
    prefix: &str,
) -> String {
    if points.is_empty() {
        return String::from(
            "|  ↑\n|  │  no data to plot\n|  │\n|  └───────────────────→\n",
        );
    }

    let (x_min, x_max) = match (points.keys().next(), points.keys().next_back()) {
        (Some(first), Some(last)) => (first, last),
        _ => return String::new(),
    };
    let y_max = points.values().cloned().fold(f64::MIN, f64::max);
    let step = (points.len() * 3) / max_width.max(1) + 1;
    let rows = rows_to_plot.max(1);

    let mut out = String::new();
    let _ = writeln!(out, "{} ↑", prefix);
    for row in (1..=rows).rev() {
        let range_start = (y_max / rows as f64) * (row - 1) as f64;
        let range_end = (y_max / rows as f64) * row as f64;
        let mut line = format!("{} │ ", prefix);
        for &y in points.values().step_by(step) {
            let cell = if y <= 0.0 || y < range_start {
                "   "
            } else if y >= range_end - (range_end - range_start) / 2.0 {
                " | "
            } else {
                " . "
            };
            line.push_str(cell);
        }
        let _ = writeln!(out, "{}", line);
    }

    let width = points.len() / step;
    let _ = writeln!(out, "{} └{}──→", prefix, "─".repeat(width * 3));
    let _ = writeln!(
        out,
        "{} {} {}...{}{}",
        prefix,
        x_min,
        " ".repeat(width),
        " ".repeat(width),
        x_max
    );

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::testing::read_resource;

    #[test]
    fn min_dashboard() {
        let energy: Value = serde_json::from_str(&read_resource("v1_tlx_last_data.json")).unwrap();
        let dashboard = render_min_dashboard(&energy["data"]);
        let lines: Vec<&str> = dashboard.lines().collect();

        assert_eq!("Generation overview             Today/Total(kWh)", lines[1]);
        assert_eq!(
            "Solar production                     12.5/5432.1",
            lines[2]
        );
        assert_eq!(
            " Solar production, PV1                7.5/3000.0",
            lines[3]
        );
        assert_eq!(
            "AC Power                                 2345.6",
            lines[16]
        );
        assert_eq!(
            "Battery SOC                                 87%",
            lines[26]
        );
        assert_eq!(27, lines.len());
    }

    #[test]
    fn min_dashboard_tolerates_missing_values() {
        let dashboard = render_min_dashboard(&serde_json::json!({}));
        assert!(dashboard.contains("Export to grid                           0.0/0.0"));
    }

    #[test]
    fn miniplot_without_data() {
        assert_eq!(
            "|  ↑\n|  │  no data to plot\n|  │\n|  └───────────────────→\n",
            miniplot(&BTreeMap::new(), 6, 80, "| ")
        );
    }

    #[test]
    fn miniplot_bars() {
        let points: BTreeMap<String, f64> = [("10:00", 0.0), ("11:00", 5.0), ("12:00", 10.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let plot = miniplot(&points, 2, 80, "|");
        let lines: Vec<&str> = plot.lines().collect();

        assert_eq!(
            vec![
                "| ↑",
                "| │     .  | ",
                "| │     |  | ",
                "| └───────────→",
                "| 10:00    ...   12:00",
            ],
            lines
        );
    }
}
