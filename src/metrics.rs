use growatt_rs::model::{parse_f64, V1Api};
use growatt_rs::v1::{self, Device};
use prometheus::{Encoder, GaugeVec, TextEncoder};
use serde_json::Value;

lazy_static! {
    static ref PLANT_TODAY_ENERGY_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "plant_today_energy",
            "energy generated by the plant in current day (in kWh)",
        ),
        &["plant_id"],
    )
    .unwrap();
    static ref PLANT_TOTAL_ENERGY_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "plant_total_energy",
            "energy generated by the plant since installation (in kWh)",
        ),
        &["plant_id"],
    )
    .unwrap();
    static ref PLANT_CURRENT_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("plant_current_power", "current plant output (in W)",),
        &["plant_id"],
    )
    .unwrap();
    static ref DEVICE_AC_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("device_ac_power", "AC output power reported by inverter",),
        &["plant_id", "device_sn", "device_type_id",],
    )
    .unwrap();
    static ref DEVICE_PV_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("device_pv_power", "PV input power reported by inverter",),
        &["plant_id", "device_sn", "device_type_id",],
    )
    .unwrap();
    static ref DEVICE_BATTERY_SOC_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("device_battery_soc", "battery state of charge (in %)",),
        &["plant_id", "device_sn", "device_type_id",],
    )
    .unwrap();
}

fn set_gauge(gauge: &GaugeVec, labels: &[&str], data: &Value, key: &str) {
    if let Some(value) = data.get(key).and_then(parse_f64) {
        gauge.with_label_values(labels).set(value);
    }
}

/// Feed the latest energy readings of `device` to Prometheus metrics. MIN and SPH report the
/// battery SOC under different names.
fn process_device_energy(energy: &Value, plant_id: &str, device: &Device, type_id: u64) {
    let type_id = type_id.to_string();
    let labels = [plant_id, device.device_sn(), type_id.as_str()];

    set_gauge(&DEVICE_AC_POWER_GAUGE, &labels, energy, "pac");
    set_gauge(&DEVICE_PV_POWER_GAUGE, &labels, energy, "ppv");
    let soc_key = match device {
        Device::Min(_) => "bdc1Soc",
        Device::Sph(_) => "soc",
    };
    set_gauge(&DEVICE_BATTERY_SOC_GAUGE, &labels, energy, soc_key);
}

/// Iterate through all devices within plant and collect energy data for supported ones.
async fn collect_plant_devices(api: &V1Api, plant_id: u64) -> Result<(), growatt_rs::Error> {
    let devices = v1::device_list(api, plant_id).await?;
    let plant_label = plant_id.to_string();

    for listed in devices.devices {
        if let Some(device) = v1::get_device(api, &listed.device_sn, listed.type_id) {
            match device.energy().await {
                Ok(energy) => process_device_energy(&energy, &plant_label, &device, listed.type_id),
                Err(e) => log::error!(
                    "No energy data returned for device {} of plant {}: {}",
                    listed.device_sn,
                    plant_id,
                    e
                ),
            }
        }
    }
    Ok(())
}

/// Collect plant energy metrics for every plant.
async fn collect_plants(api: &V1Api) -> Result<(), growatt_rs::Error> {
    let plants = v1::plants(api).await?;

    for plant in plants.plants {
        let plant_label = plant.plant_id.to_string();
        let overview = v1::plant_energy_overview(api, plant.plant_id).await?;

        if overview.is_null() {
            log::warn!("No energy overview returned for plant: {}", plant.plant_id);
        } else {
            let labels = [plant_label.as_str()];
            set_gauge(&PLANT_TODAY_ENERGY_GAUGE, &labels, &overview, "today_energy");
            set_gauge(&PLANT_TOTAL_ENERGY_GAUGE, &labels, &overview, "total_energy");
            set_gauge(&PLANT_CURRENT_POWER_GAUGE, &labels, &overview, "current_power");
        }

        collect_plant_devices(api, plant.plant_id).await?;
    }

    Ok(())
}

/// Collect all supported metrics from `api`, updating Prometheus exporter registry.
pub async fn collect(api: &V1Api) -> Result<(), growatt_rs::Error> {
    collect_plants(api).await
}

/// Read metrics from Prometheus exporter registry.
pub async fn read() -> Result<String, growatt_rs::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(growatt_rs::Error::FormatError))?;
    String::from_utf8(buffer).or(Err(growatt_rs::Error::FormatError))
}
