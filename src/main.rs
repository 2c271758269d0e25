#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use config::Config;
use growatt_rs::model::{V1Api, SERVER_URL};
use growatt_rs::{dashboard, v1};
use rocket::{Build, Rocket, State};
use std::sync::Mutex;
use std::time::Instant;

mod metrics;

const DEFAULT_INTERVAL: i64 = 300;

#[derive(Clone, serde::Deserialize)]
pub struct GrowattConfig {
    server_url: String,
    token: String,
    interval: u64,
}

/// Structure containing state for API handlers.
pub struct StateData {
    api: V1Api,
    interval: u64,
    /// Timestamp of last successful metric collection via `metrics::collect()`
    timestamp: Mutex<Option<Instant>>,
}

impl StateData {
    /// Updates `timestamp` to `now()`.
    fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock timestamp mutex, will refresh again")
        }
    }

    /// Checks whether `interval_seconds` elapsed since last `touch()`
    fn interval_elapsed(&self, interval_secs: u64) -> bool {
        let elapsed_opt = self
            .timestamp
            .lock()
            .ok()
            .and_then(|a| a.map(|b| b.elapsed().as_secs()));

        match elapsed_opt {
            Some(elapsed) => elapsed > interval_secs,
            /* Nothing collected yet */
            None => true,
        }
    }
}

/// `GROWATT_TOKEN`, `GROWATT_SERVER_URL` and `GROWATT_INTERVAL` from the environment.
pub fn read_settings() -> GrowattConfig {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("GROWATT"))
        .unwrap()
        .set_default("server_url", SERVER_URL)
        .unwrap()
        .set_default("interval", DEFAULT_INTERVAL)
        .unwrap();

    settings.try_into().expect("Configuration error")
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, growatt_rs::Error> {
    if state.interval_elapsed(state.interval) {
        metrics::collect(&state.api).await?;
        state.touch();
    } else {
        log::info!("interval time not yet elapsed since last run; returning cached result")
    }
    metrics::read().await
}

#[get("/dump-devices")]
async fn dump_devices_route(state: &State<StateData>) -> Result<String, growatt_rs::Error> {
    let dump = growatt_rs::dump_devices(&state.api).await?;

    Ok(format!("{:#?}", dump))
}

#[get("/dashboard/<device_sn>")]
async fn dashboard_route(
    state: &State<StateData>,
    device_sn: &str,
) -> Result<String, growatt_rs::Error> {
    let energy = v1::min_energy(&state.api, device_sn).await?;

    Ok(dashboard::render_min_dashboard(&energy))
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = read_settings();
    let api = v1::api_with_url(&settings.server_url, &settings.token).expect("Invalid API token");
    let state = StateData {
        api,
        interval: settings.interval,
        timestamp: Mutex::new(None),
    };

    rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, dump_devices_route, dashboard_route])
}
