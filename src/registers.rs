//! Chunked reading of inverter holding registers.
//!
//! The server gives up (HTTP 500) when the inverter takes too long to answer, which happens for
//! large ranges and while the inverter boots from standby. Chunks shrink until reads succeed;
//! at the smallest chunk the inverter is assumed offline and the read is retried after a pause.

use crate::api::settings::{self, RegisterRead};
use crate::api::Error;
use crate::model::LoggedInApi;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Known TLX/NEO register ranges, skipping reserved addresses.
pub const NEO_800_REGISTER_RANGES: [(u16, u16); 25] = [
    (0, 124),
    (125, 179),
    (180, 188),
    (201, 203),
    (209, 223),
    (229, 229),
    (230, 242),
    (304, 345),
    (532, 554),
    (600, 612),
    (660, 660),
    (1000, 1038),
    (1044, 1044),
    (1047, 1048),
    (1060, 1062),
    (1070, 1071),
    (1080, 1092),
    (1100, 1121),
    (1125, 1204),
    (1244, 1249),
    (3000, 3059),
    (3070, 3071),
    (3079, 3082),
    (3085, 3114),
    (3125, 3238),
];

const MIN_CHUNK: u16 = 10;

#[async_trait]
pub trait RegisterReader: Sync {
    /// Reads `start..=end`.
    async fn read(&self, start: u16, end: u16) -> Result<RegisterRead, Error>;
}

/// Registers of one inverter, read through `readParam`.
pub struct InverterRegisters<'a> {
    pub api: &'a LoggedInApi,
    pub serial_number: String,
    /// `"tlx"`, `"mix"`...
    pub device_type: String,
}

#[async_trait]
impl RegisterReader for InverterRegisters<'_> {
    async fn read(&self, start: u16, end: u16) -> Result<RegisterRead, Error> {
        settings::read_inverter_registers(
            self.api,
            &self.serial_number,
            &self.device_type,
            start,
            end,
        )
        .await
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    /// Pause after every successful chunk.
    pub poll_delay: Duration,
    /// Pause after shrinking the chunk.
    pub shrink_delay: Duration,
    /// Pause when the inverter looks offline.
    pub offline_delay: Duration,
    pub max_offline_retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            poll_delay: Duration::from_millis(100),
            shrink_delay: Duration::from_millis(300),
            offline_delay: Duration::from_secs(30),
            max_offline_retries: 10,
        }
    }
}

/// Everything read, and why reading stopped early if it did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterDump {
    pub registers: BTreeMap<u16, String>,
    pub error: Option<String>,
}

fn is_timeout(read: &RegisterRead) -> bool {
    read.error_message
        .as_deref()
        .map_or(false, |message| message.starts_with("500"))
}

pub async fn read_register_ranges<R: RegisterReader + ?Sized>(
    reader: &R,
    ranges: &[(u16, u16)],
    backoff: &Backoff,
) -> RegisterDump {
    let mut dump = RegisterDump::default();

    for &(start, end) in ranges {
        if let Err(error) = read_range(reader, start, end, backoff, &mut dump.registers).await {
            log::warn!("register read stopped at range {}..={}: {}", start, end, error);
            dump.error = Some(error);
            break;
        }
    }

    dump
}

async fn read_range<R: RegisterReader + ?Sized>(
    reader: &R,
    start: u16,
    end: u16,
    backoff: &Backoff,
    registers: &mut BTreeMap<u16, String>,
) -> Result<(), String> {
    let mut chunk = end.saturating_sub(start).saturating_add(1);
    let mut query_start = start;
    let mut offline_retries = 0;

    loop {
        let query_end = query_start.saturating_add(chunk - 1).min(end);
        let read = reader
            .read(query_start, query_end)
            .await
            .map_err(|e| format!("failed to read registers: '{}'", e))?;

        if read.success {
            registers.extend(read.registers);
            offline_retries = 0;
            if query_end >= end {
                return Ok(());
            }
            query_start = query_end + 1;
            tokio::time::sleep(backoff.poll_delay).await;
        } else if is_timeout(&read) {
            let smaller = (chunk / 2).max(MIN_CHUNK).min(chunk);
            if smaller == chunk {
                offline_retries += 1;
                if offline_retries > backoff.max_offline_retries {
                    return Err(format!(
                        "inverter did not answer after {} retries",
                        backoff.max_offline_retries
                    ));
                }
                log::info!(
                    "request timed out, inverter is offline or booting from standby; waiting {:?}",
                    backoff.offline_delay
                );
                tokio::time::sleep(backoff.offline_delay).await;
            } else {
                log::info!("request timed out, reduced chunk size to {}", smaller);
                chunk = smaller;
                tokio::time::sleep(backoff.shrink_delay).await;
            }
        } else {
            return Err(format!(
                "failed to read registers: '{}'",
                read.error_message.unwrap_or_default()
            ));
        }
    }
}
