use log::{debug, info};
use std::{thread::sleep, time::Duration};

use crate::error::{Error, Result};

/// How often to log progress while waiting, in attempts.
const REPORT_EVERY: u32 = 15;

/// Configuration for waiting on the server to accept queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Maximum number of retries before the final attempt.
    pub max_retry_count: u32,
    /// Fixed wait after each failed attempt. There is no backoff.
    pub interval: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 180,
            interval: Duration::from_secs(2),
        }
    }
}

impl ReadinessConfig {
    /// Upper bound on the time spent sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_retry_count
    }
}

/// Calls `probe` until it succeeds, sleeping `config.interval` after every failure. After
/// `config.max_retry_count` failures one final attempt is made; if that fails too the
/// result is [`Error::NotReady`] wrapping the last failure.
///
/// Returns the number of attempts it took.
pub fn wait_until_ready(config: &ReadinessConfig, probe: impl FnMut() -> Result<()>) -> Result<u32> {
    wait_until_ready_with(config, probe, sleep)
}

pub(crate) fn wait_until_ready_with(
    config: &ReadinessConfig,
    mut probe: impl FnMut() -> Result<()>,
    mut sleep_fn: impl FnMut(Duration),
) -> Result<u32> {
    for i_retry in 0..config.max_retry_count {
        match probe() {
            Ok(()) => return Ok(i_retry + 1),
            Err(error) => {
                debug!("Server not ready ({error}) - retrying after {:?}.", config.interval);
                if (i_retry + 1) % REPORT_EVERY == 0 {
                    info!(
                        "Still waiting for the server ({} of {} attempts).",
                        i_retry + 1,
                        config.max_retry_count
                    );
                }
                sleep_fn(config.interval)
            }
        }
    }

    // On last attempt don't handle the error, just propagate it.
    let attempts = config.max_retry_count + 1;
    probe()
        .map(|()| attempts)
        .map_err(|source| Error::NotReady {
            attempts,
            source: Box::new(source),
        })
}
