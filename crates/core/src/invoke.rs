//! Isolated sensor invocation
//!
//! A sensor runs either inline under `catch_unwind`, or, when a timeout
//! applies, on its own thread. A thread that misses its deadline is
//! abandoned: the sensor call cannot be cancelled, only stopped waiting on.

use crate::catalog::CatalogEntry;
use crate::error::{FailureKind, SensorFailure};
use crate::result::SensorResult;
use crossbeam::channel::{self, RecvTimeoutError};
use log::{trace, warn};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

/// What came out of one invocation
pub(crate) struct Invocation {
    pub result: SensorResult,
    /// Time spent inside `run_sensor` only
    pub elapsed: Duration,
    pub failure: Option<SensorFailure>,
}

type RawOutcome = thread::Result<anyhow::Result<()>>;

pub(crate) fn invoke(
    entry: &CatalogEntry,
    result: SensorResult,
    timeout: Option<Duration>,
) -> Invocation {
    match timeout {
        Some(timeout) => invoke_with_timeout(entry, result, timeout),
        None => invoke_inline(entry, result),
    }
}

fn invoke_inline(entry: &CatalogEntry, mut result: SensorResult) -> Invocation {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        entry.sensor().run_sensor(entry.definition(), &mut result)
    }));
    let elapsed = started.elapsed();

    let failure = to_failure(entry.name(), outcome);
    Invocation {
        result,
        elapsed,
        failure,
    }
}

fn invoke_with_timeout(
    entry: &CatalogEntry,
    mut result: SensorResult,
    timeout: Duration,
) -> Invocation {
    let name = entry.name().to_string();
    result.set_deadline(Instant::now() + timeout);
    // Kept to answer with if the worker never reports back
    let pristine = result.clone();
    let sensor = entry.shared_sensor();
    let definition = entry.shared_definition();
    let (tx, rx) = channel::bounded::<(SensorResult, RawOutcome, Duration)>(1);

    let spawned = thread::Builder::new()
        .name(format!("sensor-{}", name))
        .spawn(move || {
            let mut result = result;
            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                sensor.run_sensor(&definition, &mut result)
            }));
            let elapsed = started.elapsed();
            // The receiver is gone when the deadline passed; nothing to do then
            let _ = tx.send((result, outcome, elapsed));
        });

    if let Err(e) = spawned {
        let failure = SensorFailure::new(
            &name,
            FailureKind::Execution,
            format!("failed to spawn sensor thread: {}", e),
        );
        return Invocation {
            result: pristine,
            elapsed: Duration::ZERO,
            failure: Some(failure),
        };
    }

    match rx.recv_timeout(timeout) {
        Ok((result, outcome, elapsed)) => {
            trace!("Sensor {} finished in {:?}", name, elapsed);
            Invocation {
                failure: to_failure(&name, outcome),
                result,
                elapsed,
            }
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!("Sensor {} did not finish within {:?}, abandoning it", name, timeout);
            Invocation {
                result: pristine,
                elapsed: timeout,
                failure: Some(SensorFailure::new(
                    &name,
                    FailureKind::Timeout,
                    format!("sensor did not finish within {} ms", timeout.as_millis()),
                )),
            }
        }
        Err(RecvTimeoutError::Disconnected) => Invocation {
            result: pristine,
            elapsed: Duration::ZERO,
            failure: Some(SensorFailure::new(
                &name,
                FailureKind::Panic,
                "sensor thread exited without reporting a result",
            )),
        },
    }
}

fn to_failure(name: &str, outcome: RawOutcome) -> Option<SensorFailure> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(SensorFailure::new(name, FailureKind::Execution, format!("{:#}", e))),
        Err(payload) => Some(SensorFailure::from_panic(name, FailureKind::Panic, payload)),
    }
}
