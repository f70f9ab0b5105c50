//! Wait engine
//!
//! Polls a read operation until its result satisfies a predicate, a fatal
//! state is observed, the deadline passes, or the build is cancelled.
//! The deadline also bounds a read that is still in flight.
//! Read errors are returned as-is; masking "not created yet" errors is the
//! caller's job (usually by delaying the first read).

use crate::cancel::CancelToken;
use crate::error::{CloudError, WaitError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Polling cadence and deadline for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Sleep one poll interval, clamped to the deadline.
///
/// Returns `Err(Timeout)` if the deadline has been reached once the sleep
/// ends, `Err(Cancelled)` if cancelled mid-sleep.
async fn pause<S>(
    started: Instant,
    deadline: Instant,
    options: &WaitOptions,
    cancel: &CancelToken,
) -> Result<(), WaitError<S>> {
    if Instant::now() >= deadline {
        return Err(WaitError::Timeout(started.elapsed()));
    }

    let wake = std::cmp::min(Instant::now() + options.poll_interval, deadline);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(WaitError::Cancelled),
        _ = tokio::time::sleep_until(wake) => {}
    }

    if Instant::now() >= deadline {
        return Err(WaitError::Timeout(started.elapsed()));
    }
    Ok(())
}

/// Poll `read` until `is_desired` holds.
///
/// `on_pending` is called with every observed status that is neither
/// desired nor fatal, before the engine sleeps.
pub async fn wait_for<S, R, Fut, D, F, P>(
    mut read: R,
    is_desired: D,
    is_fatal: F,
    mut on_pending: P,
    options: &WaitOptions,
    cancel: &CancelToken,
) -> Result<S, WaitError<S>>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<S, CloudError>>,
    D: Fn(&S) -> bool,
    F: Fn(&S) -> bool,
    P: FnMut(&S),
{
    let started = Instant::now();
    let deadline = started + options.timeout;

    loop {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            result = read() => result?,
            _ = tokio::time::sleep_until(deadline) => {
                return Err(WaitError::Timeout(started.elapsed()));
            }
        };

        if is_desired(&status) {
            tracing::debug!("Desired state reached after {:?}", started.elapsed());
            return Ok(status);
        }

        if is_fatal(&status) {
            return Err(WaitError::Fatal(status));
        }

        on_pending(&status);
        pause(started, deadline, options, cancel).await?;
    }
}

/// Poll `read` until it reports not-found.
///
/// Used to confirm a delete has been observed by the remote system.
pub async fn wait_for_absence<S, R, Fut, P>(
    mut read: R,
    mut on_pending: P,
    options: &WaitOptions,
    cancel: &CancelToken,
) -> Result<(), WaitError<S>>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<S, CloudError>>,
    P: FnMut(&S),
{
    let started = Instant::now();
    let deadline = started + options.timeout;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            result = read() => result,
            _ = tokio::time::sleep_until(deadline) => {
                return Err(WaitError::Timeout(started.elapsed()));
            }
        };

        match result {
            Ok(status) => on_pending(&status),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Resource absent after {:?}", started.elapsed());
                return Ok(());
            }
            Err(e) => return Err(WaitError::Read(e)),
        }

        pause(started, deadline, options, cancel).await?;
    }
}
