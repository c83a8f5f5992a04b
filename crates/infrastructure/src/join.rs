//! Fan-out helpers used by the collectors.

use std::fmt::Display;
use std::future::Future;

use futures::future::{join_all, BoxFuture};
use tracing::warn;

use telemetry_core::TelemetryResult;

/// A labelled device call. The label doubles as the `subject` of the
/// warning logged when the call fails.
pub type NamedCall<'a, T> = (&'static str, BoxFuture<'a, TelemetryResult<T>>);

/// Run every call concurrently and return once all of them finished,
/// in input order.
pub async fn join_all_named<T>(
    calls: Vec<NamedCall<'_, T>>,
) -> Vec<(&'static str, TelemetryResult<T>)> {
    let (names, futures): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
    names.into_iter().zip(join_all(futures).await).collect()
}

/// Like [`join_all_named`], replacing each failure with `T::default()`
pub async fn join_all_best_effort<T: Default>(
    display_name: &str,
    calls: Vec<NamedCall<'_, T>>,
) -> Vec<T> {
    join_all_named(calls)
        .await
        .into_iter()
        .map(|(subject, result)| or_default(display_name, subject, result))
        .collect()
}

/// Await one call, replacing a failure with `T::default()`
pub async fn best_effort<T, F>(display_name: &str, subject: &'static str, call: F) -> T
where
    T: Default,
    F: Future<Output = TelemetryResult<T>>,
{
    or_default(display_name, subject, call.await)
}

fn or_default<T: Default>(display_name: &str, subject: &str, result: TelemetryResult<T>) -> T {
    result.unwrap_or_else(|e| {
        log_incomplete_data(display_name, subject, &e);
        T::default()
    })
}

pub fn log_incomplete_data(display_name: &str, subject: &str, error: &impl Display) {
    warn!(
        display_name,
        subject,
        error = %error,
        "Error gathering data; response will be incomplete"
    );
}
