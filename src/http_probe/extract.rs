//! Reduces raw Sentry API payloads to single metric values.
//!
//! Extraction never fails loudly: anything that cannot be read or parsed
//! becomes [`Extraction::NoData`], which the prober reports as zero.

use std::io::Read;

use serde::Deserialize;

/// The result of reducing a payload to a scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extraction<T> {
    NoData,
    Value(T),
}

impl<T: Default> Extraction<T> {
    pub fn value_or_zero(self) -> T {
        match self {
            Extraction::Value(value) => value,
            Extraction::NoData => T::default(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Extraction::NoData)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimit {
    window: i64,
    count: i64,
}

/// A project key record. Only the rate limit is read; `id`, `name` and `label` are skipped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectKey {
    #[serde(default)]
    rate_limit: Option<RateLimit>,
}

fn read_json<T, R>(mut reader: R) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut body = Vec::new();
    reader.read_to_end(&mut body).ok()?;
    serde_json::from_slice(&body).ok()
}

/// Sums the event counts of a stats series of `[timestamp, count]` pairs.
///
/// The last bucket is still being filled by Sentry and is left out.
pub fn extract_event_count<R: Read>(reader: R) -> Extraction<i64> {
    let Some(stats) = read_json::<Vec<(i64, i64)>, _>(reader) else {
        return Extraction::NoData;
    };

    // ignore the last timestamp
    let complete = stats.len().saturating_sub(1);
    match stats[..complete]
        .iter()
        .try_fold(0i64, |total, (_, count)| total.checked_add(*count))
    {
        Some(total) => Extraction::Value(total),
        None => Extraction::NoData,
    }
}

/// Events per second allowed by the first project key.
///
/// Only the first key is looked at. A missing rate limit or a zero window gives no data.
pub fn extract_rate_limit<R: Read>(reader: R) -> Extraction<f64> {
    let Some(keys) = read_json::<Vec<ProjectKey>, _>(reader) else {
        return Extraction::NoData;
    };

    match keys.first().and_then(|key| key.rate_limit.as_ref()) {
        Some(limit) if limit.window != 0 => {
            Extraction::Value(limit.count as f64 / limit.window as f64)
        }
        _ => Extraction::NoData,
    }
}
