use std::fmt::Write;

use chrono::Utc;
use reqwest::{Client, Response, redirect};

use crate::config::{ProbeConfig, ProbeRuntime};
use crate::metrics::{event_count_metric, rate_limit_metric};

use super::extract::{Extraction, extract_event_count, extract_rate_limit};
use super::logger::ProbeLogger;
use super::report;
use super::request::{ProbeRequest, validate_response};
use super::result::{ProbeOutcome, SubProbe, SubProbeStatus};

pub const RATE_LIMIT_PROBE: &str = "rate_limit";

/// Builds the HTTP client shared by the sub-requests of one probe.
pub fn build_client(config: &ProbeConfig, runtime: ProbeRuntime) -> reqwest::Result<Client> {
    let redirect_policy = if config.no_follow_redirects {
        redirect::Policy::custom(|attempt| attempt.error("redirects are disabled for this module"))
    } else {
        redirect::Policy::default()
    };

    let mut builder = Client::builder()
        .timeout(runtime.timeout)
        .redirect(redirect_policy)
        .user_agent(concat!("sentrybox/", env!("CARGO_PKG_VERSION")));

    // h2 takes :authority from the URL, so a Host override only holds over HTTP/1
    if config.has_host_override() {
        builder = builder.http1_only();
    }

    builder.build()
}

pub fn stats_path(target: &str, stat: &str, since: i64) -> String {
    format!("{target}/stats/?resolution=10s&stat={stat}&since={since}")
}

pub fn keys_path(target: &str) -> String {
    format!("{target}/keys/")
}

/// Queries one Sentry project for its event counts and rate limit.
///
/// Sub-requests run one after the other and never abort each other. A failed
/// sub-request is logged and leaves its line out of the output.
pub struct SentryProber<'a> {
    client: &'a Client,
    config: &'a ProbeConfig,
    logger: &'a dyn ProbeLogger,
}

impl<'a> SentryProber<'a> {
    pub fn new(client: &'a Client, config: &'a ProbeConfig, logger: &'a dyn ProbeLogger) -> Self {
        Self {
            client,
            config,
            logger,
        }
    }

    /// Probes `target` and appends one exposition line per accepted sub-request to `out`.
    pub async fn probe<W: Write>(&self, target: &str, out: &mut W) -> ProbeOutcome {
        let mut outcome = ProbeOutcome::default();

        for stat in &self.config.stats {
            // Get the last minute stats
            let since = Utc::now().timestamp() - 60;
            let path = stats_path(target, stat, since);
            let status = self.request_event_count(stat, &path, out).await;
            outcome.sub_probes.push(SubProbe {
                name: stat.clone(),
                path,
                status,
            });
        }

        let path = keys_path(target);
        let status = self.request_rate_limit(&path, out).await;
        outcome.sub_probes.push(SubProbe {
            name: RATE_LIMIT_PROBE.to_string(),
            path,
            status,
        });

        outcome
    }

    async fn request_sentry(&self, path: &str) -> Result<Response, SubProbeStatus> {
        let request = match ProbeRequest::build(path, self.config) {
            Ok(request) => request,
            Err(err) => {
                self.logger
                    .error(&format!("Error creating request: {}", report(&err)), path);
                return Err(SubProbeStatus::ConstructionFailed);
            }
        };

        let result = request.into_reqwest(self.client).send().await;
        let detail = match &result {
            Ok(response) => format!("status {}", response.status()),
            Err(err) => report(err),
        };

        validate_response(result, &self.config.valid_status_codes).map_err(|err| {
            self.logger.warn(&format!("{}: {}", err, detail), path);
            SubProbeStatus::Rejected
        })
    }

    async fn request_event_count<W: Write>(
        &self,
        stat: &str,
        path: &str,
        out: &mut W,
    ) -> SubProbeStatus {
        let response = match self.request_sentry(path).await {
            Ok(response) => response,
            Err(status) => return status,
        };

        let count = match response.bytes().await {
            Ok(body) => extract_event_count(body.as_ref()),
            Err(_) => Extraction::NoData,
        };

        let status = emitted_status(&count, path);
        let _ = writeln!(out, "{}", event_count_metric(stat, count.value_or_zero()));
        status
    }

    async fn request_rate_limit<W: Write>(&self, path: &str, out: &mut W) -> SubProbeStatus {
        let response = match self.request_sentry(path).await {
            Ok(response) => response,
            Err(status) => return status,
        };

        let rate = match response.bytes().await {
            Ok(body) => extract_rate_limit(body.as_ref()),
            Err(_) => Extraction::NoData,
        };

        let status = emitted_status(&rate, path);
        let _ = writeln!(out, "{}", rate_limit_metric(rate.value_or_zero()));
        status
    }
}

fn emitted_status<T>(extraction: &Extraction<T>, path: &str) -> SubProbeStatus {
    match extraction {
        Extraction::Value(_) => SubProbeStatus::Emitted,
        Extraction::NoData => {
            log::debug!("No usable data in response for {}, reporting zero", path);
            SubProbeStatus::EmittedWithoutData
        }
    }
}
