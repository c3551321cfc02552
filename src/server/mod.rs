//! The scrape endpoint.
//!
//! Prometheus calls `/probe?target=<project>&module=<name>`; each call runs one
//! Sentry probe and answers with the resulting exposition text.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::http_probe::prelude::*;
use crate::http_probe::report;
use crate::metrics::create_probe_metrics;

pub const DEFAULT_MODULE: &str = "sentry";
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const INDEX_PAGE: &str = "<html>
<head><title>Sentrybox</title></head>
<body>
<h1>Sentrybox</h1>
<p><a href=\"/probe?target=my-org/my-project&amp;module=sentry\">Probe my-org/my-project</a></p>
</body>
</html>
";

/// HTTP server answering scrapes.
pub struct ExporterServer {
    config: Arc<Config>,
}

impl ExporterServer {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Accepts connections until `shutdown` flips.
    /// Every connection is served on its own task.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        log::info!("Listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result?;
                    let config = self.config.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let config = config.clone();
                            async move {
                                Ok::<_, Infallible>(handle(&config, req.method(), req.uri()).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            log::debug!("Connection error from {}: {}", peer_addr, report(&e));
                        }
                    });
                }
                _ = shutdown.changed() => {
                    log::info!("Shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn text_response(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn bad_request(message: String) -> Response<Full<Bytes>> {
    text_response(StatusCode::BAD_REQUEST, "text/plain; charset=utf-8", message)
}

/// Routes one request.
pub async fn handle(config: &Config, method: &Method, uri: &Uri) -> Response<Full<Bytes>> {
    if method != Method::GET {
        return text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain; charset=utf-8",
            "Method Not Allowed\n".to_string(),
        );
    }

    match uri.path() {
        "/probe" => probe(config, uri.query()).await,
        "/-/healthy" => text_response(StatusCode::OK, "text/plain; charset=utf-8", "Healthy".to_string()),
        "/" => text_response(StatusCode::OK, "text/html; charset=utf-8", INDEX_PAGE.to_string()),
        _ => text_response(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            "Not Found\n".to_string(),
        ),
    }
}

async fn probe(config: &Config, query: Option<&str>) -> Response<Full<Bytes>> {
    let params: HashMap<String, String> =
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

    let Some(target) = params.get("target").filter(|target| !target.is_empty()) else {
        return bad_request("Target parameter is missing".to_string());
    };

    let module_name = params
        .get("module")
        .map(String::as_str)
        .unwrap_or(DEFAULT_MODULE);
    let Some(module) = config.modules.get(module_name) else {
        return bad_request(format!("Unknown module \"{}\"", module_name));
    };

    let client = match build_client(&module.http, module.runtime()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create HTTP client for module {}: {}", module_name, report(&e));
            return text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain; charset=utf-8",
                "Failed to create HTTP client\n".to_string(),
            );
        }
    };

    let start = Instant::now();
    let mut body = String::new();
    let outcome = SentryProber::new(&client, &module.http, &LogProbeLogger)
        .probe(target, &mut body)
        .await;

    if !outcome.all_succeeded() {
        log::debug!("Probe of {} with module {} was partial: {:?}", target, module_name, outcome);
    }

    for metric in create_probe_metrics(&outcome, start.elapsed().as_secs_f64()) {
        let _ = writeln!(body, "{}", metric);
    }

    text_response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, body)
}
