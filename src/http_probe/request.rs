use reqwest::header::{
    HOST, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue,
};
use reqwest::{Client, Method, Response};
use thiserror::Error;
use url::Url;

use crate::config::ProbeConfig;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request URL {url:?}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid header name {name:?}")]
    HeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },
    #[error("invalid value for header {name:?}")]
    HeaderValue {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Invalid response from Sentry API")]
    InvalidResponse,
}

/// A GET request against the Sentry API.
///
/// The virtual host is kept apart from the literal headers; it is only put
/// on the wire when the request is handed to the HTTP client.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    url: Url,
    host: Option<HeaderValue>,
    headers: HeaderMap,
}

impl ProbeRequest {
    /// Builds a request for `config.prefix + path`.
    /// `path` already carries its query string.
    pub fn build(path: &str, config: &ProbeConfig) -> Result<Self, RequestError> {
        let request_url = format!("{}{}", config.prefix, path);
        let url = Url::parse(&request_url).map_err(|source| RequestError::Url {
            url: request_url.clone(),
            source,
        })?;

        let mut host = None;
        let mut headers = HeaderMap::new();

        for (key, value) in &config.headers {
            let header_value =
                HeaderValue::from_str(value).map_err(|source| RequestError::HeaderValue {
                    name: key.clone(),
                    source,
                })?;

            if key.eq_ignore_ascii_case("host") {
                host = Some(header_value);
                continue;
            }

            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|source| {
                RequestError::HeaderName {
                    name: key.clone(),
                    source,
                }
            })?;
            headers.insert(name, header_value);
        }

        Ok(Self { url, host, headers })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The virtual host override, if one was configured.
    pub fn host(&self) -> Option<&str> {
        self.host.as_ref().and_then(|host| host.to_str().ok())
    }

    /// The literal headers. Never contains `Host`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_reqwest(self, client: &Client) -> reqwest::RequestBuilder {
        let mut builder = client.request(Method::GET, self.url).headers(self.headers);
        if let Some(host) = self.host {
            builder = builder.header(HOST, host);
        }
        builder
    }
}

/// Decides whether a status code counts as a successful answer.
/// An empty allow-list falls back to the 2xx range.
pub fn is_accepted_status(status: u16, valid_status_codes: &[u16]) -> bool {
    if valid_status_codes.is_empty() {
        (200..300).contains(&status)
    } else {
        valid_status_codes.contains(&status)
    }
}

/// Applies the acceptance policy to the outcome of a request.
/// Transport failures and unexpected status codes collapse into the same rejection.
pub fn validate_response(
    result: Result<Response, reqwest::Error>,
    valid_status_codes: &[u16],
) -> Result<Response, ResponseError> {
    match result {
        Ok(response) if is_accepted_status(response.status().as_u16(), valid_status_codes) => {
            Ok(response)
        }
        _ => Err(ResponseError::InvalidResponse),
    }
}
