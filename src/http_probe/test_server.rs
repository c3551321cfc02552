//! A throwaway HTTP server answering canned responses per request path.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub enum Reply {
    Json(u16, &'static str),
    Redirect(&'static str),
    /// Close the connection without answering.
    Drop,
    /// Keep the connection open and never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

fn reply_to_response(reply: Reply) -> Result<Response<Full<Bytes>>, std::io::Error> {
    match reply {
        Reply::Json(status, body) => Ok(Response::builder()
            .status(StatusCode::from_u16(status).unwrap())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()),
        Reply::Redirect(location) => Ok(Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, location)
            .body(Full::new(Bytes::new()))
            .unwrap()),
        // hyper closes the connection when the service fails
        Reply::Drop => Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "dropping connection",
        )),
        Reply::Hang => unreachable!("hanging replies never produce a response"),
    }
}

impl TestServer {
    pub async fn spawn<F>(route: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route = Arc::new(route);

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let route = route.clone();
                let recorded = recorded.clone();

                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let target = req
                            .uri()
                            .path_and_query()
                            .map(|pq| pq.as_str().to_string())
                            .unwrap_or_default();
                        let headers = req
                            .headers()
                            .iter()
                            .map(|(k, v)| {
                                (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string())
                            })
                            .collect();

                        let reply = route(&target);
                        recorded
                            .lock()
                            .unwrap()
                            .push(RecordedRequest { target, headers });

                        async move {
                            if let Reply::Hang = reply {
                                std::future::pending::<()>().await;
                            }
                            reply_to_response(reply)
                        }
                    });

                    let _ = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(io, svc)
                        .await;
                });
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
