//! Local HTTP servers standing in for the Sprout API in tests

use std::sync::{Arc, Mutex};

use http_body_util::BodyExt;
use hyper::StatusCode;
use serde_json::Value;

use crate::config::{ClientConfig, CredentialBackend};

type Response =
    hyper::Response<http_body_util::combinators::BoxBody<hyper::body::Bytes, std::io::Error>>;

type Respond = dyn Fn(&str, &Value) -> (StatusCode, Vec<u8>) + Send + Sync;

/// What the stub saw of one request
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct StubApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubApi {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        api_url: base_url.to_string(),
        request_timeout: std::time::Duration::from_secs(5),
        scan_timeout: std::time::Duration::from_secs(10),
        connect_timeout: std::time::Duration::from_secs(10),
        home: crate::store::temp_home(),
        credential_backend: CredentialBackend::File,
    }
}

/// Serve JSON replies computed from the request path and JSON body
pub async fn start<F>(respond: F) -> StubApi
where
    F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
{
    serve(Arc::new(move |path: &str, body: &Value| {
        let (status, reply) = respond(path, body);
        (status, serde_json::to_vec(&reply).unwrap())
    }))
    .await
}

/// Serve the same raw body for every request
pub async fn start_raw(status: StatusCode, body: Vec<u8>) -> StubApi {
    serve(Arc::new(move |_: &str, _: &Value| (status, body.clone()))).await
}

async fn serve(respond: Arc<Respond>) -> StubApi {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let respond = respond.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let io = hyper_util::rt::TokioIo::new(stream);
                let builder = hyper_util::server::conn::auto::Builder::new(
                    hyper_util::rt::tokio::TokioExecutor::new(),
                );
                let service = hyper::service::service_fn(move |r| {
                    handle(r, respond.clone(), recorded.clone())
                });
                if let Err(e) = builder.serve_connection(io, service).await {
                    eprintln!("stub connection error: {e:?}");
                }
            });
        }
    });

    StubApi {
        base_url: format!("http://{addr}/api"),
        requests,
    }
}

async fn handle(
    r: hyper::Request<hyper::body::Incoming>,
    respond: Arc<Respond>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
) -> Result<Response, std::io::Error> {
    let path = r.uri().path().to_string();
    let authorization = r
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = match r.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return Err(std::io::Error::other(e)),
    };
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let (status, reply) = respond(&path, &body);
    recorded.lock().unwrap().push(Recorded {
        path,
        authorization,
        body,
    });
    Ok(bytes_to_resp(reply, status))
}

fn bytes_to_resp(bytes: Vec<u8>, status: StatusCode) -> Response {
    let mut r = hyper::Response::new(
        http_body_util::Full::new(hyper::body::Bytes::from(bytes))
            .map_err(|e| match e {})
            .boxed(),
    );
    *r.status_mut() = status;
    r.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    r
}

/// A base URL nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

/// Accepts connections and never answers
pub async fn silent() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{addr}/api")
}
