#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{Response, header},
    middleware::{self, Next},
};
use creatorgate::{ServerConfig, create_app};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

/// A request the fake backend received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn to_path(&self, path: &str) -> Vec<Recorded> {
        self.all().into_iter().filter(|r| r.path == path).collect()
    }
}

async fn record(State(recorder): State<Recorder>, req: Request, next: Next) -> Response<Body> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let header_value = |name| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    recorder.0.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Fake backend API listening on a random local port.
pub struct Backend {
    pub addr: SocketAddr,
    pub url: Url,
    pub recorder: Recorder,
}

impl Backend {
    /// Serve `routes` under `/v1`, the API base path.
    pub async fn spawn(routes: Router) -> Self {
        let recorder = Recorder::default();
        let app = Router::new()
            .nest("/v1", routes)
            .layer(middleware::from_fn_with_state(recorder.clone(), record));

        let addr = serve(app).await;
        let url = Url::parse(&format!("http://{}/v1", addr)).expect("Invalid URL");
        Self {
            addr,
            url,
            recorder,
        }
    }

    /// Gateway app pointed at this backend.
    pub fn gateway(&self) -> Router {
        create_app(&ServerConfig::new(self.url.clone()))
    }

    pub fn client(&self) -> creatorgate::client::ApiClient {
        creatorgate::client::ApiClient::new(&self.url)
    }
}

/// Serve `app` on a random local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Send a websocket handshake for `path` and return the response status.
pub async fn ws_handshake_status(
    addr: SocketAddr,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> u16 {
    let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
    let mut request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n",
        path, addr
    );
    for (name, value) in extra_headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    let head = String::from_utf8_lossy(&buf[..n]);
    head.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("Malformed status line")
}

/// Gateway app pointed at a port nothing listens on.
pub fn unreachable_gateway() -> Router {
    create_app(&ServerConfig::new(
        Url::parse("http://127.0.0.1:9/v1").unwrap(),
    ))
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Signed JWT for `sub` that expires `secs` from now.
pub fn token_expiring_in(sub: &str, secs: i64) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }
    encode(
        &Header::default(),
        &Claims {
            sub,
            exp: now_secs() + secs,
        },
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}
