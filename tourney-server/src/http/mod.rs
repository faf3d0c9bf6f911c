/// Dispatches on the event method. `OPTIONS` is answered with the preflight of `$cors`, any
/// method without a branch with a 405.
macro_rules! method {
    ($event:expr, $cors:expr, {$($method:expr => $branch:expr),* $(,)?}) => {
        match $event.method() {
            Ok(method) if method == hyper::Method::OPTIONS => Ok($cors.preflight()),
            $(
                Ok(method) if method == $method => $branch,
            )*
            _ => Err(crate::StatusCodeError::method_not_allowed().into()),
        }
    };
}

pub mod auth;
pub mod tournaments;

mod response;

use crate::{Error, State, StatusCodeError};

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use hyper::body::HttpBody;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, StatusCode};
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tourney_api::event::parse_query_string;
use tourney_api::{Event, EventResponse, PayloadError};

pub use response::Response;

pub type Result = std::result::Result<Response, Error>;

/// Requests with a larger body are rejected with 413.
const MAX_BODY_SIZE: usize = 16384;
/// Time a client gets to transmit the full body.
const BODY_TIMEOUT: Duration = Duration::new(30, 0);

impl From<PayloadError> for Error {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::UnknownAction(action) => {
                log::debug!("Rejecting unknown action {:?}", action);

                StatusCodeError::bad_request()
                    .message("Неизвестное действие")
                    .into()
            }
            PayloadError::Malformed(err) => StatusCodeError::bad_request().message(err).into(),
        }
    }
}

/// Serves both handlers on `addr` until `shutdown` changes.
pub async fn bind(
    addr: SocketAddr,
    state: State,
    shutdown: watch::Receiver<bool>,
) -> std::result::Result<(), Error> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    log::info!("Listening on {}", addr);

    serve(listener, state, shutdown).await
}

/// Accepts connections from `listener` until `shutdown` changes. Open connections are then
/// shut down gracefully and awaited, in-flight requests still get their response.
async fn serve(
    listener: TcpListener,
    state: State,
    mut shutdown: watch::Receiver<bool>,
) -> std::result::Result<(), Error> {
    let service = RootService { state };
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, addr) = match res {
                    Ok((stream, addr)) => (stream, addr),
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };
                log::info!("Accepting new connection from {:?}", addr);

                let service = service.clone();
                let mut shutdown = shutdown.clone();
                connections.spawn(async move {
                    let conn = Http::new()
                        .http1_keep_alive(true)
                        .serve_connection(stream, service);
                    tokio::pin!(conn);

                    let res = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = shutdown.changed() => {
                            log::debug!("Shutting down connection");
                            conn.as_mut().graceful_shutdown();
                            conn.as_mut().await
                        }
                    };

                    if let Err(err) = res {
                        log::warn!("Http error: {:?}", err);
                    }
                });
            }
            Some(res) = connections.join_next(), if !connections.is_empty() => {
                if let Err(err) = res {
                    log::warn!("Connection task failed: {}", err);
                }
            }
            _ = shutdown.changed() => {
                log::info!("Shutting down http server");
                break;
            }
        }
    }

    drop(listener);

    log::debug!("Waiting for {} open connections", connections.len());
    while let Some(res) = connections.join_next().await {
        if let Err(err) = res {
            log::warn!("Connection task failed: {}", err);
        }
    }

    Ok(())
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        let state = self.state.clone();

        Box::pin(async move { Ok(service_root(req, state).await) })
    }
}

async fn service_root(req: hyper::Request<Body>, state: State) -> hyper::Response<Body> {
    log::trace!("Head: {} {}", req.method(), req.uri());
    log::trace!("Headers: {:?}", req.headers());

    let segment = req
        .uri()
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_owned();

    let resp = match segment.as_str() {
        "auth" | "tournaments" => match into_event(req).await {
            Ok(event) if segment == "auth" => auth::handle(&state, event).await,
            Ok(event) => tournaments::handle(&state, event).await,
            Err(err) => response::finish(Err(err)),
        },
        _ => response::finish(Err(StatusCodeError::not_found().into())),
    };

    into_hyper(resp)
}

/// Converts a hyper request into an [`Event`], reading the full body.
async fn into_event(req: hyper::Request<Body>) -> std::result::Result<Event, Error> {
    let (parts, body) = req.into_parts();

    if let Some(length) = content_length(&parts.headers)? {
        if length > MAX_BODY_SIZE as u64 {
            return Err(StatusCodeError::payload_too_large().into());
        }
    }

    let bytes = match tokio::time::timeout(BODY_TIMEOUT, read_body(body)).await {
        Ok(res) => res?,
        Err(_) => {
            log::info!(
                "Client failed to transmit body in {}s",
                BODY_TIMEOUT.as_secs()
            );

            return Err(StatusCodeError::request_timeout().into());
        }
    };

    let body = if bytes.is_empty() {
        None
    } else {
        match String::from_utf8(bytes) {
            Ok(body) => Some(body),
            Err(err) => return Err(StatusCodeError::bad_request().message(err).into()),
        }
    };

    let mut headers = HashMap::new();
    for (name, value) in parts.headers.iter() {
        match value.to_str() {
            Ok(value) => {
                headers.insert(name.as_str().to_owned(), value.to_owned());
            }
            Err(_) => log::debug!("Dropping non-ASCII header {}", name),
        }
    }

    Ok(Event {
        http_method: parts.method.as_str().to_owned(),
        headers,
        body,
        query_string_parameters: parts.uri.query().map(parse_query_string),
    })
}

/// Returns the value of the "Content-Length" header, if present.
fn content_length(headers: &HeaderMap) -> std::result::Result<Option<u64>, Error> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };

    match value.to_str().ok().and_then(|value| value.parse().ok()) {
        Some(length) => Ok(Some(length)),
        None => {
            log::debug!("Malformed \"Content-Length\" header: {:?}", value);

            Err(StatusCodeError::bad_request().into())
        }
    }
}

async fn read_body(mut body: Body) -> std::result::Result<Vec<u8>, Error> {
    let mut buf = Vec::new();

    while let Some(chunk) = body.data().await {
        let chunk = chunk?;

        if buf.len() + chunk.len() > MAX_BODY_SIZE {
            return Err(StatusCodeError::payload_too_large().into());
        }

        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}

fn into_hyper(resp: EventResponse) -> hyper::Response<Body> {
    let mut res = hyper::Response::new(Body::from(resp.body));
    *res.status_mut() =
        StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in resp.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                res.headers_mut().insert(name, value);
            }
            _ => log::warn!("Dropping invalid response header {}: {:?}", name, value),
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hyper::{Body, Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::watch;
    use tourney_api::{Event, EventResponse};

    use super::{into_event, into_hyper, serve, service_root};
    use crate::State;

    #[tokio::test]
    async fn test_into_event() {
        let req = Request::post("/tournaments?search=dota%20cup&status=open")
            .header("X-User-Id", "3")
            .body(Body::from(r#"{"action":"create"}"#))
            .unwrap();

        let event: Event = into_event(req).await.unwrap();
        assert_eq!(event.http_method, "POST");
        assert_eq!(event.get_header("X-User-Id"), Some("3"));
        assert_eq!(event.get_query("search"), Some("dota cup"));
        assert_eq!(event.get_query("status"), Some("open"));
        assert_eq!(event.body.as_deref(), Some(r#"{"action":"create"}"#));

        let req = Request::get("/tournaments").body(Body::empty()).unwrap();
        let event = into_event(req).await.unwrap();
        assert_eq!(event.body, None);
        assert_eq!(event.query_string_parameters, None);
    }

    #[tokio::test]
    async fn test_into_event_rejects() {
        let req = Request::post("/auth")
            .header("Content-Length", "20000")
            .body(Body::empty())
            .unwrap();
        match into_event(req).await {
            Err(crate::Error::StatusCodeError(err)) => {
                assert_eq!(err.code, StatusCode::PAYLOAD_TOO_LARGE)
            }
            res => panic!("expected 413, got {:?}", res),
        }

        let req = Request::post("/auth")
            .body(Body::from(vec![0xff, 0xfe]))
            .unwrap();
        match into_event(req).await {
            Err(crate::Error::StatusCodeError(err)) => {
                assert_eq!(err.code, StatusCode::BAD_REQUEST)
            }
            res => panic!("expected 400, got {:?}", res),
        }
    }

    #[tokio::test]
    async fn test_service_root_routes() {
        let state = State::memory();

        let req = Request::get("/unknown").body(Body::empty()).unwrap();
        let resp = service_root(req, state.clone()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = Request::get("/tournaments").body(Body::empty()).unwrap();
        let resp = service_root(req, state.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");

        let req = Request::get("/auth").body(Body::empty()).unwrap();
        let resp = service_root(req, state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_into_hyper() {
        let resp = into_hyper(EventResponse {
            status_code: 409,
            headers: [("Content-Type".to_owned(), "application/json".to_owned())].into(),
            body: r#"{"error":"dup"}"#.to_owned(),
        });

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(resp.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_serve_drains_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, State::memory(), rx));

        let body = r#"{"action": "create", "name": "Late Cup"}"#;
        let (head, tail) = body.split_at(10);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                format!(
                    "POST /tournaments HTTP/1.1\r\nHost: localhost\r\n\
                     Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    head
                )
                .as_bytes(),
            )
            .await
            .unwrap();

        // Let the request reach the handler before shutting down.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        stream.write_all(tail.as_bytes()).await.unwrap();

        let mut resp = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut resp))
            .await
            .unwrap()
            .unwrap();
        assert!(resp.starts_with("HTTP/1.1 200"), "{}", resp);
        assert!(resp.contains("Late Cup"));

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
        drop(tx);
    }
}
