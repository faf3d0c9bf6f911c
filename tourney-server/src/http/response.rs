use std::collections::BTreeMap;

use hyper::StatusCode;
use serde::Serialize;
use tourney_api::EventResponse;

use crate::{Error, StatusCodeError};

// Envelope headers keep their canonical casing, callers may look them up verbatim.
const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
const ACCESS_CONTROL_ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
const ACCESS_CONTROL_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
const ACCESS_CONTROL_MAX_AGE: &str = "Access-Control-Max-Age";
const CONTENT_TYPE: &str = "Content-Type";

/// The CORS preflight answer of a handler.
#[derive(Copy, Clone, Debug)]
pub struct Cors {
    pub methods: &'static str,
    pub headers: &'static str,
}

impl Cors {
    /// Preflight results may be cached for 24h.
    const MAX_AGE: &'static str = "86400";

    /// 200 with an empty body and the allowed methods and headers.
    pub fn preflight(&self) -> Response {
        Response::ok()
            .header(ACCESS_CONTROL_ALLOW_METHODS, self.methods)
            .header(ACCESS_CONTROL_ALLOW_HEADERS, self.headers)
            .header(ACCESS_CONTROL_MAX_AGE, Self::MAX_AGE)
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn json<T>(mut self, body: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        self.body = serde_json::to_string(body)?;
        Ok(self.header(CONTENT_TYPE, "application/json"))
    }

    /// A `{"error": message}` response.
    pub fn error<T>(status: StatusCode, message: T) -> Self
    where
        T: ToString,
    {
        let body = serde_json::json!({ "error": message.to_string() });

        Self {
            status,
            headers: BTreeMap::new(),
            body: body.to_string(),
        }
        .header(CONTENT_TYPE, "application/json")
    }

    pub fn build(self) -> EventResponse {
        let mut headers = self.headers;
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN.to_owned(), "*".to_owned());

        EventResponse {
            status_code: self.status.as_u16(),
            headers,
            body: self.body,
        }
    }
}

/// Turns the outcome of a handler into the response envelope. Errors that are not meant for
/// the caller become a 500 and are logged.
pub fn finish(res: super::Result) -> EventResponse {
    let resp = match res {
        Ok(resp) => resp,
        Err(Error::StatusCodeError(StatusCodeError { code, message })) => {
            Response::error(code, message)
        }
        Err(Error::UniqueViolation(detail)) => Response::error(StatusCode::CONFLICT, detail),
        Err(err) => {
            log::error!("Failed to handle request: {}", err);

            Response::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Ошибка сервера: {}", err),
            )
        }
    };

    resp.build()
}
