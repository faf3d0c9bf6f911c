use std::collections::{BTreeMap, HashMap};

use http::method::InvalidMethod;
use http::Method;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize};

/// An incoming request in the serverless event shape.
///
/// Header lookups through [`Event::header`] are case-insensitive. A missing or blank body is
/// treated as an empty JSON object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default = "default_method")]
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl Event {
    pub fn new(method: Method) -> Self {
        Self {
            http_method: method.as_str().to_owned(),
            headers: HashMap::new(),
            body: None,
            query_string_parameters: None,
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

    pub fn body<T>(mut self, body: T) -> Self
    where
        T: Into<String>,
    {
        self.body = Some(body.into());
        self
    }

    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Parses the request method. Methods are case-sensitive, `post` is not `POST`.
    #[inline]
    pub fn method(&self) -> Result<Method, InvalidMethod> {
        Method::from_bytes(self.http_method.as_bytes())
    }

    /// Returns the value of the header `name`, ignoring ASCII case. An exact match wins over
    /// one that only differs in case.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value);
        }

        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the query parameter `name`. Empty values are reported as absent.
    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()?
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns the raw JSON body, substituting `{}` for a missing or blank body.
    pub fn body_str(&self) -> &str {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => "{}",
        }
    }
}

fn default_method() -> String {
    String::from("GET")
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes an `application/x-www-form-urlencoded` query string. Later keys override earlier
/// ones.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let decode = |s: &str| {
        let s = s.replace('+', " ");
        percent_decode_str(&s).decode_utf8_lossy().into_owned()
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// The response to an [`Event`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl EventResponse {
    /// Deserializes the JSON body.
    pub fn json<'a, T>(&'a self) -> serde_json::Result<T>
    where
        T: Deserialize<'a>,
    {
        serde_json::from_str(&self.body)
    }
}
