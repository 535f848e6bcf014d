use crate::error::{Error, ErrorKind, Result};

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Successful answer, body fully read.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body parsed as JSON; an empty body is `null`.
    pub fn json(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends one HTTP request.
///
/// Implementations must return a [`ErrorKind::ServerError`] carrying the status code and body
/// for any non-2xx answer.
pub trait Transport {
    fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<HttpResponse>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, validate_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!validate_certs)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;
        Ok(ReqwestTransport { client })
    }
}

fn to_header_map(headers: &[(&str, &str)]) -> Result<HeaderMap> {
    headers
        .iter()
        .map(|(k, v)| {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
            let value = HeaderValue::from_str(v).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
            Ok::<_, Error>((name, value))
        })
        .collect()
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<HttpResponse> {
        debug!("{method} {url}");
        let mut request_builder = self
            .client
            .request(method.into(), url)
            .headers(to_header_map(headers)?)
            .header("Accept", "application/json");

        if let Some(body) = body {
            trace!("request body: {body}");
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        trace!("response {status}: {}", String::from_utf8_lossy(&body));

        if !(200..300).contains(&status) {
            return Err(Error::server(status, &body));
        }
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub mod fake {
    //! Scripted transport for unit tests.
    use super::*;

    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Request {
        pub method: HttpMethod,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Value>,
    }

    impl Request {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Answers requests in order from a queue of `(status, body)` pairs.
    ///
    /// Clones share the queue and the request log.
    #[derive(Default, Clone)]
    pub struct FakeTransport {
        responses: Rc<RefCell<VecDeque<(u16, Value)>>>,
        requests: Rc<RefCell<Vec<Request>>>,
    }

    impl FakeTransport {
        pub fn new(responses: Vec<(u16, Value)>) -> Self {
            FakeTransport {
                responses: Rc::new(RefCell::new(responses.into())),
                requests: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn push(&self, status: u16, body: Value) {
            self.responses.borrow_mut().push_back((status, body));
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.borrow().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl Transport for FakeTransport {
        fn send(
            &self,
            method: HttpMethod,
            url: &str,
            headers: &[(&str, &str)],
            body: Option<&Value>,
        ) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(Request {
                method,
                url: url.to_owned(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.cloned(),
            });
            let (status, body) = self.responses.borrow_mut().pop_front().ok_or_else(|| {
                Error::new(
                    ErrorKind::ConnectionError,
                    format!("no scripted response for {method} {url}"),
                )
            })?;
            let body = match body {
                Value::Null => Vec::new(),
                Value::String(s) => s.into_bytes(),
                other => other.to_string().into_bytes(),
            };
            if !(200..300).contains(&status) {
                return Err(Error::server(status, &body));
            }
            Ok(HttpResponse { status, body })
        }
    }
}
