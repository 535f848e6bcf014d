//! Single retry on access token expiration.
//!
//! The FDM API answers `401 Unauthorized` or `408` once the access token is expired. The
//! wrapped operation is replayed once with a refreshed pair; any other failure, or a failure of
//! the replay, goes back to the caller untouched.
use crate::auth::{TokenPair, TokenRefresher};
use crate::error::{Error, Result};

const TOKEN_EXPIRED_STATUS_CODES: [u16; 2] = [401, 408];

/// Everything an authenticated call needs to reach the device.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub hostname: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for RequestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestParams")
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}

impl RequestParams {
    pub fn new(hostname: &str, tokens: &TokenPair) -> Self {
        RequestParams {
            hostname: hostname.to_owned(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }

    fn with_tokens(&self, tokens: TokenPair) -> Self {
        RequestParams {
            hostname: self.hostname.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

pub fn is_token_expired(error: &Error) -> bool {
    error
        .status_code()
        .map(|code| TOKEN_EXPIRED_STATUS_CODES.contains(&code))
        .unwrap_or(false)
}

/// Wraps `operation` so that an expired token is refreshed and the call replayed exactly once.
///
/// # Examples
///
/// ```
/// use ftd_core::auth::{TokenPair, TokenRefresher};
/// use ftd_core::error::{Error, Result};
/// use ftd_core::retry::{RequestParams, retry_on_token_expiration};
///
/// struct Refresher;
///
/// impl TokenRefresher for Refresher {
///     fn refresh(&self, _: &str, _: &str) -> Result<TokenPair> {
///         Ok(TokenPair {
///             access_token: "fresh".to_owned(),
///             refresh_token: "fresh-refresh".to_owned(),
///         })
///     }
/// }
///
/// let refresher = Refresher;
/// let mut get = retry_on_token_expiration(&refresher, |params: &RequestParams| {
///     if params.access_token == "fresh" {
///         Ok(params.access_token.clone())
///     } else {
///         Err(Error::server(401, b"token expired"))
///     }
/// });
///
/// let params = RequestParams {
///     hostname: "ftd.local".to_owned(),
///     access_token: "stale".to_owned(),
///     refresh_token: "refresh".to_owned(),
/// };
/// assert_eq!(get(params).unwrap(), "fresh");
/// ```
pub fn retry_on_token_expiration<'a, R, F, T>(
    refresher: &'a R,
    mut operation: F,
) -> impl FnMut(RequestParams) -> Result<T> + 'a
where
    R: TokenRefresher + ?Sized,
    F: FnMut(&RequestParams) -> Result<T> + 'a,
{
    move |params: RequestParams| match operation(&params) {
        Err(e) if is_token_expired(&e) => {
            debug!("access token expired ({e}), refreshing and retrying once");
            let tokens = refresher.refresh(&params.hostname, &params.refresh_token)?;
            operation(&params.with_tokens(tokens))
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct CountingRefresher {
        calls: Cell<u32>,
        fail: bool,
    }

    impl TokenRefresher for CountingRefresher {
        fn refresh(&self, hostname: &str, refresh_token: &str) -> Result<TokenPair> {
            assert_eq!(hostname, "ftd.local");
            assert_eq!(refresh_token, "refresh-0");
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::server(400, b"invalid refresh token"));
            }
            Ok(TokenPair {
                access_token: "access-1".to_owned(),
                refresh_token: "refresh-1".to_owned(),
            })
        }
    }

    fn params() -> RequestParams {
        RequestParams {
            hostname: "ftd.local".to_owned(),
            access_token: "access-0".to_owned(),
            refresh_token: "refresh-0".to_owned(),
        }
    }

    #[test]
    fn test_success_without_refresh() {
        let refresher = CountingRefresher::default();
        let mut op = retry_on_token_expiration(&refresher, |_: &RequestParams| Ok(42));

        assert_eq!(op(params()).unwrap(), 42);
        assert_eq!(refresher.calls.get(), 0);
    }

    #[test]
    fn test_retry_once_on_401() {
        let refresher = CountingRefresher::default();
        let seen_tokens = RefCell::new(Vec::new());
        let mut op = retry_on_token_expiration(&refresher, |p: &RequestParams| {
            seen_tokens.borrow_mut().push(p.access_token.clone());
            if p.access_token == "access-0" {
                Err(Error::server(401, b"Unauthorized"))
            } else {
                Ok("done")
            }
        });

        assert_eq!(op(params()).unwrap(), "done");
        drop(op);
        assert_eq!(refresher.calls.get(), 1);
        assert_eq!(seen_tokens.into_inner(), vec!["access-0", "access-1"]);
    }

    #[test]
    fn test_retry_once_on_408() {
        let refresher = CountingRefresher::default();
        let mut op = retry_on_token_expiration(&refresher, |p: &RequestParams| {
            if p.refresh_token == "refresh-0" {
                Err(Error::server(408, b"token expired"))
            } else {
                Ok(p.refresh_token.clone())
            }
        });

        assert_eq!(op(params()).unwrap(), "refresh-1");
        assert_eq!(refresher.calls.get(), 1);
    }

    #[test]
    fn test_no_refresh_on_500() {
        let refresher = CountingRefresher::default();
        let calls = Cell::new(0);
        let mut op = retry_on_token_expiration(&refresher, |_: &RequestParams| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::server(500, b"Internal Server Error"))
        });

        let err = op(params()).unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(refresher.calls.get(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_retry_failure_is_propagated_without_loop() {
        let refresher = CountingRefresher::default();
        let calls = Cell::new(0);
        let mut op = retry_on_token_expiration(&refresher, |_: &RequestParams| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::server(401, b"still unauthorized"))
        });

        let err = op(params()).unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(refresher.calls.get(), 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_refresh_failure_is_propagated() {
        let refresher = CountingRefresher {
            fail: true,
            ..Default::default()
        };
        let calls = Cell::new(0);
        let mut op = retry_on_token_expiration(&refresher, |_: &RequestParams| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::server(401, b"Unauthorized"))
        });

        let err = op(params()).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_non_server_error_is_not_retried() {
        let refresher = CountingRefresher::default();
        let mut op = retry_on_token_expiration(&refresher, |_: &RequestParams| -> Result<()> {
            Err(Error::new(ErrorKind::ConnectionError, "connection refused"))
        });

        assert_eq!(op(params()).unwrap_err().kind(), ErrorKind::ConnectionError);
        assert_eq!(refresher.calls.get(), 0);
    }

    #[test]
    fn test_refreshed_tokens_are_not_kept_between_calls() {
        let refresher = CountingRefresher::default();
        let mut op = retry_on_token_expiration(&refresher, |p: &RequestParams| {
            if p.access_token == "access-0" {
                Err(Error::server(401, b"Unauthorized"))
            } else {
                Ok(())
            }
        });

        op(params()).unwrap();
        op(params()).unwrap();
        assert_eq!(refresher.calls.get(), 2);
    }

    #[test]
    fn test_debug_hides_tokens() {
        assert!(!format!("{:?}", params()).contains("access-0"));
    }
}
