//! Callback URL reconstruction and validation
//!
//! The provider redirects the browser to the registered redirect URI with
//! `code` and `state` appended. The redirect URI may already carry its own
//! query (e.g. `?callback=1`), so the parameters are merged into the existing
//! query rather than concatenated onto the string.

use url::Url;

use crate::error::{Error, Result};

/// Rebuild the full callback URL for a received `code` and `state`.
///
/// Existing `code`/`state` pairs on `redirect_uri` are replaced; every other
/// pair is preserved in order.
pub fn authorization_response_url(redirect_uri: &Url, code: &str, state: &str) -> Url {
    let retained: Vec<(String, String)> = redirect_uri
        .query_pairs()
        .filter(|(k, _)| k != "code" && k != "state")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = redirect_uri.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.extend_pairs(retained);
        pairs.append_pair("code", code);
        pairs.append_pair("state", state);
    }
    url
}

/// Extract the authorization code from a callback URL.
///
/// The URL's `state` must equal `expected_state`; anything else means the
/// response was not produced for this login.
pub fn parse_authorization_response(url: &Url, expected_state: &str) -> Result<String> {
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let state = state.ok_or(Error::MissingParameter("state"))?;
    if state != expected_state {
        return Err(Error::StateMismatch);
    }
    code.ok_or(Error::MissingParameter("code"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_into_redirect_uri_with_existing_query() {
        let redirect = Url::parse("http://localhost:8501/?callback=1").unwrap();
        let url = authorization_response_url(&redirect, "abc123", "xyz");
        assert_eq!(
            url.as_str(),
            "http://localhost:8501/?callback=1&code=abc123&state=xyz"
        );
    }

    #[test]
    fn builds_query_when_redirect_uri_has_none() {
        let redirect = Url::parse("https://app.example.com/cb").unwrap();
        let url = authorization_response_url(&redirect, "abc123", "xyz");
        assert_eq!(url.as_str(), "https://app.example.com/cb?code=abc123&state=xyz");
    }

    #[test]
    fn replaces_stale_code_and_state() {
        let redirect = Url::parse("https://app.example.com/cb?code=old&x=1&state=old").unwrap();
        let url = authorization_response_url(&redirect, "new", "s2");
        assert_eq!(url.as_str(), "https://app.example.com/cb?x=1&code=new&state=s2");
    }

    #[test]
    fn escapes_received_values() {
        let redirect = Url::parse("https://app.example.com/cb").unwrap();
        let url = authorization_response_url(&redirect, "a&b=c", "s t");
        let code = parse_authorization_response(&url, "s t").unwrap();
        assert_eq!(code, "a&b=c");
    }

    #[test]
    fn parse_rejects_state_mismatch() {
        let url = Url::parse("https://app.example.com/cb?code=abc&state=other").unwrap();
        let err = parse_authorization_response(&url, "expected").unwrap_err();
        assert!(matches!(err, Error::StateMismatch), "got: {err:?}");
    }

    #[test]
    fn parse_requires_code() {
        let url = Url::parse("https://app.example.com/cb?state=expected").unwrap();
        let err = parse_authorization_response(&url, "expected").unwrap_err();
        assert!(matches!(err, Error::MissingParameter("code")), "got: {err:?}");
    }
}
