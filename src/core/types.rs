//! # Core Types Module
//!
//! Per-request data carried between the middleware layer, the router and the
//! upstream forwarder. Nothing here outlives a single request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The bearer credential taken from the caller's `Authorization` header.
///
/// It is never decoded or checked. An empty token means the caller sent no
/// usable header and the request is forwarded anonymously.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedToken(String);

impl CarriedToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    /// The anonymous token forwarded when no bearer header was supplied
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Tokens end up in span fields, so Display never prints the value itself.
impl fmt::Display for CarriedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<anonymous>")
        } else {
            write!(f, "<redacted:{} chars>", self.0.len())
        }
    }
}

/// Path parameters captured by a route pattern, already percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Look up a parameter. Names the pattern never declared are simply absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
