//! One logical request and the network attempts it may take.

use http::Method;
use std::fmt;
use uuid::Uuid;

/// Which network attempt of a logical request this is.
///
/// A logical request makes at most two attempts: the original one and, after
/// a 402 challenge, one paid retry. There is no third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttemptNumber {
    First,
    Second,
}

impl AttemptNumber {
    pub fn next(self) -> Option<Self> {
        match self {
            AttemptNumber::First => Some(AttemptNumber::Second),
            AttemptNumber::Second => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            AttemptNumber::First => 1,
            AttemptNumber::Second => 2,
        }
    }
}

impl fmt::Display for AttemptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A request to the upstream, relative to the client's base URL.
///
/// Carries a UUIDv7 correlation id shared by both attempts of the same
/// logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttempt {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    correlation_id: Uuid,
    attempt: AttemptNumber,
}

impl RequestAttempt {
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            correlation_id: Uuid::now_v7(),
            attempt: AttemptNumber::First,
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds the parameter only when `value` is present.
    pub fn with_optional_query<K: Into<String>, V: ToString>(self, key: K, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// The same request as the next attempt, or `None` after the second.
    pub fn retry(&self) -> Option<Self> {
        let attempt = self.attempt.next()?;
        Some(Self {
            attempt,
            ..self.clone()
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn attempt(&self) -> AttemptNumber {
        self.attempt
    }
}
