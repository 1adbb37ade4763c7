//! Request context used to resolve cache variance.

use std::collections::HashMap;

use crate::route::RouteValue;

/// Read-only view of the request data a render can vary on.
///
/// Header, cookie and query lookups are case-insensitive. Route values are
/// matched exactly.
pub trait RequestView {
    /// Get a header value. Multiple values for the same name are joined with `,`.
    fn header(&self, name: &str) -> Option<String>;

    /// Get a cookie value.
    fn cookie(&self, name: &str) -> Option<&str>;

    /// Get a query parameter. Repeated keys are joined with `,`.
    fn query(&self, name: &str) -> Option<String>;

    /// Get a route value.
    fn route_value(&self, name: &str) -> Option<&RouteValue>;

    /// Name of the authenticated user, if any.
    fn user_name(&self) -> Option<&str>;
}

/// Extracted route values (e.g., `id` from `/products/{id}`).
pub type RouteValues = HashMap<String, RouteValue>;

/// Authenticated principal attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Principal name.
    pub name: String,
    /// Whether the principal is authenticated.
    pub authenticated: bool,
}

impl UserIdentity {
    /// Create an authenticated identity.
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
        }
    }

    /// Create an anonymous identity.
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            authenticated: false,
        }
    }
}

/// Concrete request context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path.
    pub path: String,
    /// Headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Cookies in arrival order.
    pub cookies: Vec<(String, String)>,
    /// Query parameters in arrival order.
    pub query: Vec<(String, String)>,
    /// Route values.
    pub route_values: RouteValues,
    /// Current user.
    pub user: Option<UserIdentity>,
}

impl RequestContext {
    /// Create a new request context for a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Parse and add every parameter of a raw query string (`a=1&b=2`).
    ///
    /// A leading `?` is ignored. Pairs without `=` get an empty value.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.query.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Set a route value.
    pub fn with_route_value(mut self, name: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.route_values.insert(name.into(), value.into());
        self
    }

    /// Set the current user.
    pub fn with_user(mut self, user: UserIdentity) -> Self {
        self.user = Some(user);
        self
    }
}

fn joined_matches(pairs: &[(String, String)], name: &str) -> Option<String> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

impl RequestView for RequestContext {
    fn header(&self, name: &str) -> Option<String> {
        joined_matches(&self.headers, name)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn query(&self, name: &str) -> Option<String> {
        joined_matches(&self.query, name)
    }

    fn route_value(&self, name: &str) -> Option<&RouteValue> {
        self.route_values.get(name)
    }

    fn user_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .filter(|u| u.authenticated)
            .map(|u| u.name.as_str())
    }
}
