//! Cookie types exchanged with callers.

use std::fmt;
use std::time::SystemTime;

/// The kind of interface a cookie assignment arrives through.
///
/// An entry stored with `HttpOnly` may only be replaced or deleted through
/// the HTTP path; assignments from other interfaces leave it untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CookieSource {
    /// The assignment came from a `Set-Cookie` response header.
    Http,
    /// The assignment came from a non-HTTP interface, such as a scripting
    /// API exposed to page content.
    NonHttp,
}

/// One parsed `Set-Cookie` assertion.
///
/// Header parsing happens outside of this crate; an HTTP client hands the
/// jar the already decomposed fields.
#[derive(Clone, Debug, Default)]
pub struct SetCookie {
    /// The name of the cookie.
    pub name: String,
    /// The cookie value.
    pub value: String,
    /// The `Path` attribute value, if present.
    pub path: Option<String>,
    /// The `Domain` attribute value, if present.
    pub domain: Option<String>,
    /// The `Expires` attribute, already parsed to an instant.
    pub expires: Option<SystemTime>,
    /// The `Max-Age` attribute in seconds. Takes precedence over
    /// [`expires`](Self::expires); zero or a negative value deletes the
    /// cookie.
    pub max_age: Option<i64>,
    /// Whether the `Secure` attribute was present.
    pub secure: bool,
    /// Whether the `HttpOnly` attribute was present.
    pub http_only: bool,
}

impl SetCookie {
    /// Create an assertion for `name` and `value` with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the `Path` attribute.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the `Domain` attribute.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the `Expires` attribute.
    pub fn with_expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    /// Set the `Max-Age` attribute.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Mark the cookie `Secure`.
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Mark the cookie `HttpOnly`.
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }
}

/// A cookie as returned to callers.
///
/// [`CookieJar::cookies`](crate::CookieJar::cookies) fills in only the
/// fields that go on the wire in a request, `name` and `value`.
/// [`CookieJar::all_cookies`](crate::CookieJar::all_cookies) additionally
/// populates the scope fields.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cookie {
    /// The name of the cookie.
    pub name: String,
    /// The cookie value.
    pub value: String,
    /// The effective domain the cookie is scoped to.
    pub domain: String,
    /// The path prefix the cookie is scoped to.
    pub path: String,
    /// When the cookie expires. `None` for session cookies.
    pub expires: Option<SystemTime>,
    /// Whether the cookie is limited to secure schemes.
    pub secure: bool,
    /// Whether the cookie is limited to the HTTP interface.
    pub http_only: bool,
}

impl Cookie {
    /// Create a cookie with the given name and value and no scope
    /// information.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_wire_form() {
        assert_eq!(Cookie::new("foo", "bar").to_string(), "foo=bar");
        assert_eq!(Cookie::new("empty", "").to_string(), "empty=");
    }

    #[test]
    fn set_cookie_builders() {
        let cookie = SetCookie::new("foo", "bar")
            .with_path("/sub")
            .with_domain("example.com")
            .with_max_age(60)
            .secure()
            .http_only();

        assert_eq!(cookie.name, "foo");
        assert_eq!(cookie.value, "bar");
        assert_eq!(cookie.path.as_deref(), Some("/sub"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.max_age, Some(60));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert!(cookie.expires.is_none());
    }
}
