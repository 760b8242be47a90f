//! Incoming HTTP request type.

use http::Method;

/// An incoming HTTP request, as handed to a handler.
///
/// The server builds one per request from the wire; tests and in-process
/// callers build them with [`Request::new`] and the `with_*` methods.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Adds a header in place. Middleware uses this to annotate the request
    /// before handing it to the next handler.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Snapshot of everything but the body.
    ///
    /// Endwares run after the handler has consumed the request, so they see
    /// this copy instead.
    pub fn head(&self) -> Head {
        Head {
            method: self.method.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Method, path, query and headers of a [`Request`], without its body.
#[derive(Clone, Debug)]
pub struct Head {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
}

impl Head {
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_keeps_everything_but_the_body() {
        let req = Request::new(Method::POST, "/users")
            .with_query("page=2")
            .with_header("X-Request-Id", "42")
            .with_body("payload");

        let head = req.head();
        assert_eq!(head.method(), &Method::POST);
        assert_eq!(head.path(), "/users");
        assert_eq!(head.query(), Some("page=2"));
        assert_eq!(head.header("x-request-id"), Some("42"));
        assert_eq!(req.body(), b"payload");
    }
}
