//! The transport-facing side of a completed response.

use std::io::{self, Cursor, Read};

/// One completed network response.
///
/// The body can be opened once; extraction buffers it on first use and
/// never asks again.
pub trait ResponseHandle {
    /// Open the body stream. Single use.
    fn open_stream(&mut self) -> io::Result<Box<dyn Read + '_>>;

    /// HTTP status code.
    fn status(&self) -> u16;

    /// Final URL after redirects, if known.
    fn url(&self) -> Option<&str> {
        None
    }

    /// Response headers.
    fn headers(&self) -> &[(String, String)] {
        &[]
    }
}

/// A response whose body is already held in memory.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl BufferedResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Body-only response, handy for tests and local files.
    pub fn from_body(body: impl Into<Vec<u8>>) -> Self {
        Self::new("", 200, body)
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the body has already been handed out.
    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }
}

impl ResponseHandle for BufferedResponse {
    fn open_stream(&mut self) -> io::Result<Box<dyn Read + '_>> {
        match self.body.take() {
            Some(body) => Ok(Box::new(Cursor::new(body))),
            None => Err(io::Error::other("response stream already consumed")),
        }
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn url(&self) -> Option<&str> {
        if self.url.is_empty() {
            None
        } else {
            Some(&self.url)
        }
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_is_single_use() {
        let mut resp = BufferedResponse::from_body("hello");
        let mut body = String::new();
        resp.open_stream().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "hello");
        assert!(resp.is_consumed());
        assert!(resp.open_stream().is_err());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let resp = BufferedResponse::new("https://example.com/", 200, "")
            .with_headers(vec![("Content-Type".into(), "text/html".into())]);
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.url(), Some("https://example.com/"));
        assert_eq!(resp.status(), 200);
    }
}
