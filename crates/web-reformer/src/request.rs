//! Writing string bodies into outgoing requests.

use std::io::{self, Write};

use url::Url;

/// An outgoing request that accepts a body.
pub trait OutgoingRequest {
    fn set_content_length(&mut self, len: u64);

    /// Stream the body is written into.
    fn request_stream(&mut self) -> io::Result<Box<dyn Write + '_>>;
}

/// UTF-8 encode `text`, set the content length and write it as the body.
pub fn write_body<R: OutgoingRequest + ?Sized>(request: &mut R, text: &str) -> io::Result<()> {
    let bytes = text.as_bytes();
    request.set_content_length(bytes.len() as u64);

    let mut stream = request.request_stream()?;
    stream.write_all(bytes)?;
    stream.flush()
}

/// A transport-neutral request description, filled in before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl PreparedRequest {
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into(),
            url,
            headers: Vec::new(),
            content_length: None,
            body: Vec::new(),
        }
    }

    pub fn post(url: Url) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the declared content length agrees with the written body.
    pub fn is_consistent(&self) -> bool {
        self.content_length
            .map_or(true, |len| len == self.body.len() as u64)
    }
}

impl OutgoingRequest for PreparedRequest {
    fn set_content_length(&mut self, len: u64) {
        self.content_length = Some(len);
    }

    fn request_stream(&mut self) -> io::Result<Box<dyn Write + '_>> {
        Ok(Box::new(&mut self.body))
    }
}
