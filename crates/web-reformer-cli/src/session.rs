//! Cookie-carrying HTTP session built on reqwest.
//!
//! Responses come back fully buffered as [`BufferedResponse`]s so they can be
//! wrapped in a [`web_reformer::ResponseView`] on the calling thread.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use url::Url;
use web_reformer::{write_body, BufferedResponse, FormRecord, PreparedRequest};

use crate::config::SessionConfig;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An HTTP client whose cookie jar persists across requests.
#[derive(Clone)]
pub struct WebSession {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl WebSession {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, jar })
    }

    /// GET a page.
    pub async fn get(&self, url: &Url) -> Result<BufferedResponse> {
        tracing::debug!("GET {url}");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        buffer(resp).await
    }

    /// Send a prepared request as-is.
    pub async fn send(&self, request: PreparedRequest) -> Result<BufferedResponse> {
        if !request.is_consistent() {
            bail!(
                "declared content length {:?} does not match {} body bytes",
                request.content_length,
                request.body.len()
            );
        }

        let method = Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("invalid HTTP method {:?}", request.method))?;
        tracing::debug!("{method} {} ({} body bytes)", request.url, request.body.len());

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let resp = builder
            .body(request.body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", request.url))?;
        buffer(resp).await
    }

    /// Submit a form found on `page_url`.
    ///
    /// `method` overrides the form's own method. Without either, forms are
    /// submitted with GET as browsers do.
    pub async fn submit_form(
        &self,
        page_url: &Url,
        form: &FormRecord,
        method: Option<Method>,
    ) -> Result<BufferedResponse> {
        let mut target = form
            .resolve_action(page_url)
            .with_context(|| format!("invalid form action {:?}", form.action))?;

        let method = match method {
            Some(m) => m,
            None if form.method.trim().is_empty() => Method::GET,
            None => Method::from_bytes(form.method.trim().to_uppercase().as_bytes())
                .with_context(|| format!("invalid form method {:?}", form.method))?,
        };
        let query = form.fields.to_query_string();

        if method == Method::GET {
            target.set_query(Some(&query));
            return self.get(&target).await;
        }

        let mut request =
            PreparedRequest::new(method.as_str(), target).header(CONTENT_TYPE.as_str(), FORM_URLENCODED);
        write_body(&mut request, &query).context("failed to write form body")?;
        self.send(request).await
    }

    /// Number of cookies the jar would send to `url`.
    pub fn cookie_count(&self, url: &Url) -> usize {
        self.cookies_for(&[url]).len()
    }

    /// Cookies the jar would send to any of `urls`, as `(host, name)` pairs.
    pub fn cookies_for(&self, urls: &[&Url]) -> BTreeSet<(String, String)> {
        let mut seen = BTreeSet::new();
        for url in urls {
            let host = url.host_str().unwrap_or_default();
            let Some(header) = self.jar.cookies(url) else {
                continue;
            };
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                let name = pair.split_once('=').map_or(pair, |(name, _)| name).trim();
                if !name.is_empty() {
                    seen.insert((host.to_string(), name.to_string()));
                }
            }
        }
        seen
    }
}

async fn buffer(resp: reqwest::Response) -> Result<BufferedResponse> {
    let status = resp.status().as_u16();
    let final_url = resp.url().to_string();
    let headers: Vec<(String, String)> = resp
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body = resp
        .bytes()
        .await
        .with_context(|| format!("failed to read body of {final_url}"))?;

    tracing::debug!("{status} {final_url} ({} bytes)", body.len());
    Ok(BufferedResponse::new(final_url, status, body.to_vec()).with_headers(headers))
}
