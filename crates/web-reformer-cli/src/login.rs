//! Scripted login: fetch a page, fill in one of its forms, resubmit it with
//! the session's cookies, and optionally fetch an authenticated resource.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Method;
use url::Url;
use web_reformer::{BufferedResponse, FormRecord, ResponseHandle, ResponseView};

use crate::session::WebSession;

/// What to log in with.
#[derive(Debug, Clone)]
pub struct LoginPlan {
    /// Page that carries the login form.
    pub page_url: Url,
    /// `id` attribute of the form to submit.
    pub form_id: String,
    /// Field values to set before submitting.
    pub fields: Vec<(String, String)>,
    pub download: Option<Download>,
}

/// An authenticated resource to save after logging in.
#[derive(Debug, Clone)]
pub struct Download {
    pub url: Url,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The login response set no new cookies.
    Rejected,
    LoggedIn { new_cookies: usize },
    Downloaded { path: PathBuf, bytes: u64 },
    /// Logged in, but the download did not answer 200.
    DownloadFailed { status: u16 },
}

/// Parse `name=value` pairs as given on the command line.
pub fn parse_assignments(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|item| {
            item.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .with_context(|| format!("expected name=value, got {item:?}"))
        })
        .collect()
}

/// Locate the form with `form_id` on `page` and apply `values` to it.
///
/// The edit is made on the cached form list, so the returned snapshot and
/// any later `forms()` call on the same view agree.
pub fn fill_form(
    view: &ResponseView<BufferedResponse>,
    form_id: &str,
    values: &[(String, String)],
) -> Result<FormRecord> {
    let forms = view.forms();
    let mut forms = forms.borrow_mut();
    let available: Vec<String> = forms.iter().map(|f| format!("{:?}", f.id)).collect();

    let form = forms
        .iter_mut()
        .find(|f| f.id == form_id)
        .with_context(|| {
            format!(
                "no form with id {form_id:?} on the page (found: [{}])",
                available.join(", ")
            )
        })?;

    for (name, value) in values {
        form.fields.set(name, value.as_str());
    }
    Ok(form.clone())
}

/// Run the whole login flow.
pub async fn run_login(session: &WebSession, plan: &LoginPlan) -> Result<LoginOutcome> {
    let page = session.get(&plan.page_url).await?;
    let page_url = page
        .url()
        .and_then(|u| Url::parse(u).ok())
        .unwrap_or_else(|| plan.page_url.clone());

    let form = {
        let view = ResponseView::new(page);
        fill_form(&view, &plan.form_id, &plan.fields)?
    };
    let target = form
        .resolve_action(&page_url)
        .with_context(|| format!("invalid form action {:?}", form.action))?;

    let before = session.cookies_for(&[&page_url, &target]);
    tracing::info!(
        "submitting form {:?} with {} field(s) to {target}",
        form.id,
        form.fields.len()
    );
    let response = session
        .submit_form(&page_url, &form, Some(Method::POST))
        .await?;

    // A redirect may land the session cookie on a path or host that neither
    // the page nor the action URL would receive.
    let landed = response.url().and_then(|u| Url::parse(u).ok());
    let mut watched = vec![&page_url, &target];
    watched.extend(landed.as_ref());
    let after = session.cookies_for(&watched);

    let new_cookies = after.difference(&before).count();
    if new_cookies == 0 {
        tracing::warn!(
            "login response {} set no new cookies ({} before, {} after)",
            response.status(),
            before.len(),
            after.len()
        );
        return Ok(LoginOutcome::Rejected);
    }

    let Some(download) = &plan.download else {
        return Ok(LoginOutcome::LoggedIn { new_cookies });
    };

    let mut resource = session.get(&download.url).await?;
    if resource.status() != 200 {
        return Ok(LoginOutcome::DownloadFailed {
            status: resource.status(),
        });
    }

    let mut file = File::create(&download.output)
        .with_context(|| format!("failed to create {}", download.output.display()))?;
    let bytes = std::io::copy(&mut resource.open_stream()?, &mut file)
        .with_context(|| format!("failed to write {}", download.output.display()))?;
    tracing::info!("saved {bytes} bytes to {}", download.output.display());

    Ok(LoginOutcome::Downloaded {
        path: download.output.clone(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <form id="search"><input name="q"></form>
        <form id="login_form" action="/login" method="post">
          <input name="email" value="">
          <input name="pass" value="">
          <input type="hidden" name="lsd" value="AVq">
        </form>"#;

    #[test]
    fn test_parse_assignments() {
        let parsed =
            parse_assignments(&["email=me@example.com".to_string(), "q=a=b".to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("email".to_string(), "me@example.com".to_string()),
                ("q".to_string(), "a=b".to_string())
            ]
        );
        assert!(parse_assignments(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_fill_form_updates_cached_form() {
        let view = ResponseView::new(BufferedResponse::from_body(PAGE));
        let values = vec![
            ("email".to_string(), "me@example.com".to_string()),
            ("pass".to_string(), "pw".to_string()),
        ];
        let filled = fill_form(&view, "login_form", &values).unwrap();
        assert_eq!(filled.fields.get("email"), Some("me@example.com"));
        assert_eq!(filled.fields.get("lsd"), Some("AVq"));
        assert_eq!(view.form_by_id("login_form").unwrap(), filled);
    }

    #[test]
    fn test_fill_form_missing_id_lists_candidates() {
        let view = ResponseView::new(BufferedResponse::from_body(PAGE));
        let err = fill_form(&view, "signin", &[]).unwrap_err().to_string();
        assert!(err.contains("\"search\""));
        assert!(err.contains("\"login_form\""));
    }
}
