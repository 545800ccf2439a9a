//! Page inspection report: what a response offers to a scripted session.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use web_reformer::{FormRecord, ResponseHandle, ResponseView, TagRecord, INNER_TEXT_KEY};

/// Everything `reformer inspect` shows for one page.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub url: Option<String>,
    pub status: u16,
    /// Set when the body could not be parsed; every listing is then empty.
    pub document_error: Option<String>,
    pub forms: Vec<FormRecord>,
    pub links: Vec<TagRecord>,
    pub images: Vec<TagRecord>,
    pub tags: BTreeMap<String, Vec<TagRecord>>,
}

impl InspectReport {
    /// Build the report from a view. Extra `tag_names` get their own listing.
    pub fn build<H: ResponseHandle>(view: &ResponseView<H>, tag_names: &[String]) -> Self {
        let document_error = view.document().err().map(|e| e.to_string());

        let tags = tag_names
            .iter()
            .map(|name| (name.clone(), view.tags(name).as_ref().clone()))
            .collect();

        // Extraction may need the handle mutably, so release it before that.
        let (url, status) = {
            let handle = view.handle();
            (handle.url().map(str::to_string), handle.status())
        };

        Self {
            url,
            status,
            document_error,
            forms: view.forms().borrow().clone(),
            links: view.links().as_ref().clone(),
            images: view.images().as_ref().clone(),
            tags,
        }
    }

    /// Human-readable rendering.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}",
            self.status,
            self.url.as_deref().unwrap_or("<unknown url>")
        );
        if let Some(err) = &self.document_error {
            let _ = writeln!(out, "warning: {err}");
        }

        let _ = writeln!(out, "\nforms ({}):", self.forms.len());
        for form in &self.forms {
            let _ = writeln!(
                out,
                "  #{} name={:?} method={:?} action={:?}",
                display_or_dash(&form.id),
                form.name,
                form.method,
                form.action
            );
            for field in &form.fields {
                let _ = writeln!(out, "    {} = {:?}", display_or_dash(&field.name), field.value);
            }
        }

        render_listing(&mut out, "links", &self.links, "href");
        render_listing(&mut out, "images", &self.images, "src");
        for (name, records) in &self.tags {
            render_listing(&mut out, &format!("<{name}>"), records, "id");
        }
        out
    }
}

fn render_listing(out: &mut String, title: &str, records: &[TagRecord], key: &str) {
    let _ = writeln!(out, "\n{title} ({}):", records.len());
    for record in records {
        let target = record.get(key).map(String::as_str).unwrap_or("-");
        let text = record
            .get(INNER_TEXT_KEY)
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        if text.is_empty() {
            let _ = writeln!(out, "  {target}");
        } else {
            let _ = writeln!(out, "  {target}  {text}");
        }
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use web_reformer::BufferedResponse;

    const PAGE: &str = r#"<html><body>
        <a href="/docs">Read   the
           docs</a>
        <img src="/logo.png">
        <form id="login_form" action="/login" method="post">
          <input name="email" value="">
        </form>
        <table id="prices"></table>
    </body></html>"#;

    fn report(body: &[u8], tags: &[String]) -> InspectReport {
        let view = ResponseView::new(BufferedResponse::new("https://example.com/", 200, body));
        InspectReport::build(&view, tags)
    }

    #[test]
    fn test_build_collects_everything() {
        let r = report(PAGE.as_bytes(), &["table".to_string()]);
        assert_eq!(r.status, 200);
        assert!(r.document_error.is_none());
        assert_eq!(r.forms.len(), 1);
        assert_eq!(r.links.len(), 1);
        assert_eq!(r.images.len(), 1);
        assert_eq!(r.tags["table"][0]["id"], "prices");
    }

    #[test]
    fn test_render_text() {
        let text = report(PAGE.as_bytes(), &[]).render_text();
        assert!(text.starts_with("200 https://example.com/"));
        assert!(text.contains("#login_form name=\"\" method=\"post\" action=\"/login\""));
        assert!(text.contains("    email = \"\""));
        assert!(text.contains("  /docs  Read the docs"));
        assert!(text.contains("images (1):\n  /logo.png"));
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let r = report(b"<a href=x>\xFF</a>", &[]);
        assert!(r.document_error.as_deref().unwrap().contains("UTF-8"));
        assert!(r.links.is_empty());
        assert!(r.render_text().contains("warning:"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report(PAGE.as_bytes(), &[])).unwrap();
        assert_eq!(json["forms"][0]["id"], "login_form");
        assert_eq!(json["forms"][0]["fields"][0]["name"], "email");
        assert_eq!(json["links"][0]["href"], "/docs");
    }
}
