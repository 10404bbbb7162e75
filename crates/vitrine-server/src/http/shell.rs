//! Server-rendered shell pages.
//!
//! The current branding is injected as CSS custom properties on `:root` so
//! every styled element picks up the primary and derived contrast colors
//! without a rebuild.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::time::Instant;
use vitrine_model::BrandingState;

use super::{propagated_request_id, with_request_id};
use crate::AppState;

pub(crate) async fn shell_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let branding = state.branding.current().await;
    let body = render_page(
        &branding,
        "Vitrine",
        r#"<section class="hero">
      <h1>Welcome to Vitrine</h1>
      <p>A small storefront demo. Sign up, log in, and try a checkout.</p>
      <nav><a href="/pricing">Pricing</a></nav>
    </section>
    <section class="surfaces">
      <h2>Demo surfaces</h2>
      <ul>
        <li><code>POST /api/signup</code> create an account</li>
        <li><code>POST /api/token</code> log in</li>
        <li><code>GET /api/me</code> / <code>PATCH /api/me</code> view and edit the profile</li>
        <li><code>POST /api/checkout</code> simulate a payment</li>
        <li><code>POST /api/runs</code> trigger a traffic run</li>
      </ul>
    </section>"#,
    );
    state
        .metrics
        .observe_request("/", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(Html(body).into_response(), &request_id)
}

pub(crate) async fn pricing_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let branding = state.branding.current().await;
    let body = render_page(
        &branding,
        "Pricing - Vitrine",
        r#"<section class="pricing">
      <h1>Pricing</h1>
      <ul>
        <li><strong>Starter</strong> free</li>
        <li><strong>Team</strong> $19.99/mo</li>
      </ul>
      <nav><a href="/">Home</a></nav>
    </section>"#,
    );
    state
        .metrics
        .observe_request("/pricing", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(Html(body).into_response(), &request_id)
}

/// Default logo referenced by the out-of-the-box branding state.
pub(crate) async fn default_logo_handler() -> Response {
    const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 32 32"><rect width="32" height="32" rx="6" fill="currentColor"/><text x="16" y="21" font-size="14" text-anchor="middle" fill="#fff">V</text></svg>"##;
    (
        StatusCode::OK,
        [("content-type", "image/svg+xml")],
        LOGO_SVG,
    )
        .into_response()
}

fn render_page(branding: &BrandingState, title: &str, main: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    :root {{
      --primary-color: {primary};
      --contrast-color: {contrast};
    }}
    body {{ font-family: sans-serif; margin: 0; }}
    header {{ background: var(--primary-color); color: var(--contrast-color); padding: 1rem; }}
    header img {{ height: 2rem; vertical-align: middle; }}
    a {{ color: var(--primary-color); }}
    main {{ padding: 1rem; }}
  </style>
</head>
<body>
  <header>
    <img src="{logo}" alt="{domain} logo">
    <span>{domain}</span>
  </header>
  <main>
    {main}
  </main>
</body>
</html>
"#,
        primary = escape_html(&branding.primary_color),
        contrast = escape_html(&branding.contrast_color),
        logo = escape_html(&branding.logo_url),
        domain = escape_html(&branding.domain),
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_exposes_branding_as_css_variables() {
        let branding = BrandingState::apply(&vitrine_model::BrandingInput {
            logo_url: "https://cdn.example/logo.png".to_string(),
            primary_color: "#FAFAFA".to_string(),
            domain: "acme.test".to_string(),
        });
        let page = render_page(&branding, "t", "<p>x</p>");
        assert!(page.contains("--primary-color: #FAFAFA;"));
        assert!(page.contains("--contrast-color: #000000;"));
        assert!(page.contains(r#"src="https://cdn.example/logo.png""#));
    }

    #[test]
    fn branding_values_are_html_escaped() {
        let branding = BrandingState::apply(&vitrine_model::BrandingInput {
            logo_url: r#""><script>"#.to_string(),
            primary_color: "#123456".to_string(),
            domain: "a<b".to_string(),
        });
        let page = render_page(&branding, "t", "");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("a&lt;b"));
    }
}
