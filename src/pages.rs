//! Server-rendered HTML for links opened from emails.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

const RESET_TEMPLATE: &str = include_str!("../templates/reset.html");
const LINK_ERROR_TEMPLATE: &str = include_str!("../templates/link_error.html");

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Substitutes `{{key}}` placeholders with HTML-escaped values.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{{key}}}}}"), &escape_html(value))
    })
}

pub fn reset_page(email: &str, token: &str) -> Html<String> {
    Html(render(RESET_TEMPLATE, &[("email", email), ("token", token)]))
}

pub fn link_error_page(status: StatusCode, message: &str) -> Response {
    (status, Html(render(LINK_ERROR_TEMPLATE, &[("message", message)]))).into_response()
}
