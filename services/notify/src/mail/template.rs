//! Mail body rendering. Bodies are fully rendered at enqueue time; the
//! dispatch worker delivers them verbatim.

use std::fmt::Write as _;

use crate::mail::events::RenderedMail;

const FOOTER: &str = "This is an automated notification from the helpdesk system.";

/// Per-audience deep link into the web app.
pub fn ticket_link(base_url: &str, ticket_id: i64, is_admin: bool) -> String {
    let base = base_url.trim_end_matches('/');
    if is_admin {
        format!("{base}/admin/tickets/{ticket_id}")
    } else {
        format!("{base}/tickets/{ticket_id}")
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the plain-text and HTML bodies for a translated event.
pub fn render_bodies(
    rendered: &RenderedMail,
    link_url: &str,
    link_label: &str,
) -> (String, String) {
    let mut lines: Vec<(String, String)> = rendered
        .fields
        .iter()
        .map(|(label, value)| ((*label).to_owned(), value.clone()))
        .collect();
    lines.push(("Status".to_owned(), rendered.status_label.clone()));
    lines.push(("Priority".to_owned(), rendered.priority_label.clone()));

    let mut text = String::new();
    let _ = writeln!(text, "{}", rendered.subject);
    let _ = writeln!(text);
    let _ = writeln!(text, "{}", rendered.summary);
    let _ = writeln!(text);
    for (label, value) in &lines {
        let _ = writeln!(text, "{label}: {value}");
    }
    let _ = writeln!(text);
    let _ = writeln!(text, "{link_label}: {link_url}");
    let _ = writeln!(text);
    let _ = write!(text, "{FOOTER}");

    let mut rows = String::new();
    for (label, value) in &lines {
        let _ = write!(
            rows,
            r#"<tr><td style="padding: 4px 12px 4px 0; color: #6b7280;">{}</td><td style="padding: 4px 0;">{}</td></tr>"#,
            escape_html(label),
            escape_html(value),
        );
    }
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #1f2937;">
  <p style="margin: 0 0 4px 0; font-size: 12px; color: #6b7280;">{alert_type}</p>
  <h2 style="margin: 0 0 12px 0;">{summary}</h2>
  <table style="border-collapse: collapse; margin: 0 0 16px 0;">{rows}</table>
  <p style="margin: 0 0 16px 0;">
    <a href="{link_url}" style="color: #1d4ed8; font-weight: 600;">{link_label}</a>
  </p>
  <hr style="border: none; border-top: 1px solid #e5e7eb; margin: 16px 0;" />
  <p style="margin: 0; font-size: 12px; color: #6b7280;">{FOOTER}</p>
</div>"#,
        alert_type = escape_html(&rendered.alert_type),
        summary = escape_html(&rendered.summary),
        link_url = escape_html(link_url),
        link_label = escape_html(link_label),
    );

    (text, html)
}
