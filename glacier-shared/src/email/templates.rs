/// Transactional email templates
///
/// Every template wraps a small HTML body in the shared layout of
/// [`EmailTemplates::base_template`] and derives the plain-text alternative
/// from that body with [`inline_text`].
///
/// Values that come from users (names, titles, comment text) are
/// HTML-escaped before interpolation.

use chrono::{Datelike, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::models::task::DigestItem;

const ACCENT_COLOR: &str = "#2563eb";

static BOLD_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?(strong|b)>").unwrap());
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>\n?").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a [^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// A rendered message: HTML plus its plain-text alternative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailBody {
    pub html: String,
    pub text: String,
}

/// Converts an HTML fragment into readable plain text
///
/// Bold markers become `*`, `<br>` becomes a newline, runs of three or more
/// newlines collapse to two, links become `text (url)` and remaining tags
/// are dropped.
pub fn inline_text(html: &str) -> String {
    let text = BOLD_TAG_RE.replace_all(html, "*");
    let text = BREAK_RE.replace_all(&text, "\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    let text = LINK_RE.replace_all(&text, "$2 ($1)");
    let text = TAG_RE.replace_all(&text, "");
    text.trim().to_string()
}

/// Escapes the five HTML-significant characters
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn cta(href: &str, label: &str) -> String {
    format!(
        r#"<a class="btn" href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        escape_html(href),
        label
    )
}

/// Template renderer bound to a product name and client URL
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    app_name: String,
    app_url: String,
}

impl EmailTemplates {
    pub fn new(app_name: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_url: app_url.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Wraps `body_html` in the shared layout
    pub fn base_template(&self, title: &str, preheader: &str, body_html: &str) -> EmailBody {
        let year = Utc::now().year();
        let app_name = escape_html(&self.app_name);
        let title = escape_html(title);
        let preheader = escape_html(preheader);

        let html = format!(
            r#"<!doctype html>
<html>
  <head>
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
    <title>{title}</title>
    <style>
      body {{ background-color: #f6f9fc; margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; }}
      .container {{ max-width: 600px; margin: 0 auto; padding: 24px 16px; }}
      .card {{ background: #ffffff; border-radius: 12px; overflow: hidden; box-shadow: 0 2px 8px rgba(0,0,0,0.06); }}
      .header {{ padding: 20px 24px; background: {ACCENT_COLOR}; color: #ffffff; }}
      .header h1 {{ margin: 0; font-size: 20px; font-weight: 700; }}
      .content {{ padding: 24px; color: #0f172a; line-height: 1.6; }}
      .content h2 {{ margin-top: 0; font-size: 18px; }}
      .btn {{ display: inline-block; padding: 10px 16px; border-radius: 8px; background: {ACCENT_COLOR}; color: #ffffff !important; text-decoration: none; font-weight: 600; }}
      .muted {{ color: #64748b; }}
      .footer {{ padding: 16px 24px; color: #64748b; font-size: 12px; background: #f8fafc; }}
    </style>
  </head>
  <body>
    <span style="display:none!important;opacity:0;color:transparent;max-height:0;max-width:0;overflow:hidden">{preheader}</span>
    <div class="container">
      <div class="card">
        <div class="header">
          <h1>{title}</h1>
        </div>
        <div class="content">
          {body_html}
        </div>
        <div class="footer">
          <div class="muted">&copy; {year} {app_name}. All rights reserved.</div>
        </div>
      </div>
    </div>
  </body>
</html>"#
        );

        EmailBody {
            html,
            text: inline_text(body_html),
        }
    }

    pub fn welcome(&self, user_name: &str, dashboard_url: Option<&str>) -> EmailBody {
        let url = dashboard_url.unwrap_or(&self.app_url);
        let name = if user_name.is_empty() { "there" } else { user_name };
        let body = format!(
            r#"
    <h2>Welcome, {name}</h2>
    <p>We're excited to have you on {app}. Here are a few things you can do next:</p>
    <ol>
      <li>Create your first team</li>
      <li>Invite your teammates</li>
      <li>Start tracking tasks</li>
    </ol>
    <p>{button}</p>
    <p class="muted">If the button doesn't work, copy and paste this URL into your browser: {url}</p>
"#,
            name = escape_html(name),
            app = escape_html(&self.app_name),
            button = cta(url, "Open Dashboard"),
            url = escape_html(url),
        );

        self.base_template(
            &format!("Welcome to {}", self.app_name),
            &format!("Let's get you set up on {}", self.app_name),
            &body,
        )
    }

    pub fn password_reset(&self, reset_url: &str) -> EmailBody {
        let body = format!(
            r#"
    <h2>Reset your password</h2>
    <p>We received a request to reset your password. Click the button below to continue.</p>
    <p>{button}</p>
    <p class="muted">If you didn't request this, you can ignore this email.</p>
    <p class="muted">If the button doesn't work, copy and paste this URL: {url}</p>
"#,
            button = cta(reset_url, "Reset Password"),
            url = escape_html(reset_url),
        );

        self.base_template(
            &format!("{} - Password Reset", self.app_name),
            "Password reset link inside",
            &body,
        )
    }

    pub fn team_invite(&self, inviter_name: &str, team_name: &str, accept_url: &str) -> EmailBody {
        let body = format!(
            r#"
    <h2>Team invitation</h2>
    <p><strong>{inviter}</strong> invited you to join <strong>{team}</strong> on {app}.</p>
    <p>{button}</p>
    <p class="muted">If the button doesn't work, copy and paste this URL: {url}</p>
"#,
            inviter = escape_html(inviter_name),
            team = escape_html(team_name),
            app = escape_html(&self.app_name),
            button = cta(accept_url, "Accept Invitation"),
            url = escape_html(accept_url),
        );

        self.base_template(
            &format!("{} - Team Invitation", self.app_name),
            &format!("{} invited you to a team", inviter_name),
            &body,
        )
    }

    pub fn task_assigned(&self, creator_name: &str, title: &str, open_url: Option<&str>) -> EmailBody {
        let button = open_url
            .map(|url| format!("<p>{}</p>", cta(url, "View Task")))
            .unwrap_or_default();
        let body = format!(
            r#"
    <h2>New task assigned</h2>
    <p><strong>{creator}</strong> assigned you a task:</p>
    <p><strong>{title}</strong></p>
    {button}
"#,
            creator = escape_html(creator_name),
            title = escape_html(title),
        );

        self.base_template(
            &format!("{} - Task Assigned", self.app_name),
            &format!("{} assigned you a task", creator_name),
            &body,
        )
    }

    pub fn comment_added(
        &self,
        commenter_name: &str,
        task_title: &str,
        comment: &str,
        open_url: Option<&str>,
    ) -> EmailBody {
        let button = open_url
            .map(|url| format!("<p>{}</p>", cta(url, "View Task")))
            .unwrap_or_default();
        let body = format!(
            r#"
    <h2>New comment</h2>
    <p><strong>{commenter}</strong> commented on <strong>{title}</strong>:</p>
    <blockquote>{comment}</blockquote>
    {button}
"#,
            commenter = escape_html(commenter_name),
            title = escape_html(task_title),
            comment = escape_html(comment),
        );

        self.base_template(
            &format!("{} - New Comment", self.app_name),
            &format!("{} commented on {}", commenter_name, task_title),
            &body,
        )
    }

    /// `period` is `Daily` or `Weekly`
    pub fn digest(&self, period: &str, items: &[DigestItem]) -> EmailBody {
        let list: String = items
            .iter()
            .map(|item| {
                format!(
                    "<li>{} ({}, {})</li>",
                    escape_html(&item.title),
                    item.status,
                    item.priority
                )
            })
            .collect();
        let body = format!(
            r#"
    <h2>{app} {period} Digest</h2>
    <p>Recent activity:</p>
    <ul>{list}</ul>
"#,
            app = escape_html(&self.app_name),
        );

        self.base_template(
            &format!("{} - {} Digest", self.app_name, period),
            &format!("Your {} summary", period.to_lowercase()),
            &body,
        )
    }
}
