//! Redirect responses and landing-page rules.

use catalog_core::{ADMIN_PAGE, CatalogConfig, UserId};

use crate::Host;
use crate::request::Request;

pub const PERMISSION_DENIED: &str = "You do not have permission to do that.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `303 See Other` with a `Location` header.
    Redirect(String),
    /// Output was already flushed; the browser is sent on by script.
    Script { location: String, body: String },
    /// Access denied; nothing was changed.
    Denied(String),
    Page(String),
}

impl Response {
    pub fn status(&self) -> u16 {
        match self {
            Response::Redirect(_) => 303,
            Response::Denied(_) => 403,
            Response::Script { .. } | Response::Page(_) => 200,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Response::Redirect(location) | Response::Script { location, .. } => Some(location),
            Response::Denied(_) | Response::Page(_) => None,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Response::Redirect(_) => "",
            Response::Script { body, .. } => body,
            Response::Denied(body) | Response::Page(body) => body,
        }
    }

    pub fn denied() -> Self {
        Response::Denied(PERMISSION_DENIED.to_string())
    }
}

/// Drops every character that may not appear in a URL.
pub fn sanitize_url(href: &str) -> String {
    const ALLOWED: &str = "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=";
    href.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || ALLOWED.contains(*ch))
        .collect()
}

/// Sends the browser to `href`, by header when still possible.
pub fn location(href: &str, headers_sent: bool) -> Response {
    let href = sanitize_url(href);
    if !headers_sent {
        return Response::Redirect(href);
    }

    let literal = serde_json::to_string(&href)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/");
    let body = format!(
        "<script type='text/javascript'>\n// <![CDATA[\nwindow.location = {literal};\n// ]]>\n</script>\n"
    );
    Response::Script {
        location: href,
        body,
    }
}

/// Redirect for the request, honouring whether headers already went out.
pub fn redirect_for(request: &Request, href: &str) -> Response {
    location(href, request.headers_sent)
}

/// Where a user lands after logging in.
///
/// Network admins keep the default; everyone else goes to the catalog page of
/// their primary site, or to signup when they have none.
pub fn login_landing(
    default_to: &str,
    user: Option<UserId>,
    host: &Host<'_>,
    config: &CatalogConfig,
) -> String {
    let Some(user) = user else {
        return default_to.to_string();
    };

    let main_site = host.sites.main_site();
    if host.identity.is_super_admin(user) || host.identity.is_member_of(user, main_site) {
        return default_to.to_string();
    }

    match host.identity.primary_site(user) {
        Some(site) => format!(
            "{}wp-admin/index.php?page={ADMIN_PAGE}",
            host.sites.site_url(site)
        ),
        None => config.signup_url(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xhtml,
    Wxr,
}

impl ExportFormat {
    pub fn from_query_var(value: &str) -> Option<Self> {
        match value {
            "xhtml" => Some(ExportFormat::Xhtml),
            "wxr" => Some(ExportFormat::Wxr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xhtml => "xhtml",
            ExportFormat::Wxr => "wxr",
        }
    }
}

/// Export format asked for through the `format` endpoint, if any.
pub fn requested_format(request: &Request) -> Option<ExportFormat> {
    request.param("format").and_then(ExportFormat::from_query_var)
}
