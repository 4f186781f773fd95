//! Form submissions on the catalog admin page.
//!
//! Every branch checks that the acting user may edit the target user and that
//! the form nonce is valid, then redirects back to the list. Bad input never
//! fails the request; it degrades to a redirect or a denial.

use catalog_core::{
    ADMIN_PAGE, CatalogConfig, CompositeId, DeleteMode, EntryChanges, Identity, SiteId, TagGroup,
    UserId, absint, string_to_tags,
};
use catalog_storage::Storage;

use crate::redirect::{Response, redirect_for};
use crate::request::{Request, add_query_arg, add_search_params_to_url};
use crate::{Host, Notices};

pub const BULK_NONCE_ACTION: &str = "bulk-books";
/// Nonce action of the tag and profile forms.
pub const FORM_NONCE_ACTION: &str = "pb-user-catalog";
pub const SETTINGS_SAVED: &str = "Settings saved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkAction {
    Add,
    Remove,
}

/// Whether the request is a submission to handle before any screen renders.
pub fn is_form_submission(request: &Request) -> bool {
    if request.param("page") != Some(ADMIN_PAGE) {
        return false;
    }
    request.has_body() || request.is_current_action("add") || request.is_current_action("remove")
}

/// The user whose catalog the request acts on.
///
/// `user_id` from the request when the current user may edit that user,
/// otherwise the current user. `None` when nobody is logged in.
pub fn resolve_catalog_user(request: &Request, identity: &dyn Identity) -> Option<UserId> {
    let current = identity.current_user()?;
    let requested = request
        .non_empty("user_id")
        .map(absint)
        .filter(|id| *id > 0)
        .map(UserId);
    match requested {
        Some(target) if identity.can_edit_user(current, target) => Some(target),
        _ => Some(current),
    }
}

/// Back to the list, keeping search, sort and page, plus `user_id` when
/// acting for someone else.
fn list_url(config: &CatalogConfig, request: &Request, target: UserId, current: UserId) -> String {
    let url = add_search_params_to_url(&config.admin_url(), request);
    if target == current {
        url
    } else {
        add_query_arg(&url, "user_id", &target.to_string())
    }
}

fn nonce_is_valid(host: &Host<'_>, current: UserId, action: &str, request: &Request) -> bool {
    let nonce = request.param("_wpnonce").unwrap_or_default();
    host.identity.verify_nonce(current, action, nonce)
}

fn deny(current: UserId, target: UserId, reason: &str) -> Response {
    tracing::warn!(%current, %target, reason, "catalog request denied");
    Response::denied()
}

/// Handles the submission, or returns `None` when there is nothing to handle.
pub fn form_submit(
    storage: &Storage,
    host: Host<'_>,
    config: &CatalogConfig,
    request: &Request,
    notices: &mut Notices,
) -> anyhow::Result<Option<Response>> {
    if !is_form_submission(request) {
        return Ok(None);
    }
    let Some(current) = host.identity.current_user() else {
        tracing::warn!("catalog form submitted without a logged in user");
        return Ok(Some(Response::denied()));
    };

    let response = match request.current_action() {
        Some(action @ ("add" | "remove")) => {
            let action = if action == "add" {
                BulkAction::Add
            } else {
                BulkAction::Remove
            };
            bulk_entries(storage, &host, config, request, notices, current, action)?
        }
        Some("edit_tags") => edit_tags(storage, &host, config, request, notices, current)?,
        Some("edit_profile") => edit_profile(storage, &host, config, request, notices, current)?,
        _ => return Ok(None),
    };
    Ok(Some(response))
}

fn bulk_entries(
    storage: &Storage,
    host: &Host<'_>,
    config: &CatalogConfig,
    request: &Request,
    notices: &mut Notices,
    current: UserId,
    action: BulkAction,
) -> anyhow::Result<Response> {
    let selected = request.list("book");
    let (ids, nonce_action) = if !selected.is_empty() {
        (selected, BULK_NONCE_ACTION)
    } else if let Some(id) = request.non_empty("ID") {
        (vec![id], id)
    } else {
        let target = resolve_catalog_user(request, host.identity).unwrap_or(current);
        return Ok(redirect_for(request, &list_url(config, request, target, current)));
    };

    let Ok(first) = ids[0].parse::<CompositeId>() else {
        tracing::debug!(id = %ids[0], "malformed selection ignored");
        let target = resolve_catalog_user(request, host.identity).unwrap_or(current);
        return Ok(redirect_for(request, &list_url(config, request, target, current)));
    };
    let target = first.user;
    if !host.identity.can_edit_user(current, target) {
        return Ok(deny(current, target, "no edit rights"));
    }
    if !nonce_is_valid(host, current, nonce_action, request) {
        return Ok(deny(current, target, "bad nonce"));
    }

    let catalog = storage.catalog(target);
    let mut changed = 0;
    for raw in &ids {
        let id = match raw.parse::<CompositeId>() {
            Ok(id) if id.user == target => id,
            _ => {
                tracing::debug!(id = *raw, "skipping bulk id");
                continue;
            }
        };
        match action {
            BulkAction::Add => catalog.save_entry(id.site, EntryChanges::default())?,
            BulkAction::Remove => {
                catalog.delete_entry(id.site, DeleteMode::Soft)?;
            }
        }
        changed += 1;
    }
    tracing::info!(%current, %target, ?action, changed, "catalog entries updated");

    notices.push(SETTINGS_SAVED);
    Ok(redirect_for(request, &list_url(config, request, target, current)))
}

/// Entry addressed by `ID`, with `user_id` and `blog_id` taking precedence.
fn edited_entry(request: &Request, current: UserId) -> (UserId, SiteId) {
    let (user, site) = request
        .param("ID")
        .and_then(|id| id.split_once(':'))
        .map(|(user, site)| (absint(user), absint(site)))
        .unwrap_or((0, 0));
    let user = match request.absint("user_id") {
        0 => user,
        id => id,
    };
    let site = match request.absint("blog_id") {
        0 => site,
        id => id,
    };
    let user = if user > 0 { UserId(user) } else { current };
    (user, SiteId(site))
}

fn edit_tags(
    storage: &Storage,
    host: &Host<'_>,
    config: &CatalogConfig,
    request: &Request,
    notices: &mut Notices,
    current: UserId,
) -> anyhow::Result<Response> {
    let (target, site) = edited_entry(request, current);
    if !host.identity.can_edit_user(current, target) {
        return Ok(deny(current, target, "no edit rights"));
    }
    if !nonce_is_valid(host, current, FORM_NONCE_ACTION, request) {
        return Ok(deny(current, target, "bad nonce"));
    }
    let back = list_url(config, request, target, current);
    if site.0 <= 0 {
        return Ok(redirect_for(request, &back));
    }

    let catalog = storage.catalog(target);
    catalog.save_entry(site, EntryChanges::featured(request.absint("featured")))?;
    for group in TagGroup::all() {
        catalog.delete_tags_for_group(site, group)?;
        let field = group.form_field();
        for tag in string_to_tags(request.param(&field).unwrap_or_default()) {
            catalog.save_tag(&tag, site, group)?;
        }
    }
    tracing::info!(%current, %target, %site, "catalog tags replaced");

    notices.push(SETTINGS_SAVED);
    Ok(redirect_for(request, &back))
}

fn edit_profile(
    storage: &Storage,
    host: &Host<'_>,
    config: &CatalogConfig,
    request: &Request,
    notices: &mut Notices,
    current: UserId,
) -> anyhow::Result<Response> {
    let target = match request.absint("user_id") {
        0 => current,
        id => UserId(id),
    };
    if !host.identity.can_edit_user(current, target) {
        return Ok(deny(current, target, "no edit rights"));
    }
    if !nonce_is_valid(host, current, FORM_NONCE_ACTION, request) {
        return Ok(deny(current, target, "bad nonce"));
    }

    let saved = storage.catalog(target).save_profile(&request.body_fields())?;
    tracing::info!(%current, %target, saved, "catalog profile saved");

    notices.push(SETTINGS_SAVED);
    Ok(redirect_for(request, &list_url(config, request, target, current)))
}
