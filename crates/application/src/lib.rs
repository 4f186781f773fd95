//! Admin request handling for the catalog.
//!
//! [`handle`] takes one parsed request through the form dispatcher and, when
//! nothing was submitted, renders the screen it asks for.

pub mod dispatch;
pub mod html;
pub mod list_table;
pub mod network;
pub mod redirect;
pub mod request;
pub mod screens;
pub mod table;

use catalog_core::{CatalogConfig, CompositeId, Identity, SiteDirectory, Thumbnailer};
use catalog_storage::Storage;

pub use dispatch::{form_submit, is_form_submission, resolve_catalog_user};
pub use network::Network;
pub use redirect::{ExportFormat, Response, location, login_landing, requested_format};
pub use request::{Method, Request};
pub use table::{CatalogRow, CatalogTable};

use crate::screens::{EditProfileView, EditTagsView, Screen, route_screen};

/// Collaborators supplied by the hosting platform.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub sites: &'a dyn SiteDirectory,
    pub images: &'a dyn Thumbnailer,
    pub identity: &'a dyn Identity,
}

/// User-facing messages raised while handling a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    messages: Vec<String>,
}

impl Notices {
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn handle(
    storage: &Storage,
    host: Host<'_>,
    config: &CatalogConfig,
    request: &Request,
    notices: &mut Notices,
) -> anyhow::Result<Response> {
    if let Some(response) = form_submit(storage, host, config, request, notices)? {
        return Ok(response);
    }

    let Some(viewer) = host.identity.current_user() else {
        return Ok(Response::denied());
    };
    let owner = resolve_catalog_user(request, host.identity).unwrap_or(viewer);
    let admin_url = config.admin_url();

    let page = match route_screen(request.current_action()) {
        Screen::List => {
            let catalog = storage.catalog(owner);
            CatalogTable::prepare(&catalog, host, config, request)?.render_page()
        }
        Screen::EditTags => {
            let Some(id) = request
                .param("ID")
                .and_then(|id| id.parse::<CompositeId>().ok())
            else {
                return Ok(redirect::redirect_for(request, &admin_url));
            };
            if !host.identity.can_edit_user(viewer, id.user) {
                return Ok(Response::denied());
            }
            EditTagsView::load(&storage.catalog(id.user), &host, id, viewer)?.render(&admin_url)
        }
        Screen::EditProfile => {
            EditProfileView::load(&storage.catalog(owner), &host, viewer)?.render(&admin_url)
        }
        Screen::Handled => return Ok(redirect::redirect_for(request, &admin_url)),
    };
    Ok(Response::Page(page))
}
