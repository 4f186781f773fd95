//! Screen routing and the two edit forms.

use catalog_core::{
    ADMIN_PAGE, CompositeId, PROFILE_ABOUT, PROFILE_LOGO, Profile, TagGroup, UserId,
    tag_group_name_key, tags_to_string,
};
use catalog_storage::Catalog;

use crate::Host;
use crate::dispatch::FORM_NONCE_ACTION;
use crate::html::{esc_attr, esc_html, esc_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    EditTags,
    EditProfile,
    /// `add` and `remove` are handled as submissions and never render.
    Handled,
}

pub fn route_screen(action: Option<&str>) -> Screen {
    match action {
        Some("edit_tags") => Screen::EditTags,
        Some("edit_profile") => Screen::EditProfile,
        Some("add" | "remove") => Screen::Handled,
        _ => Screen::List,
    }
}

fn hidden(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\" />",
        esc_attr(name),
        esc_attr(value)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupField {
    pub group: TagGroup,
    pub label: String,
    /// Current tags, comma joined.
    pub value: String,
}

/// Everything the tag form shows for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EditTagsView {
    pub id: CompositeId,
    pub title: String,
    pub featured: i64,
    pub groups: Vec<GroupField>,
    pub nonce: String,
}

impl EditTagsView {
    pub fn load(
        catalog: &Catalog<'_>,
        host: &Host<'_>,
        id: CompositeId,
        viewer: UserId,
    ) -> anyhow::Result<Self> {
        let profile = catalog.get_profile()?;
        let featured = catalog
            .get_entry(id.site)?
            .map(|entry| entry.featured)
            .unwrap_or_default();
        let title = host
            .sites
            .metadata(id.site)
            .map(|meta| meta.title.filter(|title| !title.is_empty()).unwrap_or(meta.name))
            .unwrap_or_default();

        let mut groups = Vec::new();
        for group in TagGroup::all() {
            groups.push(GroupField {
                group,
                label: group_label(&profile, group),
                value: tags_to_string(&catalog.get_tags_by_entry(id.site, group)?),
            });
        }

        Ok(Self {
            id,
            title,
            featured,
            groups,
            nonce: host.identity.create_nonce(viewer, FORM_NONCE_ACTION),
        })
    }

    pub fn render(&self, admin_url: &str) -> String {
        let mut html = format!(
            "<div class=\"wrap\"><h2>Edit Tags: {}</h2><form method=\"post\" action=\"{}\">",
            esc_html(&self.title),
            esc_url(admin_url)
        );
        html.push_str(&hidden("page", ADMIN_PAGE));
        html.push_str(&hidden("action", "edit_tags"));
        html.push_str(&hidden("ID", &self.id.to_string()));
        html.push_str(&hidden("user_id", &self.id.user.to_string()));
        html.push_str(&hidden("blog_id", &self.id.site.to_string()));
        html.push_str(&hidden("_wpnonce", &self.nonce));
        html.push_str("<table class=\"form-table\">");
        for field in &self.groups {
            let name = field.group.form_field();
            html.push_str(&format!(
                "<tr><th><label for=\"{name}\">{}</label></th><td><input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\" class=\"regular-text\" /></td></tr>",
                esc_html(&field.label),
                esc_attr(&field.value)
            ));
        }
        html.push_str(&format!(
            "<tr><th><label for=\"featured\">Featured</label></th><td><input type=\"number\" id=\"featured\" name=\"featured\" value=\"{}\" min=\"0\" /></td></tr>",
            self.featured
        ));
        html.push_str("</table><p class=\"submit\"><input type=\"submit\" class=\"button-primary\" value=\"Save\" /></p></form></div>");
        html
    }
}

fn group_label(profile: &Profile, group: TagGroup) -> String {
    profile
        .tag_group_name(group)
        .unwrap_or_else(|| format!("Tag {group}"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditProfileView {
    pub user: UserId,
    pub profile: Profile,
    pub nonce: String,
}

impl EditProfileView {
    pub fn load(catalog: &Catalog<'_>, host: &Host<'_>, viewer: UserId) -> anyhow::Result<Self> {
        Ok(Self {
            user: catalog.user_id(),
            profile: catalog.get_profile()?,
            nonce: host.identity.create_nonce(viewer, FORM_NONCE_ACTION),
        })
    }

    pub fn render(&self, admin_url: &str) -> String {
        let mut html = format!(
            "<div class=\"wrap\"><h2>Edit My Catalog Profile</h2><form method=\"post\" action=\"{}\">",
            esc_url(admin_url)
        );
        html.push_str(&hidden("page", ADMIN_PAGE));
        html.push_str(&hidden("action", "edit_profile"));
        html.push_str(&hidden("user_id", &self.user.to_string()));
        html.push_str(&hidden("_wpnonce", &self.nonce));
        html.push_str("<table class=\"form-table\">");
        html.push_str(&format!(
            "<tr><th><label for=\"{PROFILE_ABOUT}\">About</label></th><td><textarea id=\"{PROFILE_ABOUT}\" name=\"{PROFILE_ABOUT}\" rows=\"5\" cols=\"30\">{}</textarea></td></tr>",
            esc_html(&self.profile.about())
        ));
        html.push_str(&format!(
            "<tr><th><label for=\"{PROFILE_LOGO}\">Logo</label></th><td><input type=\"url\" id=\"{PROFILE_LOGO}\" name=\"{PROFILE_LOGO}\" value=\"{}\" class=\"regular-text\" /></td></tr>",
            esc_attr(&self.profile.logo())
        ));
        for group in TagGroup::all() {
            let name = self.profile.tag_group_name(group).unwrap_or_default();
            let key = tag_group_name_key(group.get());
            html.push_str(&format!(
                "<tr><th><label for=\"{key}\">Tag {group} name</label></th><td><input type=\"text\" id=\"{key}\" name=\"{key}\" value=\"{}\" class=\"regular-text\" /></td></tr>",
                esc_attr(&name)
            ));
        }
        html.push_str("</table><p class=\"submit\"><input type=\"submit\" class=\"button-primary\" value=\"Save\" /></p></form></div>");
        html
    }
}
