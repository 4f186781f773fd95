//! Core domain types for the catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod fields;
mod host;
mod tags;

pub use fields::{
    ColumnRole, ColumnSpec, ENTRY_COLUMNS, EntryChanges, FieldType, FieldValue, Fields,
    PROFILE_ABOUT, PROFILE_LOGO, Profile, ProfileKey, absint, parse_float_prefix,
    parse_int_prefix, profile_keys, sanitize_profile, tag_group_name_key,
};
pub use host::{Elevated, Identity, SiteDirectory, SiteMetadata, Thumbnailer};
pub use tags::{normalize_tag, string_to_tags, strip_tags, tags_to_string, title_case};

/// Slug of the admin page every catalog form posts back to.
pub const ADMIN_PAGE: &str = "pb_catalog";

/// Highest tag group number; groups are numbered from 1.
pub const MAX_TAG_GROUP: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected `user:site`, got {0:?}")]
    CompositeId(String),
    #[error("tag group must be between 1 and {MAX_TAG_GROUP}, got {0:?}")]
    TagGroup(String),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SiteId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `"userId:siteId"` identifier used for table rows and bulk selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub user: UserId,
    pub site: SiteId,
}

impl CompositeId {
    pub fn new(user: UserId, site: SiteId) -> Self {
        Self { user, site }
    }
}

impl std::fmt::Display for CompositeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user, self.site)
    }
}

impl std::str::FromStr for CompositeId {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::CompositeId(value.to_string());
        let (user, site) = value.trim().split_once(':').ok_or_else(err)?;
        let user = user.trim().parse::<i64>().map_err(|_| err())?;
        let site = site.trim().parse::<i64>().map_err(|_| err())?;
        if user <= 0 || site <= 0 {
            return Err(err());
        }
        Ok(Self::new(UserId(user), SiteId(site)))
    }
}

/// One of the independent tag categories applied to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagGroup(u8);

impl TagGroup {
    pub fn new(value: u8) -> Option<Self> {
        (1..=MAX_TAG_GROUP).contains(&value).then_some(Self(value))
    }

    pub fn all() -> impl Iterator<Item = TagGroup> {
        (1..=MAX_TAG_GROUP).map(TagGroup)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Column slug in the admin table, e.g. `tag_1`.
    pub fn column(&self) -> String {
        format!("tag_{}", self.0)
    }

    /// Request field carrying the comma-delimited tags of this group.
    pub fn form_field(&self) -> String {
        format!("tags_{}", self.0)
    }
}

impl std::fmt::Display for TagGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagGroup {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(TagGroup::new)
            .ok_or_else(|| ParseError::TagGroup(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub user_id: UserId,
    pub site_id: SiteId,
    pub deleted: bool,
    pub featured: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Flag the rows so normal reads skip them.
    Soft,
    /// Physically remove the rows. Irreversible.
    Hard(Elevated),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub site_url: String,
    pub plugin_url: String,
    pub signup_url: Option<String>,
    pub per_page: usize,
}

pub const DEFAULT_PER_PAGE: usize = 1000;

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".to_string(),
            plugin_url: "http://localhost/wp-content/plugins/pressbooks/".to_string(),
            signup_url: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl CatalogConfig {
    pub fn normalize(&mut self) {
        self.site_url = self.site_url.trim().trim_end_matches('/').to_string();
        self.plugin_url = self.plugin_url.trim().to_string();
        if !self.plugin_url.ends_with('/') {
            self.plugin_url.push('/');
        }
        self.signup_url = self
            .signup_url
            .take()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        self.per_page = self.per_page.clamp(1, 10_000);
    }

    /// Absolute URL of the catalog admin page.
    pub fn admin_url(&self) -> String {
        format!("{}/wp-admin/index.php?page={ADMIN_PAGE}", self.site_url)
    }

    pub fn default_cover_url(&self) -> String {
        format!("{}assets/images/default-book-cover-65x0.jpg", self.plugin_url)
    }

    pub fn signup_url(&self) -> String {
        match &self.signup_url {
            Some(url) => url.clone(),
            None => format!("{}/wp-signup.php", self.site_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_id_parses_and_prints() {
        let id: CompositeId = "3:17".parse().unwrap();
        assert_eq!(id, CompositeId::new(UserId(3), SiteId(17)));
        assert_eq!(id.to_string(), "3:17");
        assert_eq!(" 3 : 17 ".parse::<CompositeId>().unwrap(), id);
    }

    #[test]
    fn composite_id_rejects_garbage() {
        assert!("".parse::<CompositeId>().is_err());
        assert!("3".parse::<CompositeId>().is_err());
        assert!("a:b".parse::<CompositeId>().is_err());
        assert!("0:4".parse::<CompositeId>().is_err());
        assert!("4:-1".parse::<CompositeId>().is_err());
    }

    #[test]
    fn tag_groups_are_bounded() {
        assert!(TagGroup::new(0).is_none());
        assert!(TagGroup::new(MAX_TAG_GROUP + 1).is_none());
        let groups: Vec<u8> = TagGroup::all().map(|g| g.get()).collect();
        assert_eq!(groups, vec![1, 2]);
        assert_eq!("2".parse::<TagGroup>().unwrap().column(), "tag_2");
        assert!("9".parse::<TagGroup>().is_err());
    }

    #[test]
    fn config_normalizes_urls() {
        let mut config = CatalogConfig {
            site_url: " http://books.test/ ".to_string(),
            plugin_url: "http://books.test/plugin".to_string(),
            signup_url: Some(" ".to_string()),
            per_page: 0,
        };
        config.normalize();
        assert_eq!(
            config.admin_url(),
            "http://books.test/wp-admin/index.php?page=pb_catalog"
        );
        assert_eq!(
            config.default_cover_url(),
            "http://books.test/plugin/assets/images/default-book-cover-65x0.jpg"
        );
        assert_eq!(config.signup_url(), "http://books.test/wp-signup.php");
        assert_eq!(config.per_page, 1);
    }
}
