//! Services the host platform provides to the catalog.

use crate::{SiteId, UserId};

/// Cached descriptive metadata of one site (book).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMetadata {
    /// Site name, used when the book has no title of its own.
    pub name: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    /// Unix timestamp.
    pub publication_date: Option<i64>,
    pub metadata_version: u32,
}

pub trait SiteDirectory {
    /// The network's primary site, never a catalog candidate.
    fn main_site(&self) -> SiteId;
    /// Sites the user has authorship on.
    fn sites_of_user(&self, user: UserId) -> Vec<SiteId>;
    fn metadata(&self, site: SiteId) -> Option<SiteMetadata>;
    /// Public home URL, with a trailing slash.
    fn site_url(&self, site: SiteId) -> String;
    /// Dashboard URL, with a trailing slash.
    fn admin_url(&self, site: SiteId) -> String;
}

pub trait Thumbnailer {
    fn thumbnail_url(&self, source: &str, size: &str) -> String;
}

pub trait Identity {
    fn current_user(&self) -> Option<UserId>;
    fn can_edit_user(&self, acting: UserId, target: UserId) -> bool;
    fn is_super_admin(&self, user: UserId) -> bool;
    fn is_member_of(&self, user: UserId, site: SiteId) -> bool;
    fn primary_site(&self, user: UserId) -> Option<SiteId>;
    fn create_nonce(&self, user: UserId, action: &str) -> String;
    fn verify_nonce(&self, user: UserId, action: &str, nonce: &str) -> bool;
}

/// Proof that the current user is a network super admin.
///
/// Only [`Elevated::check`] creates one, so destructive store paths that take
/// it cannot be reached without the privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elevated {
    user: UserId,
}

impl Elevated {
    pub fn check(identity: &dyn Identity) -> Option<Self> {
        let user = identity.current_user()?;
        identity.is_super_admin(user).then_some(Self { user })
    }

    pub fn user(&self) -> UserId {
        self.user
    }
}
