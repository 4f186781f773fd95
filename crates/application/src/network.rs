//! A network of users and sites described by a JSON document.
//!
//! Stands in for the hosting platform when the catalog runs on its own.

use std::path::Path;

use anyhow::Context as _;
use catalog_core::{Identity, SiteDirectory, SiteId, SiteMetadata, Thumbnailer, UserId};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::Host;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub home_url: String,
    pub main_site: SiteId,
    pub current_user: Option<UserId>,
    /// Key for form nonces. While empty no nonce is issued or accepted.
    pub nonce_secret: String,
    pub users: Vec<NetworkUser>,
    pub sites: Vec<NetworkSite>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkUser {
    pub id: UserId,
    pub login: String,
    pub super_admin: bool,
    pub primary_site: Option<SiteId>,
    /// Sites this user can author.
    pub sites: Vec<SiteId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSite {
    pub id: SiteId,
    /// Path below the home URL; empty for the main site.
    pub path: String,
    pub name: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    pub publication_date: Option<i64>,
    pub metadata_version: u32,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            home_url: "http://localhost".to_string(),
            main_site: SiteId(1),
            current_user: None,
            nonce_secret: String::new(),
            users: Vec::new(),
            sites: Vec::new(),
        }
    }
}

/// Cover sizes and the width each one is cropped to.
const COVER_SIZES: &[(&str, u32)] = &[
    ("pb_cover_small", 65),
    ("pb_cover_medium", 225),
    ("pb_cover_large", 350),
];

impl Network {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read network description {}", path.display()))?;
        let network: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parse network description {}", path.display()))?;
        if network.nonce_secret.is_empty() {
            tracing::warn!(
                path = %path.display(),
                "no nonce_secret; form submissions will be refused"
            );
        }
        Ok(network)
    }

    pub fn with_current_user(mut self, user: Option<UserId>) -> Self {
        self.current_user = user;
        self
    }

    pub fn host(&self) -> Host<'_> {
        Host {
            sites: self,
            images: self,
            identity: self,
        }
    }

    fn user(&self, id: UserId) -> Option<&NetworkUser> {
        self.users.iter().find(|user| user.id == id)
    }

    fn site(&self, id: SiteId) -> Option<&NetworkSite> {
        self.sites.iter().find(|site| site.id == id)
    }

    fn home(&self) -> &str {
        self.home_url.trim_end_matches('/')
    }

    fn nonce_mac(&self, user: UserId, action: &str) -> Option<HmacSha256> {
        if self.nonce_secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(self.nonce_secret.as_bytes()).ok()?;
        mac.update(&user.0.to_be_bytes());
        mac.update(b"\n");
        mac.update(action.as_bytes());
        Some(mac)
    }
}

impl SiteDirectory for Network {
    fn main_site(&self) -> SiteId {
        self.main_site
    }

    fn sites_of_user(&self, user: UserId) -> Vec<SiteId> {
        self.user(user)
            .map(|user| user.sites.clone())
            .unwrap_or_default()
    }

    fn metadata(&self, site: SiteId) -> Option<SiteMetadata> {
        let site = self.site(site)?;
        Some(SiteMetadata {
            name: site.name.clone(),
            title: site.title.clone(),
            author: site.author.clone(),
            cover_image: site.cover_image.clone(),
            publication_date: site.publication_date,
            metadata_version: site.metadata_version,
        })
    }

    fn site_url(&self, site: SiteId) -> String {
        let path = self
            .site(site)
            .map(|site| site.path.trim_matches('/'))
            .unwrap_or_default();
        if path.is_empty() {
            format!("{}/", self.home())
        } else {
            format!("{}/{path}/", self.home())
        }
    }

    fn admin_url(&self, site: SiteId) -> String {
        format!("{}wp-admin/", self.site_url(site))
    }
}

impl Thumbnailer for Network {
    fn thumbnail_url(&self, source: &str, size: &str) -> String {
        let Some((_, width)) = COVER_SIZES.iter().find(|(name, _)| *name == size) else {
            return source.to_string();
        };
        let file_start = source.rfind('/').map_or(0, |idx| idx + 1);
        match source[file_start..].rfind('.') {
            Some(dot) => {
                let dot = file_start + dot;
                format!("{}-{width}x0{}", &source[..dot], &source[dot..])
            }
            None => format!("{source}-{width}x0"),
        }
    }
}

impl Identity for Network {
    fn current_user(&self) -> Option<UserId> {
        self.current_user
    }

    fn can_edit_user(&self, acting: UserId, target: UserId) -> bool {
        if self.user(target).is_none() {
            return false;
        }
        acting == target || self.is_super_admin(acting)
    }

    fn is_super_admin(&self, user: UserId) -> bool {
        self.user(user).is_some_and(|user| user.super_admin)
    }

    fn is_member_of(&self, user: UserId, site: SiteId) -> bool {
        self.user(user).is_some_and(|user| user.sites.contains(&site))
    }

    fn primary_site(&self, user: UserId) -> Option<SiteId> {
        self.user(user).and_then(|user| user.primary_site)
    }

    fn create_nonce(&self, user: UserId, action: &str) -> String {
        self.nonce_mac(user, action)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }

    fn verify_nonce(&self, user: UserId, action: &str, nonce: &str) -> bool {
        let Ok(signature) = hex::decode(nonce) else {
            return false;
        };
        self.nonce_mac(user, action)
            .is_some_and(|mac| mac.verify_slice(&signature).is_ok())
    }
}
