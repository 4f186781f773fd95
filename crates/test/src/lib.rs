//! Test helpers and fixtures.

use catalog_application::network::{NetworkSite, NetworkUser};
use catalog_application::{Network, Notices, Request, Response, handle};
use catalog_core::{CatalogConfig, SiteId, UserId};
use catalog_storage::Storage;

pub const ROOT: UserId = UserId(1);
pub const AUTHOR: UserId = UserId(2);
pub const OTHER: UserId = UserId(3);

pub fn make_config() -> CatalogConfig {
    let mut config = CatalogConfig {
        site_url: "http://books.test".to_string(),
        plugin_url: "http://books.test/wp-content/plugins/pressbooks".to_string(),
        ..CatalogConfig::default()
    };
    config.normalize();
    config
}

fn site(id: i64, path: &str, title: &str, author: &str) -> NetworkSite {
    NetworkSite {
        id: SiteId(id),
        path: path.to_string(),
        name: path.to_string(),
        title: (!title.is_empty()).then(|| title.to_string()),
        author: (!author.is_empty()).then(|| author.to_string()),
        cover_image: Some(format!("http://books.test/{path}/uploads/cover.jpg")),
        publication_date: Some(1_600_000_000),
        metadata_version: 7,
    }
}

/// A super admin, an author with three books and another author with one.
pub fn seeded_network() -> Network {
    Network {
        home_url: "http://books.test".to_string(),
        main_site: SiteId(1),
        current_user: Some(AUTHOR),
        nonce_secret: "fixture".to_string(),
        users: vec![
            NetworkUser {
                id: ROOT,
                login: "root".to_string(),
                super_admin: true,
                sites: vec![SiteId(1)],
                ..NetworkUser::default()
            },
            NetworkUser {
                id: AUTHOR,
                login: "author".to_string(),
                primary_site: Some(SiteId(4)),
                sites: vec![SiteId(1), SiteId(4), SiteId(5), SiteId(6)],
                ..NetworkUser::default()
            },
            NetworkUser {
                id: OTHER,
                login: "other".to_string(),
                primary_site: Some(SiteId(7)),
                sites: vec![SiteId(7)],
                ..NetworkUser::default()
            },
        ],
        sites: vec![
            site(1, "", "Network", ""),
            site(4, "dune", "Dune", "Frank Herbert"),
            site(5, "neuromancer", "Neuromancer", "William Gibson"),
            site(6, "solaris", "Solaris", "Stanislaw Lem"),
            site(7, "ubik", "Ubik", "Philip K. Dick"),
        ],
    }
}

/// A network where `user` authors `count` sites, numbered from 100.
pub fn bulk_network(user: UserId, count: i64) -> Network {
    let sites: Vec<NetworkSite> = (100..100 + count)
        .map(|id| site(id, &format!("book-{id}"), &format!("Book {id}"), "Anon"))
        .collect();
    Network {
        current_user: Some(user),
        users: vec![NetworkUser {
            id: user,
            login: "prolific".to_string(),
            sites: sites.iter().map(|site| site.id).collect(),
            ..NetworkUser::default()
        }],
        sites,
        ..Network::default()
    }
}

pub struct Fixture {
    pub storage: Storage,
    pub network: Network,
    pub config: CatalogConfig,
}

impl Fixture {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_network(seeded_network())
    }

    pub fn with_network(network: Network) -> anyhow::Result<Self> {
        Ok(Self {
            storage: Storage::open_in_memory()?,
            network,
            config: make_config(),
        })
    }

    pub fn login(&mut self, user: Option<UserId>) {
        self.network = self.network.clone().with_current_user(user);
    }

    pub fn nonce(&self, action: &str) -> String {
        let user = self.network.current_user.unwrap_or_default();
        self.network.host().identity.create_nonce(user, action)
    }

    pub fn send(&self, request: &Request) -> anyhow::Result<(Response, Notices)> {
        let mut notices = Notices::default();
        let response = handle(
            &self.storage,
            self.network.host(),
            &self.config,
            request,
            &mut notices,
        )?;
        Ok((response, notices))
    }

    /// Bulk form post selecting `ids`, signed with the bulk nonce.
    pub fn bulk(&self, action: &str, ids: &[&str], query: &str) -> Request {
        let mut body = format!("action={action}&_wpnonce={}", self.nonce("bulk-books"));
        for id in ids {
            body.push_str(&format!("&book%5B%5D={}", id.replace(':', "%3A")));
        }
        Request::post(&format!("page=pb_catalog&{query}"), &body)
    }

    /// Tag form post for one entry, signed with the form nonce.
    pub fn tag_form(&self, id: &str, fields: &str) -> Request {
        let body = format!(
            "action=edit_tags&ID={}&{fields}&_wpnonce={}",
            id.replace(':', "%3A"),
            self.nonce("pb-user-catalog")
        );
        Request::post("page=pb_catalog", &body)
    }

    pub fn list_page(&self, query: &str) -> anyhow::Result<String> {
        let (response, _) = self.send(&Request::get(&format!("page=pb_catalog&{query}")))?;
        anyhow::ensure!(response.status() == 200, "list page answered {}", response.status());
        Ok(response.body().to_string())
    }
}

pub fn count_rows(page: &str) -> usize {
    page.matches("name=\"book[]\"").count()
}

#[cfg(test)]
mod tests {
    use catalog_application::redirect::PERMISSION_DENIED;
    use catalog_core::{DeleteMode, Elevated, TagGroup};

    use super::*;

    #[test]
    fn add_edit_and_remove_round() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let catalog = fixture.storage.catalog(AUTHOR);

        let (response, notices) =
            fixture.send(&fixture.bulk("add", &["2:4", "2:6"], "s=&orderby=title"))?;
        assert_eq!(
            response.location(),
            Some("http://books.test/wp-admin/index.php?page=pb_catalog&orderby=title")
        );
        assert_eq!(notices.messages(), ["Settings saved."]);
        assert_eq!(catalog.get_entry_ids()?, vec![SiteId(4), SiteId(6)]);

        let (response, _) = fixture.send(&fixture.tag_form(
            "2:4",
            "tags_1=space+opera%2C+ecology&tags_2=classic&featured=1",
        ))?;
        assert_eq!(response.status(), 303);

        let page = fixture.list_page("")?;
        assert_eq!(count_rows(&page), 3);
        assert!(page.contains("Ecology, Space Opera"));
        assert!(page.contains("Classic"));

        fixture.send(&fixture.bulk("remove", &["2:4"], ""))?;
        assert_eq!(catalog.get_entry_ids()?, vec![SiteId(6)]);
        let group = TagGroup::new(1).expect("group");
        assert!(catalog.get_tags(group)?.is_empty());

        fixture.send(&fixture.bulk("add", &["2:4"], ""))?;
        assert_eq!(catalog.get_tags(group)?.len(), 2);
        Ok(())
    }

    #[test]
    fn search_narrows_the_list() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let page = fixture.list_page("s=GIBSON")?;
        assert_eq!(count_rows(&page), 1);
        assert!(page.contains("value=\"2:5\""));

        let page = fixture.list_page("s=")?;
        assert_eq!(count_rows(&page), 3);
        Ok(())
    }

    #[test]
    fn catalog_rows_lead_the_default_order() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fixture.send(&fixture.bulk("add", &["2:6"], ""))?;

        let page = fixture.list_page("orderby=nonsense")?;
        let solaris = page.find("value=\"2:6\"").expect("solaris row");
        let dune = page.find("value=\"2:4\"").expect("dune row");
        let neuromancer = page.find("value=\"2:5\"").expect("neuromancer row");
        assert!(solaris < dune && dune < neuromancer);

        let page = fixture.list_page("orderby=title&order=desc")?;
        let solaris = page.find("value=\"2:6\"").expect("solaris row");
        let dune = page.find("value=\"2:4\"").expect("dune row");
        assert!(solaris < dune);
        Ok(())
    }

    #[test]
    fn pages_of_a_large_network() -> anyhow::Result<()> {
        let fixture = Fixture::with_network(bulk_network(UserId(9), 1500))?;
        assert_eq!(count_rows(&fixture.list_page("paged=1")?), 1000);
        assert_eq!(count_rows(&fixture.list_page("paged=2")?), 500);

        let last = fixture.list_page("paged=3")?;
        assert_eq!(count_rows(&last), 0);
        assert!(last.contains("1500 items"));
        assert!(last.contains("No items found."));
        Ok(())
    }

    #[test]
    fn admins_manage_other_catalogs() -> anyhow::Result<()> {
        let mut fixture = Fixture::new()?;
        fixture.login(Some(ROOT));

        let (response, _) = fixture.send(&fixture.bulk("add", &["3:7"], "s=ubik"))?;
        assert_eq!(
            response.location(),
            Some("http://books.test/wp-admin/index.php?page=pb_catalog&s=ubik&user_id=3")
        );

        let page = fixture.list_page("user_id=3")?;
        assert_eq!(count_rows(&page), 1);
        assert!(page.contains("name=\"user_id\" value=\"3\""));
        assert!(page.contains("action=edit_profile&amp;user_id=3"));

        fixture.login(Some(AUTHOR));
        let page = fixture.list_page("user_id=3")?;
        assert!(page.contains("value=\"2:4\""));
        assert!(!page.contains("value=\"3:7\""));

        let (response, _) = fixture.send(&fixture.bulk("remove", &["3:7"], ""))?;
        assert_eq!(response, Response::Denied(PERMISSION_DENIED.to_string()));
        assert_eq!(fixture.storage.catalog(OTHER).get_entry_ids()?, vec![SiteId(7)]);
        Ok(())
    }

    #[test]
    fn edit_screens_render_for_the_owner() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let (response, _) =
            fixture.send(&Request::get("page=pb_catalog&action=edit_tags&ID=2%3A5"))?;
        assert_eq!(response.status(), 200);
        assert!(response.body().contains("Edit Tags: Neuromancer"));

        let (response, _) =
            fixture.send(&Request::get("page=pb_catalog&action=edit_tags&ID=3%3A7"))?;
        assert_eq!(response.status(), 403);

        let (response, _) = fixture.send(&Request::get("page=pb_catalog&action=edit_profile"))?;
        assert!(response.body().contains("name=\"pressbooks_catalog_about\""));
        Ok(())
    }

    #[test]
    fn only_super_admins_hard_delete() -> anyhow::Result<()> {
        let mut fixture = Fixture::new()?;
        fixture.send(&fixture.bulk("add", &["2:4"], ""))?;
        assert!(Elevated::check(fixture.network.host().identity).is_none());

        fixture.login(Some(ROOT));
        let elevated = Elevated::check(fixture.network.host().identity).expect("root is elevated");
        let catalog = fixture.storage.catalog(AUTHOR);
        assert!(catalog.delete_entry(SiteId(4), DeleteMode::Hard(elevated))?);
        assert!(catalog.get_entry_ids()?.is_empty());
        assert!(!catalog.delete_entry(SiteId(4), DeleteMode::Soft)?);
        Ok(())
    }

    #[test]
    fn stale_nonce_changes_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let request = Request::post(
            "page=pb_catalog",
            "action=add&book%5B%5D=2%3A4&_wpnonce=stale",
        );
        let (response, notices) = fixture.send(&request)?;
        assert_eq!(response.status(), 403);
        assert!(notices.is_empty());
        assert!(fixture.storage.catalog(AUTHOR).get()?.is_empty());
        Ok(())
    }

    #[test]
    fn unkeyed_network_refuses_submissions() -> anyhow::Result<()> {
        let fixture = Fixture::with_network(bulk_network(UserId(9), 2))?;
        assert_eq!(fixture.nonce("bulk-books"), "");
        assert_eq!(count_rows(&fixture.list_page("")?), 2);

        let (response, notices) = fixture.send(&fixture.bulk("add", &["9:100"], ""))?;
        assert_eq!(response.status(), 403);
        assert!(notices.is_empty());
        assert!(fixture.storage.catalog(UserId(9)).get()?.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_selection_returns_to_the_list() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        for id in ["junk", ":"] {
            let (response, notices) = fixture.send(&fixture.bulk("remove", &[id], "s=dune"))?;
            assert_eq!(
                response.location(),
                Some("http://books.test/wp-admin/index.php?page=pb_catalog&s=dune")
            );
            assert!(notices.is_empty());
        }
        Ok(())
    }
}
