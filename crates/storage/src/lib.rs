//! Sqlite-backed catalog persistence.

use std::path::Path;

use anyhow::Context as _;
use catalog_core::{
    CatalogEntry, DeleteMode, EntryChanges, Fields, FieldValue, Profile, SiteId, Tag, TagGroup,
    UserId, normalize_tag, profile_keys, sanitize_profile,
};
use rusqlite::{Connection, OptionalExtension as _, Row};

/// Value kept in `PRAGMA user_version` once the schema is current.
pub const SCHEMA_VERSION: i64 = 3;

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn schema_version(&self) -> anyhow::Result<i64> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }
        tracing::info!("upgrading catalog schema from version {version} to {SCHEMA_VERSION}");

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS catalog (
                users_id INTEGER NOT NULL,
                blogs_id INTEGER NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                featured INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (users_id, blogs_id)
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                users_id INTEGER NOT NULL,
                tag TEXT NOT NULL,
                UNIQUE (users_id, tag)
            );

            CREATE TABLE IF NOT EXISTS catalog_tags (
                users_id INTEGER NOT NULL,
                blogs_id INTEGER NOT NULL,
                tags_id INTEGER NOT NULL,
                tags_group INTEGER NOT NULL,
                PRIMARY KEY (users_id, blogs_id, tags_id, tags_group)
            );

            CREATE TABLE IF NOT EXISTS user_meta (
                user_id INTEGER NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                PRIMARY KEY (user_id, meta_key)
            );
            "#,
        )?;

        // Version 1 catalogs predate the featured flag.
        match self.conn.execute(
            "ALTER TABLE catalog ADD COLUMN featured INTEGER NOT NULL DEFAULT 0",
            [],
        ) {
            Ok(_) => {}
            Err(err) => {
                let msg = err.to_string();
                if !msg.contains("duplicate column name") {
                    return Err(err).context("add catalog.featured column");
                }
            }
        }

        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS catalog_featured ON catalog (featured);
             PRAGMA user_version = {SCHEMA_VERSION};"
        ))?;
        Ok(())
    }

    /// Catalog operations scoped to one user.
    pub fn catalog(&self, user_id: UserId) -> Catalog<'_> {
        Catalog {
            conn: &self.conn,
            user_id,
        }
    }

    /// Maintenance entry point for tags no entry links to any more.
    ///
    /// Reports how many rows were removed. Nothing is removed yet.
    pub fn purge_orphan_tags(&self) -> anyhow::Result<usize> {
        let orphans: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tags WHERE id NOT IN (SELECT tags_id FROM catalog_tags)",
            [],
            |row| row.get(0),
        )?;
        // TODO: delete the orphaned rows once a retention rule for unused tags is agreed on.
        tracing::warn!("orphan tag purge is not implemented; {orphans} orphaned tag(s) left in place");
        Ok(0)
    }
}

/// A single user's catalog, tags and profile.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    conn: &'a Connection,
    user_id: UserId,
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        user_id: UserId(row.get(0)?),
        site_id: SiteId(row.get(1)?),
        deleted: row.get::<_, i64>(2)? != 0,
        featured: row.get(3)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        tag: row.get(1)?,
    })
}

impl Catalog<'_> {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Every entry of the catalog that is not deleted.
    pub fn get(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT users_id, blogs_id, deleted, featured FROM catalog
             WHERE users_id = ? AND deleted = 0 ORDER BY blogs_id",
        )?;
        let rows = stmt.query_map([self.user_id.0], entry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_entry(&self, site_id: SiteId) -> anyhow::Result<Option<CatalogEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT users_id, blogs_id, deleted, featured FROM catalog
                 WHERE users_id = ? AND blogs_id = ? AND deleted = 0",
                (self.user_id.0, site_id.0),
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn get_entry_ids(&self) -> anyhow::Result<Vec<SiteId>> {
        let mut stmt = self.conn.prepare(
            "SELECT blogs_id FROM catalog WHERE users_id = ? AND deleted = 0 ORDER BY blogs_id",
        )?;
        let rows = stmt.query_map([self.user_id.0], |row| Ok(SiteId(row.get(0)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Inserts the entry or, when it exists, undeletes it and applies `changes`.
    pub fn save_entry(&self, site_id: SiteId, changes: EntryChanges) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO catalog (users_id, blogs_id, deleted, featured)
                VALUES (?1, ?2, 0, COALESCE(?3, 0))
                ON CONFLICT(users_id, blogs_id) DO UPDATE SET
                    deleted = 0,
                    featured = COALESCE(?3, featured)
                "#,
                (self.user_id.0, site_id.0, changes.featured),
            )
            .with_context(|| format!("save catalog entry {}:{site_id}", self.user_id))?;
        tracing::debug!("saved catalog entry {}:{site_id} {changes:?}", self.user_id);
        Ok(())
    }

    /// Saves every item that names a `blogs_id`; other fields go through the whitelist.
    pub fn save_all(&self, items: &[Fields]) -> anyhow::Result<usize> {
        let mut saved = 0;
        for item in items {
            let Some(site) = item.get("blogs_id").map(FieldValue::as_int) else {
                continue;
            };
            if site <= 0 {
                continue;
            }
            self.save_entry(SiteId(site), EntryChanges::from_fields(item))?;
            saved += 1;
        }
        Ok(saved)
    }

    /// Returns whether a row was affected.
    pub fn delete_entry(&self, site_id: SiteId, mode: DeleteMode) -> anyhow::Result<bool> {
        let affected = match mode {
            DeleteMode::Soft => self.conn.execute(
                "UPDATE catalog SET deleted = 1 WHERE users_id = ? AND blogs_id = ?",
                (self.user_id.0, site_id.0),
            )?,
            DeleteMode::Hard(elevated) => {
                tracing::info!(
                    "user {} purging catalog entry {}:{site_id}",
                    elevated.user(),
                    self.user_id
                );
                self.conn.execute(
                    "DELETE FROM catalog WHERE users_id = ? AND blogs_id = ?",
                    (self.user_id.0, site_id.0),
                )?
            }
        };
        tracing::debug!("deleted catalog entry {}:{site_id} ({mode:?})", self.user_id);
        Ok(affected > 0)
    }

    /// Deletes the whole catalog. Returns the number of affected rows.
    pub fn delete_all(&self, mode: DeleteMode) -> anyhow::Result<usize> {
        let affected = match mode {
            DeleteMode::Soft => self
                .conn
                .execute("UPDATE catalog SET deleted = 1 WHERE users_id = ?", [self.user_id.0])?,
            DeleteMode::Hard(elevated) => {
                tracing::info!("user {} purging catalog of {}", elevated.user(), self.user_id);
                self.conn
                    .execute("DELETE FROM catalog WHERE users_id = ?", [self.user_id.0])?
            }
        };
        Ok(affected)
    }

    /// Tags this user applied in `group` to any live entry.
    pub fn get_tags(&self, group: TagGroup) -> anyhow::Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT tags.id, tags.tag FROM tags
            INNER JOIN catalog_tags ON catalog_tags.tags_id = tags.id
            INNER JOIN catalog ON catalog.users_id = catalog_tags.users_id
                AND catalog.blogs_id = catalog_tags.blogs_id
            WHERE catalog_tags.tags_group = ?1 AND catalog_tags.users_id = ?2
                AND catalog.deleted = 0
            ORDER BY tags.tag
            "#,
        )?;
        let rows = stmt.query_map((group.get(), self.user_id.0), tag_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_tags_by_entry(&self, site_id: SiteId, group: TagGroup) -> anyhow::Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tags.id, tags.tag FROM tags
            INNER JOIN catalog_tags ON catalog_tags.tags_id = tags.id
            INNER JOIN catalog ON catalog.users_id = catalog_tags.users_id
                AND catalog.blogs_id = catalog_tags.blogs_id
            WHERE catalog_tags.tags_group = ?1 AND catalog_tags.users_id = ?2
                AND catalog_tags.blogs_id = ?3 AND catalog.deleted = 0
            ORDER BY tags.tag
            "#,
        )?;
        let rows = stmt.query_map((group.get(), self.user_id.0, site_id.0), tag_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Normalizes `text`, upserts the tag and links it to the entry.
    ///
    /// Returns the tag id, or `None` when nothing is left after normalization.
    pub fn save_tag(
        &self,
        text: &str,
        site_id: SiteId,
        group: TagGroup,
    ) -> anyhow::Result<Option<i64>> {
        let tag = normalize_tag(text);
        if tag.is_empty() {
            return Ok(None);
        }

        let tx = self.conn.unchecked_transaction()?;
        let tag_id: i64 = tx
            .query_row(
                r#"
                INSERT INTO tags (users_id, tag) VALUES (?1, ?2)
                ON CONFLICT(users_id, tag) DO UPDATE SET tag = excluded.tag
                RETURNING id
                "#,
                (self.user_id.0, &tag),
                |row| row.get(0),
            )
            .with_context(|| format!("upsert tag {tag:?}"))?;
        tx.execute(
            r#"
            INSERT INTO catalog_tags (users_id, blogs_id, tags_id, tags_group)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT DO NOTHING
            "#,
            (self.user_id.0, site_id.0, tag_id, group.get()),
        )?;
        tx.commit()?;

        tracing::debug!(
            "tagged {}:{site_id} with {tag:?} in group {group}",
            self.user_id
        );
        Ok(Some(tag_id))
    }

    /// Removes a tag by its exact text. Returns `false` when the tag is unknown.
    ///
    /// A hard delete removes every tag row carrying this text, for all users,
    /// together with all of their links.
    pub fn delete_tag(
        &self,
        text: &str,
        site_id: SiteId,
        group: TagGroup,
        mode: DeleteMode,
    ) -> anyhow::Result<bool> {
        match mode {
            DeleteMode::Soft => {
                let tag_id: Option<i64> = self
                    .conn
                    .query_row(
                        "SELECT id FROM tags WHERE users_id = ? AND tag = ?",
                        (self.user_id.0, text),
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(tag_id) = tag_id else {
                    return Ok(false);
                };
                let affected = self.conn.execute(
                    "DELETE FROM catalog_tags
                     WHERE users_id = ? AND blogs_id = ? AND tags_id = ? AND tags_group = ?",
                    (self.user_id.0, site_id.0, tag_id, group.get()),
                )?;
                Ok(affected > 0)
            }
            DeleteMode::Hard(elevated) => {
                let tx = self.conn.unchecked_transaction()?;
                tx.execute(
                    "DELETE FROM catalog_tags WHERE tags_id IN (SELECT id FROM tags WHERE tag = ?)",
                    [text],
                )?;
                let removed = tx.execute("DELETE FROM tags WHERE tag = ?", [text])?;
                tx.commit()?;
                tracing::info!(
                    "user {} purged tag {text:?} ({removed} row(s), all users)",
                    elevated.user()
                );
                Ok(removed > 0)
            }
        }
    }

    /// Unlinks every tag of one group from an entry. Tag rows stay.
    pub fn delete_tags_for_group(&self, site_id: SiteId, group: TagGroup) -> anyhow::Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM catalog_tags WHERE users_id = ? AND blogs_id = ? AND tags_group = ?",
            (self.user_id.0, site_id.0, group.get()),
        )?;
        Ok(affected)
    }

    /// Every recognized profile key; unset keys read as empty text.
    pub fn get_profile(&self) -> anyhow::Result<Profile> {
        let mut stmt = self
            .conn
            .prepare("SELECT meta_value FROM user_meta WHERE user_id = ? AND meta_key = ?")?;
        let mut profile = Profile::default();
        for key in profile_keys() {
            let stored: Option<String> = stmt
                .query_row((self.user_id.0, &key.name), |row| row.get(0))
                .optional()?;
            let value = match stored {
                Some(raw) => FieldValue::Text(raw).coerce(key.ty),
                None => FieldValue::Text(String::new()),
            };
            profile.values.insert(key.name, value);
        }
        Ok(profile)
    }

    /// Stores the recognized keys of `fields`. Returns how many were written.
    pub fn save_profile(&self, fields: &Fields) -> anyhow::Result<usize> {
        let values = sanitize_profile(fields);
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in &values {
            tx.execute(
                r#"
                INSERT INTO user_meta (user_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value
                "#,
                (self.user_id.0, key, value.as_text()),
            )?;
        }
        tx.commit()?;
        tracing::debug!("saved {} profile field(s) for user {}", values.len(), self.user_id);
        Ok(values.len())
    }
}

#[cfg(test)]
mod tests {
    use catalog_core::{Elevated, Identity};

    use super::*;

    struct Root;

    impl Identity for Root {
        fn current_user(&self) -> Option<UserId> {
            Some(UserId(1))
        }
        fn can_edit_user(&self, _acting: UserId, _target: UserId) -> bool {
            true
        }
        fn is_super_admin(&self, _user: UserId) -> bool {
            true
        }
        fn is_member_of(&self, _user: UserId, _site: SiteId) -> bool {
            true
        }
        fn primary_site(&self, _user: UserId) -> Option<SiteId> {
            None
        }
        fn create_nonce(&self, _user: UserId, action: &str) -> String {
            action.to_string()
        }
        fn verify_nonce(&self, _user: UserId, action: &str, nonce: &str) -> bool {
            action == nonce
        }
    }

    fn hard() -> DeleteMode {
        DeleteMode::Hard(Elevated::check(&Root).expect("root is elevated"))
    }

    fn group(n: u8) -> TagGroup {
        TagGroup::new(n).expect("valid group")
    }

    fn raw_entry_count(storage: &Storage, user: i64, site: i64) -> anyhow::Result<i64> {
        Ok(storage.conn.query_row(
            "SELECT COUNT(*) FROM catalog WHERE users_id = ? AND blogs_id = ?",
            (user, site),
            |row| row.get(0),
        )?)
    }

    #[test]
    fn save_entry_then_get_entry() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));

        let mut fields = Fields::new();
        fields.insert("featured".to_string(), FieldValue::Int(2));
        fields.insert("users_id".to_string(), FieldValue::Int(99));
        fields.insert("deleted".to_string(), FieldValue::Int(1));
        catalog.save_entry(SiteId(12), EntryChanges::from_fields(&fields))?;

        let entry = catalog.get_entry(SiteId(12))?.expect("entry saved");
        assert_eq!(
            entry,
            CatalogEntry {
                user_id: UserId(7),
                site_id: SiteId(12),
                deleted: false,
                featured: 2,
            }
        );
        assert!(storage.catalog(UserId(99)).get()?.is_empty());
        Ok(())
    }

    #[test]
    fn save_entry_twice_keeps_one_row_with_latest_value() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(12), EntryChanges::featured(1))?;
        catalog.save_entry(SiteId(12), EntryChanges::featured(5))?;

        assert_eq!(raw_entry_count(&storage, 7, 12)?, 1);
        assert_eq!(catalog.get_entry(SiteId(12))?.map(|e| e.featured), Some(5));

        catalog.save_entry(SiteId(12), EntryChanges::default())?;
        assert_eq!(catalog.get_entry(SiteId(12))?.map(|e| e.featured), Some(5));
        Ok(())
    }

    #[test]
    fn soft_delete_hides_and_save_restores() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_entry(SiteId(2), EntryChanges::default())?;

        assert!(catalog.delete_entry(SiteId(1), DeleteMode::Soft)?);
        assert_eq!(catalog.get_entry_ids()?, vec![SiteId(2)]);
        assert!(catalog.get_entry(SiteId(1))?.is_none());
        assert_eq!(raw_entry_count(&storage, 7, 1)?, 1);

        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        assert_eq!(catalog.get_entry_ids()?, vec![SiteId(1), SiteId(2)]);
        Ok(())
    }

    #[test]
    fn hard_delete_removes_row() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;

        assert!(catalog.delete_entry(SiteId(1), hard())?);
        assert_eq!(raw_entry_count(&storage, 7, 1)?, 0);
        assert!(!catalog.delete_entry(SiteId(1), DeleteMode::Soft)?);
        Ok(())
    }

    #[test]
    fn delete_all_and_save_all() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(3));

        let mut first = Fields::new();
        first.insert("blogs_id".to_string(), FieldValue::Int(4));
        first.insert("featured".to_string(), FieldValue::Int(1));
        let mut second = Fields::new();
        second.insert("blogs_id".to_string(), "5".into());
        let mut nameless = Fields::new();
        nameless.insert("featured".to_string(), FieldValue::Int(1));

        assert_eq!(catalog.save_all(&[first, second, nameless])?, 2);
        assert_eq!(catalog.get_entry_ids()?, vec![SiteId(4), SiteId(5)]);

        assert_eq!(catalog.delete_all(DeleteMode::Soft)?, 2);
        assert!(catalog.get()?.is_empty());
        assert_eq!(catalog.delete_all(hard())?, 2);
        assert_eq!(raw_entry_count(&storage, 3, 4)?, 0);
        Ok(())
    }

    #[test]
    fn save_tag_normalizes_text() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;

        catalog.save_tag("Science-Fiction ", SiteId(1), group(1))?;
        let tags = catalog.get_tags_by_entry(SiteId(1), group(1))?;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "Science Fiction");
        assert!(catalog.get_tags_by_entry(SiteId(1), group(2))?.is_empty());
        assert_eq!(catalog.save_tag(" <b></b> ", SiteId(1), group(1))?, None);
        Ok(())
    }

    #[test]
    fn same_tag_text_shares_one_row() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_entry(SiteId(2), EntryChanges::default())?;

        let first = catalog.save_tag("poetry", SiteId(1), group(1))?;
        let second = catalog.save_tag("Poetry", SiteId(2), group(1))?;
        assert!(first.is_some());
        assert_eq!(first, second);

        let rows: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        let links: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM catalog_tags", [], |row| row.get(0))?;
        assert_eq!((rows, links), (1, 2));
        assert_eq!(catalog.get_tags(group(1))?.len(), 1);
        Ok(())
    }

    #[test]
    fn delete_tag_unlinks_one_entry() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_entry(SiteId(2), EntryChanges::default())?;
        catalog.save_tag("Poetry", SiteId(1), group(1))?;
        catalog.save_tag("Poetry", SiteId(2), group(1))?;

        assert!(!catalog.delete_tag("Prose", SiteId(1), group(1), DeleteMode::Soft)?);
        assert!(catalog.delete_tag("Poetry", SiteId(1), group(1), DeleteMode::Soft)?);
        assert!(catalog.get_tags_by_entry(SiteId(1), group(1))?.is_empty());
        assert_eq!(catalog.get_tags_by_entry(SiteId(2), group(1))?.len(), 1);
        Ok(())
    }

    #[test]
    fn hard_tag_delete_reaches_every_user() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let alice = storage.catalog(UserId(1));
        let bob = storage.catalog(UserId(2));
        alice.save_entry(SiteId(10), EntryChanges::default())?;
        bob.save_entry(SiteId(20), EntryChanges::default())?;
        alice.save_tag("History", SiteId(10), group(1))?;
        bob.save_tag("History", SiteId(20), group(2))?;

        // Deleting through one user's catalog also strips the other user's tag.
        assert!(alice.delete_tag("History", SiteId(10), group(1), hard())?);
        assert!(alice.get_tags(group(1))?.is_empty());
        assert!(bob.get_tags(group(2))?.is_empty());
        assert!(!bob.delete_tag("History", SiteId(20), group(2), hard())?);
        Ok(())
    }

    #[test]
    fn delete_tags_for_group_leaves_other_groups() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_tag("Alpha", SiteId(1), group(1))?;
        catalog.save_tag("Beta", SiteId(1), group(1))?;
        catalog.save_tag("Gamma", SiteId(1), group(2))?;

        assert_eq!(catalog.delete_tags_for_group(SiteId(1), group(1))?, 2);
        assert!(catalog.get_tags_by_entry(SiteId(1), group(1))?.is_empty());
        assert_eq!(catalog.get_tags_by_entry(SiteId(1), group(2))?.len(), 1);
        Ok(())
    }

    #[test]
    fn tags_of_deleted_entries_are_hidden() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_tag("Alpha", SiteId(1), group(1))?;
        catalog.delete_entry(SiteId(1), DeleteMode::Soft)?;

        assert!(catalog.get_tags(group(1))?.is_empty());
        assert!(catalog.get_tags_by_entry(SiteId(1), group(1))?.is_empty());
        Ok(())
    }

    #[test]
    fn purge_orphan_tags_leaves_rows_alone() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));
        catalog.save_entry(SiteId(1), EntryChanges::default())?;
        catalog.save_tag("Alpha", SiteId(1), group(1))?;
        catalog.delete_tags_for_group(SiteId(1), group(1))?;

        assert_eq!(storage.purge_orphan_tags()?, 0);
        let rows: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[test]
    fn profile_roundtrip() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let catalog = storage.catalog(UserId(7));

        let empty = catalog.get_profile()?;
        assert_eq!(empty.about(), "");
        assert_eq!(empty.values.len(), profile_keys().len());

        let mut fields = Fields::new();
        fields.insert("pressbooks_catalog_about".to_string(), "Open textbooks".into());
        fields.insert("pressbooks_catalog_tag_1_name".to_string(), "Subject".into());
        fields.insert("_wpnonce".to_string(), "abc".into());
        assert_eq!(catalog.save_profile(&fields)?, 2);

        let profile = catalog.get_profile()?;
        assert_eq!(profile.about(), "Open textbooks");
        assert_eq!(
            profile.tag_group_name(group(1)).as_deref(),
            Some("Subject")
        );
        assert_eq!(storage.catalog(UserId(8)).get_profile()?.about(), "");
        Ok(())
    }

    #[test]
    fn migrate_upgrades_old_catalog_table() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("catalog.db");
        {
            let conn = Connection::open(&path)?;
            conn.execute_batch(
                "CREATE TABLE catalog (
                    users_id INTEGER NOT NULL,
                    blogs_id INTEGER NOT NULL,
                    deleted INTEGER NOT NULL,
                    PRIMARY KEY (users_id, blogs_id)
                );
                INSERT INTO catalog (users_id, blogs_id, deleted) VALUES (1, 2, 0);
                PRAGMA user_version = 1;",
            )?;
        }

        let storage = Storage::open(&path)?;
        assert_eq!(storage.schema_version()?, SCHEMA_VERSION);
        let catalog = storage.catalog(UserId(1));
        assert_eq!(catalog.get_entry(SiteId(2))?.map(|e| e.featured), Some(0));
        catalog.save_entry(SiteId(2), EntryChanges::featured(1))?;
        drop(storage);

        let reopened = Storage::open(&path)?;
        assert_eq!(
            reopened.catalog(UserId(1)).get_entry(SiteId(2))?.map(|e| e.featured),
            Some(1)
        );
        Ok(())
    }
}
