//! The catalog admin table.
//!
//! Rows combine the user's catalog entries with the sites they could still
//! add. The table searches, sorts and pages them, then renders through
//! [`crate::list_table::display`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use catalog_core::{
    ADMIN_PAGE, CatalogConfig, CompositeId, Profile, SiteId, SiteMetadata, Tag, TagGroup,
    Thumbnailer, UserId, tags_to_string,
};
use catalog_storage::Catalog;

use crate::Host;
use crate::dispatch::BULK_NONCE_ACTION;
use crate::html::{esc_attr, esc_html, esc_url};
use crate::list_table::{
    CHECKBOX_COLUMN, ColumnHeader, Pageable, Pagination, RowRenderer, Searchable, SortOrder,
    Sortable, display, link, paginate, row_actions,
};
use crate::request::{Request, add_query_arg, add_search_params_to_url};

pub const COVER_SIZE: &str = "pb_cover_small";
/// Metadata older than this never carries a usable cover.
const COVER_METADATA_VERSION: u32 = 7;
const PLACEHOLDER_COVER: &str = "assets/images/default-book-cover.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowStatus {
    Candidate,
    InCatalog,
}

impl RowStatus {
    pub fn as_int(&self) -> i64 {
        match self {
            RowStatus::Candidate => 0,
            RowStatus::InCatalog => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub id: CompositeId,
    pub status: RowStatus,
    pub title: String,
    pub author: String,
    pub featured: i64,
    pub pub_date: String,
    pub cover: String,
    pub tags: BTreeMap<TagGroup, Vec<Tag>>,
}

/// A row field as seen by search and default rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Text(String),
    List(Vec<Cell>),
}

impl Cell {
    /// Substring match against an already lowercased needle, descending into lists.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Cell::Int(value) => value.to_string().contains(needle),
            Cell::Text(value) => value.to_lowercase().contains(needle),
            Cell::List(items) => items.iter().any(|item| item.contains(needle)),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Int(value) => value.to_string(),
            Cell::Text(value) => value.clone(),
            Cell::List(items) => items
                .iter()
                .map(Cell::display)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl CatalogRow {
    pub fn cells(&self) -> Vec<(String, Cell)> {
        let mut cells = vec![
            ("ID".to_string(), Cell::Text(self.id.to_string())),
            ("status".to_string(), Cell::Int(self.status.as_int())),
            ("title".to_string(), Cell::Text(self.title.clone())),
            ("author".to_string(), Cell::Text(self.author.clone())),
            ("featured".to_string(), Cell::Int(self.featured)),
            ("pub_date".to_string(), Cell::Text(self.pub_date.clone())),
            ("cover".to_string(), Cell::Text(self.cover.clone())),
        ];
        for (group, tags) in &self.tags {
            let tags = tags
                .iter()
                .map(|tag| Cell::List(vec![Cell::Int(tag.id), Cell::Text(tag.tag.clone())]))
                .collect();
            cells.push((group.column(), Cell::List(tags)));
        }
        cells
    }

    pub fn cell(&self, column: &str) -> Option<Cell> {
        self.cells()
            .into_iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    fn tags(&self, group: TagGroup) -> &[Tag] {
        self.tags.get(&group).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Cover thumbnail for a site, or the stock cover when it has none worth showing.
pub fn cover_url(
    metadata: &SiteMetadata,
    images: &dyn Thumbnailer,
    config: &CatalogConfig,
) -> String {
    if metadata.metadata_version < COVER_METADATA_VERSION {
        return config.default_cover_url();
    }
    match metadata.cover_image.as_deref().map(str::trim) {
        Some(cover) if !cover.is_empty() && !cover.ends_with(PLACEHOLDER_COVER) => {
            images.thumbnail_url(cover, COVER_SIZE)
        }
        _ => config.default_cover_url(),
    }
}

fn format_pub_date(timestamp: Option<i64>) -> String {
    timestamp
        .filter(|ts| *ts != 0)
        .and_then(|ts| chrono::DateTime::<chrono::Utc>::from_timestamp(ts, 0))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn build_row(
    catalog: &Catalog<'_>,
    host: &Host<'_>,
    config: &CatalogConfig,
    site: SiteId,
    status: RowStatus,
    featured: i64,
) -> anyhow::Result<CatalogRow> {
    let metadata = host.sites.metadata(site).unwrap_or_default();
    let title = metadata
        .title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| metadata.name.clone());

    let mut tags = BTreeMap::new();
    for group in TagGroup::all() {
        tags.insert(group, catalog.get_tags_by_entry(site, group)?);
    }

    Ok(CatalogRow {
        id: CompositeId::new(catalog.user_id(), site),
        status,
        title,
        author: metadata.author.clone().unwrap_or_default(),
        featured,
        pub_date: format_pub_date(metadata.publication_date),
        cover: cover_url(&metadata, host.images, config),
        tags,
    })
}

/// Catalog entries first, then every other site the user can author.
pub fn items_data(
    catalog: &Catalog<'_>,
    host: &Host<'_>,
    config: &CatalogConfig,
    keyword: Option<&str>,
) -> anyhow::Result<Vec<CatalogRow>> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for entry in catalog.get()? {
        seen.insert(entry.site_id);
        rows.push(build_row(
            catalog,
            host,
            config,
            entry.site_id,
            RowStatus::InCatalog,
            entry.featured,
        )?);
    }

    let main_site = host.sites.main_site();
    for site in host.sites.sites_of_user(catalog.user_id()) {
        if site == main_site || !seen.insert(site) {
            continue;
        }
        rows.push(build_row(catalog, host, config, site, RowStatus::Candidate, 0)?);
    }

    Ok(search_filter(rows, keyword))
}

/// Keeps rows where any cell contains `keyword`, ignoring case.
pub fn search_filter(rows: Vec<CatalogRow>, keyword: Option<&str>) -> Vec<CatalogRow> {
    let Some(keyword) = keyword.map(str::trim).filter(|keyword| !keyword.is_empty()) else {
        return rows;
    };
    let needle = keyword.to_lowercase();
    rows.into_iter()
        .filter(|row| row.cells().iter().any(|(_, cell)| cell.contains(&needle)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Status,
    Title,
    Author,
    PubDate,
}

impl SortColumn {
    pub const ALL: [SortColumn; 4] = [
        SortColumn::Status,
        SortColumn::Title,
        SortColumn::Author,
        SortColumn::PubDate,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            SortColumn::Status => "status",
            SortColumn::Title => "title",
            SortColumn::Author => "author",
            SortColumn::PubDate => "pub_date",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.slug() == slug)
    }

    fn compare(&self, a: &CatalogRow, b: &CatalogRow) -> Ordering {
        match self {
            SortColumn::Status => a.status.cmp(&b.status),
            SortColumn::Title => compare_text(&a.title, &b.title),
            SortColumn::Author => compare_text(&a.author, &b.author),
            SortColumn::PubDate => a.pub_date.cmp(&b.pub_date),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub order: SortOrder,
}

pub const DEFAULT_SORT: [SortKey; 2] = [
    SortKey {
        column: SortColumn::Status,
        order: SortOrder::Desc,
    },
    SortKey {
        column: SortColumn::Title,
        order: SortOrder::Asc,
    },
];

fn requested_sort_key(request: &Request) -> Option<SortKey> {
    let column = request.param("orderby").and_then(SortColumn::from_slug)?;
    Some(SortKey {
        column,
        order: SortOrder::from_param(request.param("order")),
    })
}

/// The requested sort with title as tie-break, or [`DEFAULT_SORT`].
pub fn sort_keys_for(request: &Request) -> Vec<SortKey> {
    match requested_sort_key(request) {
        Some(key) if key.column == SortColumn::Title => vec![key],
        Some(key) => vec![
            key,
            SortKey {
                column: SortColumn::Title,
                order: SortOrder::Asc,
            },
        ],
        None => DEFAULT_SORT.to_vec(),
    }
}

/// Stable sort by each key in turn; later keys only break ties.
pub fn multi_sort(rows: &mut [CatalogRow], keys: &[SortKey]) {
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = key.column.compare(a, b);
                match key.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

pub struct CatalogTable<'a> {
    host: Host<'a>,
    config: &'a CatalogConfig,
    request: &'a Request,
    viewer: UserId,
    owner: UserId,
    profile: Profile,
    items: Vec<CatalogRow>,
    pagination: Pagination,
}

impl<'a> CatalogTable<'a> {
    pub fn prepare(
        catalog: &Catalog<'_>,
        host: Host<'a>,
        config: &'a CatalogConfig,
        request: &'a Request,
    ) -> anyhow::Result<Self> {
        let owner = catalog.user_id();
        let viewer = host.identity.current_user().unwrap_or(owner);
        let profile = catalog.get_profile()?;

        let mut rows = items_data(catalog, &host, config, request.search_keyword())?;
        multi_sort(&mut rows, &sort_keys_for(request));
        let (items, pagination) = paginate(rows, request.page_number(), config.per_page);
        tracing::debug!(
            user = %owner,
            total = pagination.total_items,
            page = pagination.current_page,
            "prepared catalog table"
        );

        Ok(Self {
            host,
            config,
            request,
            viewer,
            owner,
            profile,
            items,
            pagination,
        })
    }

    fn row_action_url(&self, row: &CatalogRow, action: &str) -> String {
        let id = row.id.to_string();
        let url = add_query_arg(&format!("?page={ADMIN_PAGE}"), "action", action);
        let url = add_query_arg(&url, "ID", &id);
        let url = add_query_arg(
            &url,
            "_wpnonce",
            &self.host.identity.create_nonce(self.viewer, &id),
        );
        add_search_params_to_url(&url, self.request)
    }

    fn column_status(&self, row: &CatalogRow) -> String {
        let (icon, alt) = match row.status {
            RowStatus::InCatalog => ("yes.png", "Yes"),
            RowStatus::Candidate => ("no.png", "No"),
        };
        let src = format!("{}/wp-admin/images/{icon}", self.config.site_url);
        let actions = [
            ("add", link(&self.row_action_url(row, "add"), "Add")),
            ("remove", link(&self.row_action_url(row, "remove"), "Remove")),
        ];
        format!(
            "<img src=\"{}\" alt=\"{alt}\" />{}",
            esc_url(&src),
            row_actions(&actions)
        )
    }

    fn column_title(&self, row: &CatalogRow) -> String {
        let actions = [
            ("visit", link(&self.host.sites.site_url(row.id.site), "Visit")),
            (
                "dashboard",
                link(&self.host.sites.admin_url(row.id.site), "Edit Book"),
            ),
        ];
        format!("<strong>{}</strong>{}", esc_html(&row.title), row_actions(&actions))
    }

    fn column_tags(&self, row: &CatalogRow, group: TagGroup) -> String {
        let text = tags_to_string(row.tags(group));
        let value = if text.is_empty() {
            "<span style=\"color:silver\">n/a</span>".to_string()
        } else {
            esc_html(&text)
        };
        let url = add_query_arg(&format!("?page={ADMIN_PAGE}"), "action", "edit_tags");
        let url = add_query_arg(&url, "ID", &row.id.to_string());
        format!("{value}{}", row_actions(&[("edit_tags", link(&url, "Edit Tags"))]))
    }

    /// The whole list page: heading, search box and table in one form.
    pub fn render_page(&self) -> String {
        let admin_url = self.config.admin_url();
        let mut profile_url = add_query_arg(&admin_url, "action", "edit_profile");
        let mut user_field = String::new();
        if self.owner != self.viewer {
            profile_url = add_query_arg(&profile_url, "user_id", &self.owner.to_string());
            user_field = format!(
                "<input type=\"hidden\" name=\"user_id\" value=\"{}\" />",
                self.owner
            );
        }
        let keyword = self.search_keyword().unwrap_or_default();
        let nonce = self.host.identity.create_nonce(self.viewer, BULK_NONCE_ACTION);

        let mut html = String::from("<div class=\"wrap\">");
        html.push_str(&format!(
            "<h2>My Catalog <a href=\"{}\" class=\"button add-new-h2\">Edit My Catalog Profile</a></h2>",
            esc_url(&profile_url)
        ));
        html.push_str(&format!(
            "<form id=\"books-filter\" method=\"post\" action=\"{}\">",
            esc_url(&admin_url)
        ));
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"page\" value=\"{ADMIN_PAGE}\" />{user_field}"
        ));
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"_wpnonce\" value=\"{}\" />",
            esc_attr(&nonce)
        ));
        html.push_str(&format!(
            "<p class=\"search-box\"><input type=\"search\" name=\"s\" value=\"{}\" /><input type=\"submit\" class=\"button\" value=\"Search\" /></p>",
            esc_attr(keyword)
        ));
        html.push_str(&display(self, self.request, &admin_url));
        html.push_str("</form></div>");
        html
    }
}

impl Searchable for CatalogTable<'_> {
    fn search_keyword(&self) -> Option<&str> {
        self.request.search_keyword()
    }
}

impl Sortable for CatalogTable<'_> {
    fn sortable_columns(&self) -> Vec<&'static str> {
        SortColumn::ALL.iter().map(SortColumn::slug).collect()
    }

    fn requested_sort(&self) -> Option<(&'static str, SortOrder)> {
        requested_sort_key(self.request).map(|key| (key.column.slug(), key.order))
    }
}

impl Pageable for CatalogTable<'_> {
    type Item = CatalogRow;

    fn items(&self) -> &[CatalogRow] {
        &self.items
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

impl RowRenderer for CatalogTable<'_> {
    type Row = CatalogRow;

    fn columns(&self) -> Vec<ColumnHeader> {
        let mut columns = vec![
            ColumnHeader::raw(CHECKBOX_COLUMN, "<input type=\"checkbox\" />"),
            ColumnHeader::new("status", "In Catalog"),
            ColumnHeader::new("cover", "Cover"),
            ColumnHeader::new("title", "Title"),
            ColumnHeader::new("author", "Author"),
        ];
        for group in TagGroup::all() {
            let name = self
                .profile
                .tag_group_name(group)
                .unwrap_or_else(|| format!("Tag {group}"));
            columns.push(ColumnHeader::new(group.column(), &name));
        }
        columns.push(ColumnHeader::new("featured", "Featured").hidden());
        columns.push(ColumnHeader::new("pub_date", "Pub Date"));
        columns
    }

    fn render_cell(&self, row: &CatalogRow, column: &str) -> String {
        match column {
            CHECKBOX_COLUMN => format!(
                "<input type=\"checkbox\" name=\"book[]\" value=\"{}\" />",
                esc_attr(&row.id.to_string())
            ),
            "status" => self.column_status(row),
            "cover" => format!(
                "<img src=\"{}\" alt=\"{}\" />",
                esc_url(&row.cover),
                esc_attr(&row.title)
            ),
            "title" => self.column_title(row),
            other => match other
                .strip_prefix("tag_")
                .and_then(|group| group.parse::<TagGroup>().ok())
            {
                Some(group) => self.column_tags(row, group),
                None => row
                    .cell(other)
                    .map(|cell| esc_html(&cell.display()))
                    .unwrap_or_default(),
            },
        }
    }

    fn bulk_actions(&self) -> Vec<(&'static str, &'static str)> {
        vec![("add", "Add"), ("remove", "Remove")]
    }
}
