//! Generic admin list widget: pagination, sortable headers, bulk actions.
//!
//! A table supplies its data through the capability traits below and
//! [`display`] turns it into markup.

use crate::html::{esc_attr, esc_html, esc_url};
use crate::request::{Request, add_query_arg, add_search_params_to_url};

/// Slug of the checkbox column, rendered as a row header.
pub const CHECKBOX_COLUMN: &str = "cb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub slug: String,
    /// Header markup; already escaped.
    pub title: String,
    pub hidden: bool,
}

impl ColumnHeader {
    pub fn new(slug: impl Into<String>, title: &str) -> Self {
        Self {
            slug: slug.into(),
            title: esc_html(title),
            hidden: false,
        }
    }

    pub fn raw(slug: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: markup.into(),
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything but `desc` sorts ascending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total_items: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Cuts one page out of `items`. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, current_page: usize, per_page: usize) -> (Vec<T>, Pagination) {
    let per_page = per_page.max(1);
    let current_page = current_page.max(1);
    let total_items = items.len();
    let pagination = Pagination {
        total_items,
        per_page,
        total_pages: total_items.div_ceil(per_page),
        current_page,
    };
    let start = (current_page - 1).saturating_mul(per_page);
    let page = items.into_iter().skip(start).take(per_page).collect();
    (page, pagination)
}

pub trait Pageable {
    type Item;

    /// Items of the current page.
    fn items(&self) -> &[Self::Item];
    fn pagination(&self) -> Pagination;
}

pub trait Sortable {
    /// Column slugs the user may sort by.
    fn sortable_columns(&self) -> Vec<&'static str>;
    /// The explicitly requested sort, if it was valid.
    fn requested_sort(&self) -> Option<(&'static str, SortOrder)>;
}

pub trait Searchable {
    fn search_keyword(&self) -> Option<&str>;
}

pub trait RowRenderer {
    type Row;

    fn columns(&self) -> Vec<ColumnHeader>;
    fn render_cell(&self, row: &Self::Row, column: &str) -> String;
    fn bulk_actions(&self) -> Vec<(&'static str, &'static str)>;
}

/// Row action links shown under a cell, e.g. `[("visit", "<a ...>Visit</a>")]`.
pub fn row_actions(actions: &[(&str, String)]) -> String {
    if actions.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"row-actions\">");
    for (idx, (name, link)) in actions.iter().enumerate() {
        let separator = if idx + 1 < actions.len() { " | " } else { "" };
        html.push_str(&format!("<span class=\"{}\">{link}{separator}</span>", esc_attr(name)));
    }
    html.push_str("</div>");
    html
}

pub fn link(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", esc_url(href), esc_html(label))
}

fn bulk_actions_select<T: RowRenderer>(table: &T, name: &str) -> String {
    let mut html = format!(
        "<div class=\"alignleft actions bulkactions\"><select name=\"{name}\"><option value=\"-1\" selected=\"selected\">Bulk Actions</option>"
    );
    for (slug, label) in table.bulk_actions() {
        html.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            esc_attr(slug),
            esc_html(label)
        ));
    }
    html.push_str("</select><input type=\"submit\" class=\"button action\" value=\"Apply\" /></div>");
    html
}

fn pagination_nav(pagination: Pagination, base_url: &str) -> String {
    let noun = if pagination.total_items == 1 { "item" } else { "items" };
    let mut html = format!(
        "<div class=\"tablenav-pages\"><span class=\"displaying-num\">{} {noun}</span>",
        pagination.total_items
    );
    if pagination.total_pages > 1 {
        for page in 1..=pagination.total_pages {
            if page == pagination.current_page {
                html.push_str(&format!(" <span class=\"current-page\">{page}</span>"));
            } else {
                let href = add_query_arg(base_url, "paged", &page.to_string());
                html.push(' ');
                html.push_str(&link(&href, &page.to_string()));
            }
        }
    }
    html.push_str("</div>");
    html
}

/// Renders the full table: navigation, headers, rows.
pub fn display<T>(table: &T, request: &Request, base_url: &str) -> String
where
    T: RowRenderer + Sortable + Pageable<Item = <T as RowRenderer>::Row>,
{
    let columns: Vec<ColumnHeader> = table
        .columns()
        .into_iter()
        .filter(|column| !column.hidden)
        .collect();
    let sortable = table.sortable_columns();
    let requested = table.requested_sort();
    let state_url = add_search_params_to_url(base_url, request);

    let mut html = String::new();
    html.push_str("<div class=\"tablenav top\">");
    html.push_str(&bulk_actions_select(table, "action"));
    html.push_str(&pagination_nav(table.pagination(), &state_url));
    html.push_str("</div>");

    html.push_str("<table class=\"wp-list-table widefat fixed\"><thead><tr>");
    for column in &columns {
        if column.slug == CHECKBOX_COLUMN {
            html.push_str(&format!(
                "<td class=\"manage-column column-cb check-column\">{}</td>",
                column.title
            ));
            continue;
        }
        let class = format!("manage-column column-{}", esc_attr(&column.slug));
        if sortable.contains(&column.slug.as_str()) {
            let order = match requested {
                Some((slug, order)) if slug == column.slug => order.toggled(),
                _ => SortOrder::Asc,
            };
            let href = add_query_arg(&state_url, "orderby", &column.slug);
            let href = add_query_arg(&href, "order", order.as_str());
            html.push_str(&format!(
                "<th scope=\"col\" class=\"{class} sortable\"><a href=\"{}\">{}</a></th>",
                esc_url(&href),
                column.title
            ));
        } else {
            html.push_str(&format!("<th scope=\"col\" class=\"{class}\">{}</th>", column.title));
        }
    }
    html.push_str("</tr></thead><tbody>");

    if table.items().is_empty() {
        html.push_str(&format!(
            "<tr class=\"no-items\"><td class=\"colspanchange\" colspan=\"{}\">No items found.</td></tr>",
            columns.len()
        ));
    }
    for row in table.items() {
        html.push_str("<tr>");
        for column in &columns {
            let cell = table.render_cell(row, &column.slug);
            if column.slug == CHECKBOX_COLUMN {
                html.push_str(&format!("<th scope=\"row\" class=\"check-column\">{cell}</th>"));
            } else {
                html.push_str(&format!(
                    "<td class=\"column-{}\">{cell}</td>",
                    esc_attr(&column.slug)
                ));
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    html.push_str("<div class=\"tablenav bottom\">");
    html.push_str(&bulk_actions_select(table, "action2"));
    html.push_str("</div>");
    html
}
