//! Parsed request parameters and URL helpers.

use catalog_core::{FieldValue, Fields, absint};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Query and body parameters of one admin request.
///
/// Lookups behave like a merged request bag: body values win over query
/// values of the same name.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    query: Vec<(String, String)>,
    body: Vec<(String, String)>,
    /// Set when output has already been flushed, so redirects must fall back to script.
    pub headers_sent: bool,
}

impl Request {
    pub fn get(query: &str) -> Self {
        Self {
            method: Method::Get,
            query: parse_pairs(query),
            ..Self::default()
        }
    }

    pub fn post(query: &str, body: &str) -> Self {
        Self {
            method: Method::Post,
            query: parse_pairs(query),
            body: parse_pairs(body),
            headers_sent: false,
        }
    }

    pub fn with_headers_sent(mut self, headers_sent: bool) -> Self {
        self.headers_sent = headers_sent;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        find_last(&self.body, name).or_else(|| find_last(&self.query, name))
    }

    /// The parameter when it is present and not blank or `"0"`.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.param(name)
            .filter(|value| !value.is_empty() && *value != "0")
    }

    /// Values of an array parameter such as `book[]` or `book[3]`.
    pub fn list(&self, name: &str) -> Vec<&str> {
        let from_body = find_array(&self.body, name);
        if from_body.is_empty() {
            find_array(&self.query, name)
        } else {
            from_body
        }
    }

    /// Absolute integer value of a parameter, `0` when absent.
    pub fn absint(&self, name: &str) -> i64 {
        self.param(name).map(absint).unwrap_or(0)
    }

    pub fn has_body(&self) -> bool {
        self.method == Method::Post && !self.body.is_empty()
    }

    /// Body parameters as text fields.
    pub fn body_fields(&self) -> Fields {
        self.body
            .iter()
            .map(|(key, value)| (key.clone(), FieldValue::Text(value.clone())))
            .collect()
    }

    /// `action` wins over `action2`; blank and `-1` mean "no action".
    pub fn current_action(&self) -> Option<&str> {
        let usable = |value: &&str| !value.is_empty() && *value != "-1";
        self.param("action")
            .filter(usable)
            .or_else(|| self.param("action2").filter(usable))
    }

    pub fn is_current_action(&self, action: &str) -> bool {
        self.current_action() == Some(action)
    }

    pub fn search_keyword(&self) -> Option<&str> {
        self.param("s")
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }

    /// Requested page number, never below 1.
    pub fn page_number(&self) -> usize {
        usize::try_from(self.absint("paged")).unwrap_or(1).max(1)
    }
}

fn find_last<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn find_array<'a>(pairs: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(key, _)| {
            key.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('['))
                .is_some_and(|rest| rest.ends_with(']'))
        })
        .map(|(_, value)| value.as_str())
        .collect()
}

fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}

/// Sets `key=value` on the URL's query string, replacing an existing `key`.
pub fn add_query_arg(url: &str, key: &str, value: &str) -> String {
    let (base, query) = url.split_once('?').unwrap_or((url, ""));
    let mut out = String::from(base);
    out.push('?');
    let mut first = true;
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let existing = pair.split_once('=').map_or(pair, |(k, _)| k);
        if decode(existing) == key {
            continue;
        }
        if !first {
            out.push('&');
        }
        out.push_str(pair);
        first = false;
    }
    if !first {
        out.push('&');
    }
    out.push_str(&urlencoding::encode(key));
    out.push('=');
    out.push_str(&urlencoding::encode(value));
    out
}

/// Carries the search, sort and page state of `request` over to `url`.
pub fn add_search_params_to_url(url: &str, request: &Request) -> String {
    let mut url = url.to_string();
    for name in ["s", "orderby", "order", "paged"] {
        if let Some(value) = request.non_empty(name) {
            url = add_query_arg(&url, name, value);
        }
    }
    url
}
