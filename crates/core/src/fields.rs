//! Column schemas, type tags and value coercion.

use std::collections::BTreeMap;

use crate::{MAX_TAG_GROUP, TagGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Caller-supplied name/value pairs, typically straight from a form body.
pub type Fields = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn coerce(&self, ty: FieldType) -> FieldValue {
        match ty {
            FieldType::Int => FieldValue::Int(self.as_int()),
            FieldType::Float => FieldValue::Float(self.as_float()),
            FieldType::Text => FieldValue::Text(self.as_text()),
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            FieldValue::Int(value) => *value,
            FieldValue::Float(value) if value.is_finite() => value.trunc() as i64,
            FieldValue::Float(_) => 0,
            FieldValue::Text(value) => parse_int_prefix(value),
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            FieldValue::Int(value) => *value as f64,
            FieldValue::Float(value) => *value,
            FieldValue::Text(value) => parse_float_prefix(value),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Int(value) => value.to_string(),
            FieldValue::Float(value) => value.to_string(),
            FieldValue::Text(value) => value.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// Leading integer of `value`, `0` when there is none. `"12abc"` is 12.
pub fn parse_int_prefix(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(if end == 0 { 0 } else { i64::MAX });
    if negative { -magnitude } else { magnitude }
}

/// Leading decimal number of `value`, `0.0` when there is none.
pub fn parse_float_prefix(value: &str) -> f64 {
    let value = value.trim_start();
    let end = value
        .find(|ch: char| !(ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(value.len());
    let mut candidate = &value[..end];
    while !candidate.is_empty() {
        if let Ok(parsed) = candidate.parse::<f64>() {
            return parsed;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

/// Absolute value of the leading integer.
pub fn absint(value: &str) -> i64 {
    parse_int_prefix(value).saturating_abs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Part of the primary key, always bound from the scoped user/site.
    Identity,
    /// Written by the store itself, never taken from callers.
    Managed,
    /// Callers may set it.
    Mutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub role: ColumnRole,
}

pub const ENTRY_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        name: "users_id",
        ty: FieldType::Int,
        role: ColumnRole::Identity,
    },
    ColumnSpec {
        name: "blogs_id",
        ty: FieldType::Int,
        role: ColumnRole::Identity,
    },
    ColumnSpec {
        name: "deleted",
        ty: FieldType::Int,
        role: ColumnRole::Managed,
    },
    ColumnSpec {
        name: "featured",
        ty: FieldType::Int,
        role: ColumnRole::Mutable,
    },
];

/// Whitelisted changes to a catalog entry. `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryChanges {
    pub featured: Option<i64>,
}

impl EntryChanges {
    pub fn featured(value: i64) -> Self {
        Self {
            featured: Some(value),
        }
    }

    /// Keeps only the caller-settable columns of [`ENTRY_COLUMNS`].
    pub fn from_fields(fields: &Fields) -> Self {
        let mut changes = Self::default();
        for column in ENTRY_COLUMNS
            .iter()
            .filter(|column| column.role == ColumnRole::Mutable)
        {
            let Some(value) = fields.get(column.name) else {
                continue;
            };
            if column.name == "featured" {
                changes.featured = Some(value.coerce(column.ty).as_int());
            }
        }
        changes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileKey {
    pub name: String,
    pub ty: FieldType,
}

pub const PROFILE_ABOUT: &str = "pressbooks_catalog_about";
pub const PROFILE_LOGO: &str = "pressbooks_catalog_logo";

/// Every profile key the catalog recognizes, in display order.
pub fn profile_keys() -> Vec<ProfileKey> {
    let mut keys = vec![
        ProfileKey {
            name: PROFILE_ABOUT.to_string(),
            ty: FieldType::Text,
        },
        ProfileKey {
            name: PROFILE_LOGO.to_string(),
            ty: FieldType::Text,
        },
    ];
    for group in 1..=MAX_TAG_GROUP {
        keys.push(ProfileKey {
            name: tag_group_name_key(group),
            ty: FieldType::Text,
        });
    }
    keys
}

pub fn tag_group_name_key(group: u8) -> String {
    format!("pressbooks_catalog_tag_{group}_name")
}

/// Drops unknown keys and coerces the rest to their declared type.
pub fn sanitize_profile(fields: &Fields) -> Vec<(String, FieldValue)> {
    profile_keys()
        .into_iter()
        .filter_map(|key| {
            let value = fields.get(&key.name)?.coerce(key.ty);
            Some((key.name, value))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub values: BTreeMap<String, FieldValue>,
}

impl Profile {
    pub fn text(&self, key: &str) -> String {
        self.values
            .get(key)
            .map(FieldValue::as_text)
            .unwrap_or_default()
    }

    pub fn about(&self) -> String {
        self.text(PROFILE_ABOUT)
    }

    pub fn logo(&self) -> String {
        self.text(PROFILE_LOGO)
    }

    /// Display name override for a tag group, if one is set.
    pub fn tag_group_name(&self, group: TagGroup) -> Option<String> {
        let name = self.text(&tag_group_name_key(group.get()));
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}
