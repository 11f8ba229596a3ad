//! Generic filter and sort over in-memory lists.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use carpetas_core::error::AppError;
use carpetas_core::types::{SortDirection, SortField};
use carpetas_entity::invoice::InvoiceSummary;

/// A comparable value extracted from an item.
///
/// A missing value is modelled as `None` by the key function, not as a
/// variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// Compared by value.
    Number(f64),
    /// Compared chronologically.
    Date(NaiveDate),
    /// Compared with [`compare_text`].
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
        }
    }

    /// Ascending comparison. Keys of different kinds order
    /// `Number < Date < Text`.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => compare_text(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Text key, or `None` if the text is blank.
    pub fn text(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            None
        } else {
            Some(Self::Text(value.to_string()))
        }
    }
}

/// Base letters of `value`: decomposed, combining marks dropped, lowercased.
fn base_letters(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Dictionary order for display names.
///
/// Case and accents are ignored on the first pass, so `Álvarez` sorts with
/// the `a`s and `Núñez` with the `n`s. Accents only break ties. Strings that
/// differ in case alone compare `Equal`.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    base_letters(a).cmp(&base_letters(b)).then_with(|| {
        let a = a.nfc().collect::<String>().to_lowercase();
        let b = b.nfc().collect::<String>().to_lowercase();
        a.cmp(&b)
    })
}

/// Keep the items matching `predicate` and sort them stably by `sort_key`.
///
/// Items whose key is `None` come last in either direction, in their input
/// order.
pub fn filter_and_sort<T>(
    items: impl IntoIterator<Item = T>,
    predicate: impl Fn(&T) -> bool,
    sort_key: impl Fn(&T) -> Option<SortKey>,
    direction: SortDirection,
) -> Vec<T> {
    let mut keyed: Vec<(Option<SortKey>, T)> = items
        .into_iter()
        .filter(|item| predicate(item))
        .map(|item| (sort_key(&item), item))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.compare(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Invoice fields a caller may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSortField {
    NumeroFactura,
    Proveedor,
    Total,
    Fecha,
}

impl InvoiceSortField {
    /// The key of `invoice` for this field.
    pub fn key_of(&self, invoice: &InvoiceSummary) -> Option<SortKey> {
        match self {
            Self::NumeroFactura => SortKey::text(&invoice.numero_factura),
            Self::Proveedor => SortKey::text(&invoice.proveedor),
            Self::Total => Some(SortKey::Number(invoice.total)),
            Self::Fecha => invoice.fecha.map(SortKey::Date),
        }
    }

    /// Parse the field and direction of a [`SortField`].
    pub fn from_sort_field(sort: &SortField) -> Result<(Self, SortDirection), AppError> {
        Ok((sort.field.parse()?, sort.direction))
    }
}

impl fmt::Display for InvoiceSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumeroFactura => write!(f, "numero_factura"),
            Self::Proveedor => write!(f, "proveedor"),
            Self::Total => write!(f, "total"),
            Self::Fecha => write!(f, "fecha"),
        }
    }
}

impl FromStr for InvoiceSortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numero_factura" | "numero" => Ok(Self::NumeroFactura),
            "proveedor" => Ok(Self::Proveedor),
            "total" => Ok(Self::Total),
            "fecha" => Ok(Self::Fecha),
            other => {
                Err(AppError::invalid_input(format!("Unknown sort field '{other}'")).about(other))
            }
        }
    }
}

/// Whether an invoice's number or supplier contains `needle`, ignoring case.
/// A blank needle matches everything.
pub fn invoice_matches(invoice: &InvoiceSummary, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
        || invoice.numero_factura.to_lowercase().contains(&needle)
        || invoice.proveedor.to_lowercase().contains(&needle)
}
