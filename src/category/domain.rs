//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    client::{Record, Resource},
    database_id::{CategoryId, DatabaseId},
};

/// The colour the server assigns when a category is created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#167ec5";

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty
    /// or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hex RGB colour of the form `#RRGGBB`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Create a colour from a `#RRGGBB` string. The hex digits are normalised
    /// to lower case.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidColor] if `color` is not a `#` followed by
    /// exactly six hex digits.
    pub fn new(color: &str) -> Result<Self, Error> {
        let color = color.trim();

        match color.strip_prefix('#') {
            Some(hex) if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(color.to_ascii_lowercase()))
            }
            _ => Err(Error::InvalidColor(color.to_owned())),
        }
    }

    /// The red, green and blue components.
    ///
    /// Colours received from the server are not validated, so this returns
    /// `None` for a malformed value.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;

        if hex.len() != 6 {
            return None;
        }

        let component =
            |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();

        Some((component(0..2)?, component(2..4)?, component(4..6)?))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self(DEFAULT_CATEGORY_COLOR.to_owned())
    }
}

impl AsRef<str> for Color {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category for expenses and income, e.g. 'Groceries', 'Eating Out', 'Wages'.
///
/// Older server versions do not know about `color` or `monthly_limit`, so both
/// default to absent when missing from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The server-assigned ID of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: CategoryName,
    /// The display colour of the category.
    #[serde(default)]
    pub color: Option<Color>,
    /// The most the user wants to spend in this category each month.
    #[serde(default)]
    pub monthly_limit: Option<Decimal>,
}

impl Record for Category {
    const RESOURCE: Resource = Resource::Categories;
    type Payload = CategoryData;
    type Filter = ();

    fn id(&self) -> DatabaseId {
        self.id
    }
}

/// The payload for creating or replacing a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryData {
    /// The name of the category.
    pub name: CategoryName,
    /// The display colour, the server default is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// The monthly spending limit, `None` clears any existing limit.
    pub monthly_limit: Option<Decimal>,
}

impl CategoryData {
    /// Create a payload for a category with no colour or limit.
    pub fn new(name: CategoryName) -> Self {
        Self {
            name,
            color: None,
            monthly_limit: None,
        }
    }

    /// Set the display colour.
    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the monthly spending limit.
    pub fn monthly_limit(mut self, monthly_limit: Option<Decimal>) -> Self {
        self.monthly_limit = monthly_limit;
        self
    }
}

impl From<&Category> for CategoryData {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            color: category.color.clone(),
            monthly_limit: category.monthly_limit,
        }
    }
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_surrounding_whitespace() {
        let name = CategoryName::new("  Groceries ").unwrap();

        assert_eq!(name.as_ref(), "Groceries");
    }
}
