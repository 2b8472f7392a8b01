//! Categories group transactions and optionally carry a monthly spending limit.

mod domain;

pub use domain::{Category, CategoryData, CategoryName, Color, DEFAULT_CATEGORY_COLOR};
