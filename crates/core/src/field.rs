use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The fixed set of label fields a submission can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    BrandName,
    ProductClass,
    AlcoholContent,
    NetContents,
    ManufacturerName,
    ManufacturerAddress,
}

impl FieldName {
    /// All fields, in form order.
    pub const ALL: [FieldName; 6] = [
        FieldName::BrandName,
        FieldName::ProductClass,
        FieldName::AlcoholContent,
        FieldName::NetContents,
        FieldName::ManufacturerName,
        FieldName::ManufacturerAddress,
    ];

    /// Wire name, as used in log records.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::BrandName => "brandName",
            FieldName::ProductClass => "productClass",
            FieldName::AlcoholContent => "alcoholContent",
            FieldName::NetContents => "netContents",
            FieldName::ManufacturerName => "manufacturerName",
            FieldName::ManufacturerAddress => "manufacturerAddress",
        }
    }

    /// Human-readable label for reports.
    pub fn label(self) -> &'static str {
        match self {
            FieldName::BrandName => "Brand name",
            FieldName::ProductClass => "Product class",
            FieldName::AlcoholContent => "Alcohol content",
            FieldName::NetContents => "Net contents",
            FieldName::ManufacturerName => "Manufacturer name",
            FieldName::ManufacturerAddress => "Manufacturer address",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown label field: '{0}'")]
pub struct UnknownField(pub String);

impl std::str::FromStr for FieldName {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// One expected value supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub field: FieldName,
    pub expected: String,
}

impl FieldEntry {
    pub fn new(field: FieldName, expected: impl Into<String>) -> Self {
        Self { field, expected: expected.into() }
    }

    /// Whitespace-only values count as empty and are never verified.
    pub fn is_empty(&self) -> bool {
        self.expected.trim().is_empty()
    }
}

/// The six-field submission form. Serializes with camelCase keys in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelFields {
    pub brand_name: String,
    pub product_class: String,
    pub alcohol_content: String,
    pub net_contents: String,
    pub manufacturer_name: String,
    pub manufacturer_address: String,
}

impl LabelFields {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::BrandName => &self.brand_name,
            FieldName::ProductClass => &self.product_class,
            FieldName::AlcoholContent => &self.alcohol_content,
            FieldName::NetContents => &self.net_contents,
            FieldName::ManufacturerName => &self.manufacturer_name,
            FieldName::ManufacturerAddress => &self.manufacturer_address,
        }
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        let slot = match field {
            FieldName::BrandName => &mut self.brand_name,
            FieldName::ProductClass => &mut self.product_class,
            FieldName::AlcoholContent => &mut self.alcohol_content,
            FieldName::NetContents => &mut self.net_contents,
            FieldName::ManufacturerName => &mut self.manufacturer_name,
            FieldName::ManufacturerAddress => &mut self.manufacturer_address,
        };
        *slot = value.into();
    }

    /// All six entries in form order, empty ones included.
    pub fn entries(&self) -> Vec<FieldEntry> {
        FieldName::ALL
            .into_iter()
            .map(|f| FieldEntry::new(f, self.get(f)))
            .collect()
    }
}
