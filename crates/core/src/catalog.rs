use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_OPTION_NAME: &str = "Standard";

const BUILTIN_CATALOG: &str = include_str!("../data/pricing.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate catalog category `{0}`")]
    DuplicateCategory(String),
    #[error("category `{category}` uses custom line items but is missing `{field}`")]
    MissingRate { category: String, field: &'static str },
    #[error("category `{0}` cannot combine custom line items with fixed options")]
    ConflictingBillingMode(String),
    #[error("category `{0}` has a negative price")]
    NegativePrice(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<u64>,
}

impl PricingOption {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or(DEFAULT_OPTION_NAME)
    }

    /// Pack size, if the option is sold in packs. A zero pack means "not packed".
    pub fn pack_size(&self) -> Option<u64> {
        self.pack.filter(|pack| *pack > 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillingMode {
    Standard { options_exclusive: bool, options: Vec<PricingOption> },
    CustomLines { ingest_price: Decimal, retention_price: Decimal },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricingCategory {
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub billing: BillingMode,
}

impl PricingCategory {
    pub fn is_exclusive(&self) -> bool {
        matches!(self.billing, BillingMode::Standard { options_exclusive: true, .. })
    }

    pub fn options(&self) -> &[PricingOption] {
        match &self.billing {
            BillingMode::Standard { options, .. } => options,
            BillingMode::CustomLines { .. } => &[],
        }
    }

    /// Unit shown next to an option's price: the option override, else the category unit.
    pub fn option_unit<'a>(&'a self, option: &'a PricingOption) -> Option<&'a str> {
        option.unit.as_deref().or(self.unit.as_deref())
    }

    /// Volume noun of the category unit: "Per GB ingested" → "GB".
    pub fn ingestion_noun(&self) -> Option<&str> {
        let unit = self.unit.as_deref()?.trim();
        let rest = unit.strip_prefix("Per ").or_else(|| unit.strip_prefix("per "))?;
        rest.split_whitespace().next()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PricingCatalog {
    categories: Vec<PricingCategory>,
}

impl PricingCatalog {
    pub fn new(categories: Vec<PricingCategory>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
        }

        Ok(Self { categories })
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        let categories = document
            .0
            .into_iter()
            .map(|(name, entry)| entry.into_category(name))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(categories)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
    }

    pub fn categories(&self) -> &[PricingCategory] {
        &self.categories
    }

    pub fn find(&self, name: &str) -> Option<&PricingCategory> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    options_exclusive: bool,
    #[serde(default)]
    custom_line_items: bool,
    #[serde(default)]
    ingest_price: Option<Decimal>,
    #[serde(default)]
    retention_price: Option<Decimal>,
    #[serde(default)]
    options: Vec<PricingOption>,
}

impl CatalogEntry {
    fn into_category(self, name: String) -> Result<PricingCategory, CatalogError> {
        let billing = if self.custom_line_items {
            if !self.options.is_empty() {
                return Err(CatalogError::ConflictingBillingMode(name));
            }
            let ingest_price = self.ingest_price.ok_or_else(|| CatalogError::MissingRate {
                category: name.clone(),
                field: "ingestPrice",
            })?;
            let retention_price = self.retention_price.ok_or_else(|| CatalogError::MissingRate {
                category: name.clone(),
                field: "retentionPrice",
            })?;
            if ingest_price < Decimal::ZERO || retention_price < Decimal::ZERO {
                return Err(CatalogError::NegativePrice(name));
            }
            BillingMode::CustomLines { ingest_price, retention_price }
        } else {
            if self.options.iter().any(|option| option.price < Decimal::ZERO) {
                return Err(CatalogError::NegativePrice(name));
            }
            let options_exclusive = self.options_exclusive;
            BillingMode::Standard { options_exclusive, options: self.options }
        };

        Ok(PricingCategory { name, unit: self.unit, description: self.description, billing })
    }
}

/// Catalog JSON object with its key order preserved.
struct CatalogDocument(Vec<(String, CatalogEntry)>);

impl<'de> Deserialize<'de> for CatalogDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = CatalogDocument;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of category name to category definition")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, entry)) = map.next_entry::<String, CatalogEntry>()? {
                    entries.push((name, entry));
                }
                Ok(CatalogDocument(entries))
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}
