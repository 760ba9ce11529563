use crate::error::{LedgerError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_SCHEMA: &str = include_str!("../config/sierra_schema.json");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum DuplicatePolicy {
    #[schemars(
        description = "Keep the last occurrence of a repeated category name. Needed when sub-section subtotals share a name with later, different totals."
    )]
    #[default]
    KeepLast,

    #[schemars(description = "Keep the first occurrence of a repeated category name.")]
    KeepFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LedgerLayout {
    #[serde(default = "default_aggregate_column")]
    #[schemars(description = "Header of the pre-computed aggregate column that is dropped on load.")]
    pub aggregate_column: String,

    #[serde(default = "default_date_format")]
    #[schemars(
        description = "chrono format string for the date column labels, e.g. '%b %d, %y' for 'Jan 5, 24'."
    )]
    pub date_format: String,

    #[serde(default)]
    #[schemars(description = "How repeated category names are resolved after the reshape.")]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_aggregate_column() -> String {
    "TOTAL".to_string()
}

fn default_date_format() -> String {
    "%b %d, %y".to_string()
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            aggregate_column: default_aggregate_column(),
            date_format: default_date_format(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ViewKind {
    #[schemars(description = "Home page: income, COGS, expenses and net income side by side.")]
    Overview,

    #[schemars(description = "Income breakdown by revenue stream.")]
    Income,

    #[schemars(description = "Cost of goods sold breakdown: labor, equipment, materials, vehicles.")]
    Cogs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TrendChart {
    #[schemars(description = "Chart title shown above the weekly line.")]
    pub title: String,

    #[schemars(description = "The single category plotted week over week.")]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ComponentGroup {
    #[schemars(description = "Chart title; also the key used to select a subset of members.")]
    pub title: String,

    #[schemars(
        description = "Member categories plotted as separate weekly series. All are selected unless the caller narrows the selection."
    )]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ViewDefinition {
    #[schemars(description = "Stable identifier used to request the view, e.g. 'income'.")]
    pub id: String,

    pub title: String,

    pub kind: ViewKind,

    #[schemars(description = "Categories shown as headline totals over the selected date range.")]
    pub metrics: Vec<String>,

    #[serde(default)]
    pub trends: Vec<TrendChart>,

    #[serde(default)]
    pub component_groups: Vec<ComponentGroup>,
}

impl ViewDefinition {
    /// Every category the weekly table for this view needs, first mention wins.
    pub fn weekly_categories(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut categories = Vec::new();
        let trend_names = self.trends.iter().map(|t| t.category.as_str());
        let group_names = self
            .component_groups
            .iter()
            .flat_map(|g| g.categories.iter().map(String::as_str));

        for name in trend_names.chain(group_names) {
            if seen.insert(name) {
                categories.push(name.to_string());
            }
        }
        categories
    }

    /// Metrics plus weekly categories, de-duplicated.
    pub fn referenced_categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.metrics
            .iter()
            .cloned()
            .chain(self.weekly_categories())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    pub fn component_group(&self, title: &str) -> Option<&ComponentGroup> {
        self.component_groups.iter().find(|g| g.title == title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LedgerSchema {
    #[schemars(description = "Human readable name of the ledger this schema describes.")]
    pub name: String,

    #[schemars(description = "Schema revision; bump when categories are added or renamed.")]
    pub version: u32,

    #[serde(default)]
    pub layout: LedgerLayout,

    pub views: Vec<ViewDefinition>,
}

impl LedgerSchema {
    /// The bundled Sierra Mining & Crushing schema.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_SCHEMA)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: LedgerSchema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn view(&self, id: &str) -> Option<&ViewDefinition> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout.aggregate_column.trim().is_empty() {
            return Err(LedgerError::Config(
                "aggregate column name must not be empty".to_string(),
            ));
        }
        if self.layout.date_format.trim().is_empty() {
            return Err(LedgerError::Config("date format must not be empty".to_string()));
        }
        if self.views.is_empty() {
            return Err(LedgerError::Config(format!(
                "schema '{}' defines no views",
                self.name
            )));
        }

        let mut ids = HashSet::new();
        for view in &self.views {
            if !ids.insert(view.id.as_str()) {
                return Err(LedgerError::Config(format!("duplicate view id '{}'", view.id)));
            }
            if view.referenced_categories().iter().any(|c| c.trim().is_empty()) {
                return Err(LedgerError::Config(format!(
                    "view '{}' references an empty category name",
                    view.id
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LedgerSchema)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
