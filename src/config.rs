//! Plot configuration store
//!
//! Auto-layout sizing and style settings, persisted as one JSON document
//! with a built-in default written on first use. The document is kept
//! verbatim: keys the engine does not recognize stay in place and the
//! style sections are handed to the renderer untouched, so renderer-
//! specific options pass straight through.

use crate::errors::{Result, SweepVisError};
use crate::store::{JsonMap, JsonStore};
use serde_json::{json, Value as JsonValue};
use std::path::Path;

/// Persisted plot configuration consumed by the auto-layout engine
#[derive(Debug, Clone)]
pub struct PlotConfig {
    store: JsonStore,
    doc: JsonMap,
}

impl PlotConfig {
    /// File name of the backing store inside the store directory
    pub const STORE_NAME: &'static str = "plot_configs.json";

    /// Load the configuration, creating the store with defaults if absent
    pub fn load(store_dir: &Path) -> Result<Self> {
        let store = JsonStore::new(store_dir, Self::STORE_NAME);
        let doc = store.read_or_init(Self::default_template)?;
        Ok(Self { store, doc })
    }

    /// Content of a default config file
    pub fn default_template() -> JsonMap {
        let template = json!({
            "figs": {
                "max_cols": 3,
                "row_height": 2,
                "col_width": 2,
                "minorticks": 2,
                "add_colorbars": true,
                "set_title": true,
            },
            "colorbar": {
                "length": 0.8,
                "width": 0.05,
                "align": "right",
                "location": "top",
                "pad": -1,
                "ticklabelsize": 7,
            },
            "mesh": {
                "levels": 1000,
                "cmap": "magma",
            },
            "line": {
                "linewidth": 1,
            },
        });
        match template {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        }
    }

    /// Grid width cap
    pub fn max_cols(&self) -> usize {
        self.figs_u64("max_cols", 3) as usize
    }

    /// Physical height per grid row
    pub fn row_height(&self) -> f64 {
        self.figs_f64("row_height", 2.0)
    }

    /// Physical width per grid column
    pub fn col_width(&self) -> f64 {
        self.figs_f64("col_width", 2.0)
    }

    /// Minor tick subdivisions per axis
    pub fn minorticks(&self) -> u32 {
        self.figs_u64("minorticks", 2) as u32
    }

    pub fn add_colorbars(&self) -> bool {
        self.figs_bool("add_colorbars", true)
    }

    pub fn set_title(&self) -> bool {
        self.figs_bool("set_title", true)
    }

    /// A style section (`colorbar`, `mesh`, `line`), passed to the renderer
    /// verbatim including keys this crate knows nothing about
    pub fn style(&self, section: &str) -> JsonMap {
        match self.doc.get(section) {
            Some(JsonValue::Object(map)) => map.clone(),
            _ => JsonMap::new(),
        }
    }

    /// Update one setting and persist the document. An unknown category
    /// starts a new section; an unknown key within a known category is
    /// stored as-is (pass-through policy).
    pub fn update(&mut self, category: &str, key: &str, value: JsonValue) -> Result<()> {
        let section = self
            .doc
            .entry(category.to_string())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        match section {
            JsonValue::Object(map) => {
                map.insert(key.to_string(), value);
            }
            _ => {
                return Err(SweepVisError::Generic(format!(
                    "Configuration category '{}' is not a mapping",
                    category
                )))
            }
        }
        self.store.write(&self.doc)
    }

    fn figs_u64(&self, key: &str, default: u64) -> u64 {
        self.doc
            .get("figs")
            .and_then(|f| f.get(key))
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
            .unwrap_or(default)
    }

    fn figs_f64(&self, key: &str, default: f64) -> f64 {
        self.doc
            .get("figs")
            .and_then(|f| f.get(key))
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    fn figs_bool(&self, key: &str, default: bool) -> bool {
        self.doc
            .get("figs")
            .and_then(|f| f.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }
}
