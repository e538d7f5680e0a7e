//! Parameter registry: persisted display and rescale metadata
//!
//! Every coordinate and data-variable name encountered during reformatting
//! gets a [`Parameter`] carrying its verbose display name, unit and a
//! linear rescale (offset and multiplicative scale). The registry is an
//! explicit owned value, keyed by name, with at most one parameter per
//! name, backed by a flat JSON store. `lookup` returns snapshot clones;
//! all mutation goes through the registry by name.

use crate::errors::{Result, SweepVisError};
use crate::store::{JsonMap, JsonStore};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

/// Display and rescale metadata for one coordinate or variable name
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub verbose_name: String,
    pub unit: String,
    pub scale: f64,
    pub offset: f64,
}

impl Parameter {
    /// Construct an axis label by combining the verbose name and the unit
    pub fn as_label(&self, with_unit: bool) -> String {
        if with_unit {
            format!("{} ({})", self.verbose_name, self.unit)
        } else {
            self.verbose_name.clone()
        }
    }
}

/// Attributes accepted by [`ParameterRegistry::create`]; unset fields fall
/// back to the defaults (name itself, `"-"`, scale 1, offset 0)
#[derive(Debug, Clone, Default)]
pub struct ParameterSpec {
    pub verbose_name: Option<String>,
    pub unit: Option<String>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

/// Keyed store of [`Parameter`] values with a persisted JSON backing store
#[derive(Debug)]
pub struct ParameterRegistry {
    store: JsonStore,
    params: BTreeMap<String, Parameter>,
}

impl ParameterRegistry {
    /// File name of the backing store inside the store directory
    pub const STORE_NAME: &'static str = "verbose_params.json";

    /// Open the registry, loading any previously persisted parameters
    pub fn open(store_dir: &Path) -> Result<Self> {
        let store = JsonStore::new(store_dir, Self::STORE_NAME);
        let mut registry = Self {
            store,
            params: BTreeMap::new(),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Register a new parameter. Does not persist by itself; pair with
    /// [`save`](Self::save) to keep the backing store current.
    pub fn create(&mut self, name: &str, spec: ParameterSpec) -> Result<&Parameter> {
        if self.params.contains_key(name) {
            return Err(SweepVisError::DuplicateParameter {
                name: name.to_string(),
            });
        }
        let param = Parameter {
            name: name.to_string(),
            verbose_name: spec.verbose_name.unwrap_or_else(|| name.to_string()),
            unit: spec.unit.unwrap_or_else(|| "-".to_string()),
            scale: spec.scale.unwrap_or(1.0),
            offset: spec.offset.unwrap_or(0.0),
        };
        self.params.insert(name.to_string(), param);
        Ok(&self.params[name])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Snapshot of the parameter registered under `name`
    pub fn lookup(&self, name: &str) -> Result<Parameter> {
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| SweepVisError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    /// Label for `name`, `"{verbose_name} ({unit})"` or the bare verbose name
    pub fn as_label(&self, name: &str, with_unit: bool) -> Result<String> {
        Ok(self.lookup(name)?.as_label(with_unit))
    }

    /// Apply string-keyed field assignments to a parameter and persist the
    /// full registry. An unknown field name fails with `UnknownField`; a
    /// missing parameter is created with defaults first.
    pub fn update(&mut self, name: &str, fields: &[(&str, JsonValue)]) -> Result<()> {
        if !self.params.contains_key(name) {
            self.create(name, ParameterSpec::default())?;
        }
        {
            let param = match self.params.get_mut(name) {
                Some(param) => param,
                None => {
                    return Err(SweepVisError::ParameterNotFound {
                        name: name.to_string(),
                    })
                }
            };
            for (field, value) in fields {
                match *field {
                    "verbose_name" => {
                        param.verbose_name = expect_string(field, value)?;
                    }
                    "unit" => {
                        param.unit = expect_string(field, value)?;
                    }
                    "scale" => {
                        param.scale = expect_number(field, value)?;
                    }
                    "offset" => {
                        param.offset = expect_number(field, value)?;
                    }
                    other => {
                        return Err(SweepVisError::UnknownField {
                            field: other.to_string(),
                        })
                    }
                }
            }
        }
        self.save()
    }

    /// Serialize every parameter's four mutable attributes keyed by name,
    /// overwriting the backing store entirely
    pub fn save(&self) -> Result<()> {
        let mut doc = JsonMap::new();
        for (name, param) in &self.params {
            doc.insert(
                name.clone(),
                json!({
                    "verbose_name": param.verbose_name,
                    "unit": param.unit,
                    "scale": param.scale,
                    "offset": param.offset,
                }),
            );
        }
        self.store.write(&doc)
    }

    /// Clear the in-memory registry and repopulate it from the backing
    /// store. Previously returned snapshots are stale afterwards;
    /// re-lookup by name.
    pub fn reload(&mut self) -> Result<()> {
        self.params.clear();
        let doc = self.store.read_or_init(JsonMap::new)?;
        for (name, entry) in &doc {
            let spec = ParameterSpec {
                verbose_name: entry
                    .get("verbose_name")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                unit: entry.get("unit").and_then(|v| v.as_str()).map(str::to_string),
                scale: entry.get("scale").and_then(|v| v.as_f64()),
                offset: entry.get("offset").and_then(|v| v.as_f64()),
            };
            self.create(name, spec)?;
        }
        Ok(())
    }

    /// All registered parameters in name order
    pub fn list(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn expect_string(field: &str, value: &JsonValue) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SweepVisError::Generic(format!("Field '{}' expects a string value", field)))
}

fn expect_number(field: &str, value: &JsonValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| SweepVisError::Generic(format!("Field '{}' expects a numeric value", field)))
}
