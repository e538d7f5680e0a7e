//! Run-file I/O: loading measurement runs and writing processed datasets
//!
//! Runs live as NetCDF files named `run_<id>.nc` inside a data directory.
//! Coordinate variables are 1-D variables named after their dimension;
//! everything else becomes a data variable. Attribute maps survive the
//! round trip, and saved files get a `history` global attribute stamped
//! with the write time.

use crate::dataset::{AttrMap, Coordinate, DataVariable, Dataset};
use crate::errors::{Result, SweepVisError};
use chrono::Utc;
use ndarray::{Array1, ArrayD, Axis};
use netcdf::AttributeValue;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// External loader collaborator: resolve a run identifier to a dataset
pub trait RunLoader {
    fn load(&self, run_id: i64) -> Result<Dataset>;
}

/// Loader reading `run_<id>.nc` files from a data directory
#[derive(Debug, Clone)]
pub struct NetCdfRunLoader {
    root: PathBuf,
}

impl NetCdfRunLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File path a run identifier resolves to
    pub fn run_path(&self, run_id: i64) -> PathBuf {
        self.root.join(format!("run_{}.nc", run_id))
    }
}

impl RunLoader for NetCdfRunLoader {
    fn load(&self, run_id: i64) -> Result<Dataset> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(SweepVisError::RunNotFound { run: run_id });
        }
        let file = netcdf::open(&path)?;
        let mut dataset = read_dataset(&file)?;
        if dataset.run_id().is_none() {
            dataset.set_run_id(run_id);
        }
        Ok(dataset)
    }
}

/// Writer storing datasets as `run_<id>.nc` files in a directory
#[derive(Debug, Clone)]
pub struct NetCdfRunWriter {
    root: PathBuf,
}

impl NetCdfRunWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write a dataset under its run identifier (or the given fallback),
    /// returning the written path
    pub fn write(&self, dataset: &Dataset, fallback_run_id: i64) -> Result<PathBuf> {
        let run_id = dataset.run_id().unwrap_or(fallback_run_id);
        let path = self.root.join(format!("run_{}.nc", run_id));
        write_dataset(dataset, &path)?;
        Ok(path)
    }
}

/// Convert an open NetCDF file into a [`Dataset`]
pub fn read_dataset(file: &netcdf::File) -> Result<Dataset> {
    let mut dataset = Dataset::new();

    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            if let Some(v) = attr_to_json(&value) {
                dataset.attributes.insert(attr.name().to_string(), v);
            }
        }
    }

    for var in file.variables() {
        let name = var.name().to_string();
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let attributes = read_attrs(&var);

        if dims.len() == 1 && dims[0] == name {
            // a 1-D variable named after its dimension is a coordinate
            let values = var.get_values::<f64, _>(..)?;
            dataset.coords.push(Coordinate {
                name,
                values,
                attributes,
            });
        } else {
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let data = var.get_values::<f64, _>(..)?;
            let values = ArrayD::from_shape_vec(shape, data)?;
            dataset.data_vars.push(DataVariable {
                name,
                dims,
                values,
                attributes,
            });
        }
    }

    Ok(dataset)
}

/// Write a dataset to a NetCDF file, overwriting any existing file
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    let mut file = netcdf::create(path)?;

    let mut added: HashSet<String> = HashSet::new();
    for coord in &dataset.coords {
        file.add_dimension(&coord.name, coord.values.len())?;
        added.insert(coord.name.clone());
    }
    for var in &dataset.data_vars {
        for (axis, dim) in var.dims.iter().enumerate() {
            if !added.contains(dim) {
                file.add_dimension(dim, var.values.len_of(Axis(axis)))?;
                added.insert(dim.clone());
            }
        }
    }

    for coord in &dataset.coords {
        let dims = [coord.name.as_str()];
        let mut var = file.add_variable::<f64>(&coord.name, &dims)?;
        let values = Array1::from(coord.values.clone());
        var.put(values.view(), ..)?;
        for (name, value) in &coord.attributes {
            put_var_attr(&mut var, name, value)?;
        }
    }

    for data_var in &dataset.data_vars {
        let dims: Vec<&str> = data_var.dims.iter().map(String::as_str).collect();
        let mut var = file.add_variable::<f64>(&data_var.name, &dims)?;
        var.put(data_var.values.view(), ..)?;
        for (name, value) in &data_var.attributes {
            put_var_attr(&mut var, name, value)?;
        }
    }

    for (name, value) in &dataset.attributes {
        if name == "history" {
            continue;
        }
        put_file_attr(&mut file, name, value)?;
    }
    file.add_attribute(
        "history",
        format!("Created by RuSweepVis on {}", Utc::now().to_rfc3339()),
    )?;

    Ok(())
}

fn read_attrs(var: &netcdf::Variable<'_>) -> AttrMap {
    let mut attrs = AttrMap::new();
    for attr in var.attributes() {
        if let Ok(value) = attr.value() {
            if let Some(v) = attr_to_json(&value) {
                attrs.insert(attr.name().to_string(), v);
            }
        }
    }
    attrs
}

fn attr_to_json(value: &AttributeValue) -> Option<JsonValue> {
    match value {
        AttributeValue::Str(s) => Some(JsonValue::from(s.clone())),
        AttributeValue::Strs(ss) => Some(JsonValue::from(ss.clone())),
        AttributeValue::Float(v) => Some(JsonValue::from(f64::from(*v))),
        AttributeValue::Double(v) => Some(JsonValue::from(*v)),
        AttributeValue::Int(v) => Some(JsonValue::from(i64::from(*v))),
        AttributeValue::Uint(v) => Some(JsonValue::from(i64::from(*v))),
        AttributeValue::Short(v) => Some(JsonValue::from(i64::from(*v))),
        AttributeValue::Ushort(v) => Some(JsonValue::from(i64::from(*v))),
        AttributeValue::Uchar(v) => Some(JsonValue::from(i64::from(*v))),
        AttributeValue::Longlong(v) => Some(JsonValue::from(*v)),
        AttributeValue::Floats(vs) => Some(JsonValue::from(
            vs.iter().map(|&v| f64::from(v)).collect::<Vec<f64>>(),
        )),
        AttributeValue::Doubles(vs) => Some(JsonValue::from(vs.clone())),
        AttributeValue::Ints(vs) => Some(JsonValue::from(vs.clone())),
        _ => None,
    }
}

fn put_var_attr(var: &mut netcdf::VariableMut<'_>, name: &str, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(s) => {
            var.put_attribute(name, s.as_str())?;
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                var.put_attribute(name, i)?;
            } else if let Some(f) = n.as_f64() {
                var.put_attribute(name, f)?;
            }
        }
        JsonValue::Bool(b) => {
            var.put_attribute(name, i64::from(*b))?;
        }
        JsonValue::Array(items) => {
            let floats: Option<Vec<f64>> = items.iter().map(|v| v.as_f64()).collect();
            if let Some(fs) = floats {
                var.put_attribute(name, fs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn put_file_attr(file: &mut netcdf::FileMut, name: &str, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(s) => {
            file.add_attribute(name, s.as_str())?;
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                file.add_attribute(name, i)?;
            } else if let Some(f) = n.as_f64() {
                file.add_attribute(name, f)?;
            }
        }
        JsonValue::Bool(b) => {
            file.add_attribute(name, i64::from(*b))?;
        }
        _ => {}
    }
    Ok(())
}
