//! Labeled dataset model for measurement sweeps
//!
//! A [`Dataset`] is an ordered collection of named 1-D coordinates and named
//! multi-dimensional data variables, each carrying a JSON attribute map.
//! This mirrors the structure of a measurement run file: coordinate
//! variables describe the swept axes, data variables hold the measured
//! values over those axes.

use crate::errors::{Result, SweepVisError};
use ndarray::{ArrayD, Axis};
use serde_json::Value as JsonValue;

/// Attribute map attached to datasets, coordinates and data variables
pub type AttrMap = serde_json::Map<String, JsonValue>;

/// Fetch a string attribute, if present and of string type
pub fn attr_str<'a>(attrs: &'a AttrMap, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(|v| v.as_str())
}

/// A named 1-D sweep axis with its own values and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub values: Vec<f64>,
    pub attributes: AttrMap,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            attributes: AttrMap::new(),
        }
    }

    pub fn with_attrs(mut self, attributes: AttrMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// A coordinate spanning more than one distinct sample is non-degenerate
    pub fn is_degenerate(&self) -> bool {
        match self.values.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|v| v == first),
        }
    }

    /// Index of the value closest to `target`
    pub fn nearest_index(&self, target: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            let dist = (v - target).abs();
            match best {
                Some((_, d)) if d <= dist => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// A named measured quantity over one or more coordinate axes
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    /// Coordinate names for each axis of `values`, outermost first
    pub dims: Vec<String>,
    pub values: ArrayD<f64>,
    pub attributes: AttrMap,
}

impl DataVariable {
    pub fn new(name: impl Into<String>, dims: Vec<String>, values: ArrayD<f64>) -> Self {
        Self {
            name: name.into(),
            dims,
            values,
            attributes: AttrMap::new(),
        }
    }

    pub fn with_attrs(mut self, attributes: AttrMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Drop all axes of length one
    pub fn squeezed(&self) -> ArrayD<f64> {
        let mut out = self.values.clone();
        let mut axis = 0;
        while axis < out.ndim() {
            if out.len_of(Axis(axis)) == 1 && out.ndim() > 1 {
                out = out.index_axis(Axis(axis), 0).to_owned();
            } else {
                axis += 1;
            }
        }
        out
    }
}

/// A labeled multi-dimensional array collection: coordinates, data
/// variables and dataset-level attributes (run identifier, snapshot)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub coords: Vec<Coordinate>,
    pub data_vars: Vec<DataVariable>,
    pub attributes: AttrMap,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coord_names(&self) -> Vec<&str> {
        self.coords.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.data_vars.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn coord_mut(&mut self, name: &str) -> Option<&mut Coordinate> {
        self.coords.iter_mut().find(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut DataVariable> {
        self.data_vars.iter_mut().find(|v| v.name == name)
    }

    /// Run identifier carried in the dataset attributes, if any
    pub fn run_id(&self) -> Option<i64> {
        self.attributes.get("run_id").and_then(|v| v.as_i64())
    }

    pub fn set_run_id(&mut self, run_id: i64) {
        self.attributes
            .insert("run_id".to_string(), JsonValue::from(run_id));
    }

    /// Serialized instrument snapshot carried in the dataset attributes
    pub fn snapshot(&self) -> Option<&str> {
        attr_str(&self.attributes, "snapshot")
    }

    /// Label for error annotation: the run id when known, a generic tag otherwise
    pub fn origin_label(&self) -> String {
        match self.run_id() {
            Some(id) => format!("run {}", id),
            None => "<unidentified dataset>".to_string(),
        }
    }

    /// Coordinates of a variable, in the variable's axis order
    pub fn var_coords(&self, var: &DataVariable) -> Vec<&Coordinate> {
        var.dims
            .iter()
            .filter_map(|d| self.coord(d))
            .collect()
    }

    /// Coordinates of a variable spanning more than one sample
    pub fn non_degenerate_coords(&self, var: &DataVariable) -> Vec<&Coordinate> {
        self.var_coords(var)
            .into_iter()
            .filter(|c| !c.is_degenerate())
            .collect()
    }

    /// New dataset retaining only the named variables, and the coordinates
    /// they reference. Order follows the `names` argument.
    pub fn select_vars(&self, names: &[&str]) -> Result<Dataset> {
        let mut data_vars = Vec::with_capacity(names.len());
        for &name in names {
            let var = self
                .variable(name)
                .ok_or_else(|| SweepVisError::VariableNotFound {
                    var: name.to_string(),
                })?;
            data_vars.push(var.clone());
        }

        let coords = self
            .coords
            .iter()
            .filter(|c| data_vars.iter().any(|v| v.dims.contains(&c.name)))
            .cloned()
            .collect();

        Ok(Dataset {
            coords,
            data_vars,
            attributes: self.attributes.clone(),
        })
    }

    /// Nearest-neighbor selection along a coordinate, producing a dataset of
    /// one lower dimensionality. The selected coordinate collapses to the
    /// single chosen value; variables not spanning it are left untouched.
    pub fn sel_nearest(&self, coord_name: &str, value: f64) -> Result<Dataset> {
        let coord = self
            .coord(coord_name)
            .ok_or_else(|| SweepVisError::CoordinateNotFound {
                coord: coord_name.to_string(),
            })?;
        let index = coord
            .nearest_index(value)
            .ok_or_else(|| SweepVisError::CoordinateNotFound {
                coord: coord_name.to_string(),
            })?;
        Ok(self.take_index(coord_name, index))
    }

    /// Exact-value selection along a coordinate
    pub fn sel_exact(&self, coord_name: &str, value: f64) -> Result<Dataset> {
        let coord = self
            .coord(coord_name)
            .ok_or_else(|| SweepVisError::CoordinateNotFound {
                coord: coord_name.to_string(),
            })?;
        let index = coord
            .values
            .iter()
            .position(|&v| v == value)
            .ok_or_else(|| SweepVisError::CoordinateNotFound {
                coord: format!("{} = {}", coord_name, value),
            })?;
        Ok(self.take_index(coord_name, index))
    }

    /// Range selection along a coordinate, keeping values within `[lo, hi]`
    pub fn sel_range(&self, coord_name: &str, lo: f64, hi: f64) -> Result<Dataset> {
        let coord = self
            .coord(coord_name)
            .ok_or_else(|| SweepVisError::CoordinateNotFound {
                coord: coord_name.to_string(),
            })?;
        let keep: Vec<usize> = coord
            .values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= lo && v <= hi)
            .map(|(i, _)| i)
            .collect();

        let mut out = self.clone();
        if let Some(c) = out.coord_mut(coord_name) {
            let kept: Vec<f64> = keep.iter().map(|&i| c.values[i]).collect();
            c.values = kept;
        }
        for var in &mut out.data_vars {
            if let Some(axis) = var.dims.iter().position(|d| d == coord_name) {
                var.values = var.values.select(Axis(axis), &keep);
            }
        }
        Ok(out)
    }

    /// Reverse the axis order of every data variable
    pub fn transpose(&mut self) {
        for var in &mut self.data_vars {
            let reversed = var.values.clone().reversed_axes();
            var.values = reversed.as_standard_layout().to_owned();
            var.dims.reverse();
        }
    }

    fn take_index(&self, coord_name: &str, index: usize) -> Dataset {
        let mut out = self.clone();
        if let Some(c) = out.coord_mut(coord_name) {
            c.values = vec![c.values[index]];
        }
        for var in &mut out.data_vars {
            if let Some(axis) = var.dims.iter().position(|d| d == coord_name) {
                var.values = var.values.index_axis(Axis(axis), index).to_owned();
                var.dims.remove(axis);
            }
        }
        out
    }
}
