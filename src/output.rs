//! Dataset assembly, reformatting and subsetting
//!
//! [`SweepOutput`] is the ordered collection of datasets the rest of the
//! crate operates on. Assembly normalizes heterogeneous input (run ids,
//! in-memory datasets, or lists mixing both) plus an optional variable
//! filter into one collection; reformatting applies the parameter
//! registry's relabeling and linear rescale to every coordinate and
//! variable; the subset protocol carves new collections out of an
//! existing one without touching the parent.

use crate::dataset::Dataset;
use crate::errors::{Result, SweepVisError};
use crate::parameters::{ParameterRegistry, ParameterSpec};
use crate::run_io::RunLoader;
use serde_json::Value as JsonValue;
use std::ops::Range;

/// One element of the assembly input: a run to load or a ready dataset
#[derive(Debug, Clone)]
pub enum DataInput {
    Run(i64),
    Data(Dataset),
}

impl From<i64> for DataInput {
    fn from(run_id: i64) -> Self {
        DataInput::Run(run_id)
    }
}

impl From<Dataset> for DataInput {
    fn from(dataset: Dataset) -> Self {
        DataInput::Data(dataset)
    }
}

/// Variable-name filter accepted by [`SweepOutput::assemble`]
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// A single name, broadcast to every input
    One(String),
    /// A flat name list, broadcast to every input
    Flat(Vec<String>),
    /// One name list per input; length must match the input count
    PerDataset(Vec<Vec<String>>),
}

impl KeyFilter {
    /// Expand to one name list per input element
    fn normalize(self, n_inputs: usize) -> Result<Vec<Vec<String>>> {
        match self {
            KeyFilter::One(name) => Ok(vec![vec![name]; n_inputs]),
            KeyFilter::Flat(names) => Ok(vec![names; n_inputs]),
            KeyFilter::PerDataset(lists) => {
                if lists.len() != n_inputs {
                    return Err(SweepVisError::ShapeMismatch {
                        message: format!(
                            "{} key list(s) supplied for {} input(s)",
                            lists.len(),
                            n_inputs
                        ),
                    });
                }
                Ok(lists)
            }
        }
    }
}

/// Subset index dispatched on by [`SweepOutput::subset`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetIndex {
    Position(usize),
    Range(Range<usize>),
    Positions(Vec<usize>),
    Variable(String),
}

impl From<usize> for SubsetIndex {
    fn from(index: usize) -> Self {
        SubsetIndex::Position(index)
    }
}

impl From<Range<usize>> for SubsetIndex {
    fn from(range: Range<usize>) -> Self {
        SubsetIndex::Range(range)
    }
}

impl From<&[usize]> for SubsetIndex {
    fn from(positions: &[usize]) -> Self {
        SubsetIndex::Positions(positions.to_vec())
    }
}

impl From<Vec<usize>> for SubsetIndex {
    fn from(positions: Vec<usize>) -> Self {
        SubsetIndex::Positions(positions)
    }
}

impl From<&str> for SubsetIndex {
    fn from(name: &str) -> Self {
        SubsetIndex::Variable(name.to_string())
    }
}

impl SubsetIndex {
    /// Parse a textual subset spec: `"3"`, `"1:4"`, `"0,2,5"` or a
    /// variable name. Anything else fails with `UnsupportedIndex`.
    pub fn parse(spec: &str) -> Result<SubsetIndex> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SweepVisError::UnsupportedIndex {
                message: "empty subset spec".to_string(),
            });
        }
        if let Ok(index) = spec.parse::<usize>() {
            return Ok(SubsetIndex::Position(index));
        }
        if spec.contains(':') {
            let parts: Vec<&str> = spec.split(':').collect();
            if let [start, end] = parts.as_slice() {
                if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
                    return Ok(SubsetIndex::Range(start..end));
                }
            }
            return Err(SweepVisError::UnsupportedIndex {
                message: format!("'{}' is not a <start>:<end> range", spec),
            });
        }
        if spec.contains(',') {
            let positions: std::result::Result<Vec<usize>, _> =
                spec.split(',').map(|p| p.trim().parse::<usize>()).collect();
            return match positions {
                Ok(positions) => Ok(SubsetIndex::Positions(positions)),
                Err(_) => Err(SweepVisError::UnsupportedIndex {
                    message: format!("'{}' is not a comma-separated position list", spec),
                }),
            };
        }
        Ok(SubsetIndex::Variable(spec.to_string()))
    }
}

/// Ordered collection of datasets; insertion order is plot layout order
#[derive(Debug, Clone, Default)]
pub struct SweepOutput {
    datasets: Vec<Dataset>,
}

impl SweepOutput {
    pub fn new(datasets: Vec<Dataset>) -> Self {
        Self { datasets }
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn datasets_mut(&mut self) -> &mut Vec<Dataset> {
        &mut self.datasets
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Build a collection from inputs, resolving run references through the
    /// loader and applying the optional variable filter. Inputs may be a
    /// single run id, a single dataset, or any sequence mixing both. The
    /// result is not reformatted; call [`reformat`](Self::reformat) exactly
    /// once on freshly loaded data.
    pub fn assemble<I, T>(loader: &dyn RunLoader, inputs: I, keys: Option<KeyFilter>) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<DataInput>,
    {
        let inputs: Vec<DataInput> = inputs.into_iter().map(Into::into).collect();
        let keys = match keys {
            Some(filter) => Some(filter.normalize(inputs.len())?),
            None => None,
        };

        let mut datasets = Vec::with_capacity(inputs.len());
        for (idx, input) in inputs.into_iter().enumerate() {
            let dataset = match input {
                DataInput::Run(run_id) => loader.load(run_id)?,
                DataInput::Data(dataset) => dataset,
            };

            let dataset = match &keys {
                Some(lists) => {
                    let names: Vec<&str> = lists[idx].iter().map(String::as_str).collect();
                    dataset
                        .select_vars(&names)
                        .map_err(|e| SweepVisError::SelectionFailed {
                            dataset: dataset.origin_label(),
                            source: Box::new(e),
                        })?
                }
                None => dataset,
            };
            datasets.push(dataset);
        }

        Ok(Self { datasets })
    }

    /// Relabel and rescale every coordinate and data variable from the
    /// parameter registry. A name seen for the first time gets a parameter
    /// created from the data's own `long_name`/`units` attributes and the
    /// registry is persisted. Values transform as
    /// `value <- (value - offset) * scale`, so reformatting twice
    /// double-applies any non-identity rescale.
    pub fn reformat(&mut self, registry: &mut ParameterRegistry) -> Result<()> {
        for dataset in &mut self.datasets {
            for coord in &mut dataset.coords {
                ensure_parameter(registry, &coord.name, &coord.attributes)?;
                let param = registry.lookup(&coord.name)?;
                for v in &mut coord.values {
                    *v = (*v - param.offset) * param.scale;
                }
                apply_display_attrs(&mut coord.attributes, &param.verbose_name, &param.unit);
            }
            for var in &mut dataset.data_vars {
                ensure_parameter(registry, &var.name, &var.attributes)?;
                let param = registry.lookup(&var.name)?;
                let (offset, scale) = (param.offset, param.scale);
                var.values.par_mapv_inplace(|v| (v - offset) * scale);
                apply_display_attrs(&mut var.attributes, &param.verbose_name, &param.unit);
            }
        }
        Ok(())
    }

    /// Retrieve a subset as a new collection. Integer, range and position-
    /// list subsets reuse datasets as-is; a variable-name subset keeps, for
    /// every dataset defining that variable, only that variable. None of
    /// the branches reformat: the parent collection already was.
    pub fn subset<I: Into<SubsetIndex>>(&self, index: I) -> Result<SweepOutput> {
        match index.into() {
            SubsetIndex::Position(index) => {
                if index >= self.datasets.len() {
                    return Err(SweepVisError::OutOfRange {
                        index,
                        len: self.datasets.len(),
                    });
                }
                Ok(SweepOutput::new(vec![self.datasets[index].clone()]))
            }
            SubsetIndex::Range(range) => {
                let start = range.start.min(self.datasets.len());
                let end = range.end.min(self.datasets.len());
                Ok(SweepOutput::new(self.datasets[start..end].to_vec()))
            }
            SubsetIndex::Positions(positions) => {
                let mut datasets = Vec::with_capacity(positions.len());
                for index in positions {
                    if index >= self.datasets.len() {
                        return Err(SweepVisError::OutOfRange {
                            index,
                            len: self.datasets.len(),
                        });
                    }
                    datasets.push(self.datasets[index].clone());
                }
                Ok(SweepOutput::new(datasets))
            }
            SubsetIndex::Variable(name) => {
                let mut datasets = Vec::new();
                for dataset in &self.datasets {
                    if dataset.variable(&name).is_some() {
                        datasets.push(dataset.select_vars(&[&name])?);
                    }
                }
                if datasets.is_empty() {
                    return Err(SweepVisError::VariableNotFound { var: name });
                }
                Ok(SweepOutput::new(datasets))
            }
        }
    }

    /// Parse each dataset's serialized instrument snapshot, `None` where a
    /// dataset carries none
    pub fn snapshots(&self) -> Result<Vec<Option<JsonValue>>> {
        self.datasets
            .iter()
            .map(|ds| match ds.snapshot() {
                Some(text) => serde_json::from_str(text)
                    .map(Some)
                    .map_err(|e| SweepVisError::SelectionFailed {
                        dataset: ds.origin_label(),
                        source: Box::new(SweepVisError::JsonError(e)),
                    }),
                None => Ok(None),
            })
            .collect()
    }
}

fn ensure_parameter(
    registry: &mut ParameterRegistry,
    name: &str,
    attrs: &crate::dataset::AttrMap,
) -> Result<()> {
    if registry.contains(name) {
        return Ok(());
    }
    let spec = ParameterSpec {
        verbose_name: crate::dataset::attr_str(attrs, "long_name").map(str::to_string),
        unit: crate::dataset::attr_str(attrs, "units").map(str::to_string),
        ..ParameterSpec::default()
    };
    registry.create(name, spec)?;
    registry.save()
}

fn apply_display_attrs(attrs: &mut crate::dataset::AttrMap, verbose_name: &str, unit: &str) {
    attrs.insert("long_name".to_string(), JsonValue::from(verbose_name));
    attrs.insert("unit".to_string(), JsonValue::from(unit));
    attrs.insert("units".to_string(), JsonValue::from(unit));
}
