//! Processing functions applied to a collection between loading and
//! plotting
//!
//! Every function here mutates the collection in place, replacing dataset
//! contents by index, and is meant to run after the reformat step. The
//! [`Pipeline`] runs named steps in order with a partial-result policy: a
//! failing step is reported with its name and aborts the remainder, while
//! the collection keeps everything the completed steps already did.

use crate::dataset::{DataVariable, Dataset};
use crate::errors::{Result, SweepVisError};
use crate::output::SweepOutput;
use ndarray::Axis;

/// Reverse the axis order of every data variable in every dataset
pub fn transpose(output: &mut SweepOutput) -> Result<()> {
    for dataset in output.datasets_mut() {
        dataset.transpose();
    }
    Ok(())
}

/// Rescale every data variable to the unit interval. The default maps the
/// minimum to 0 and the maximum to 1; the inverse flips the data about its
/// maximum first, for quantities where a dip is the feature of interest.
pub fn normalize(output: &mut SweepOutput, inverse: bool) -> Result<()> {
    for dataset in output.datasets_mut() {
        for var in &mut dataset.data_vars {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in var.values.iter() {
                if v.is_finite() {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
            if !min.is_finite() || !max.is_finite() {
                continue;
            }
            let range = max - min;
            let scale = if range > 0.0 { 1.0 / range } else { 1.0 };
            if inverse {
                var.values.par_mapv_inplace(|v| (max - v) * scale);
            } else {
                var.values.par_mapv_inplace(|v| (v - min) * scale);
            }
        }
    }
    Ok(())
}

/// How [`select`] picks values along a coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectSpec {
    Nearest(f64),
    Exact(f64),
    Range(f64, f64),
}

/// Take a cut (or range) along a coordinate across the whole collection,
/// reducing dimensionality
pub fn select(output: &mut SweepOutput, coord: &str, spec: SelectSpec) -> Result<()> {
    for dataset in output.datasets_mut() {
        *dataset = match spec {
            SelectSpec::Nearest(value) => dataset.sel_nearest(coord, value)?,
            SelectSpec::Exact(value) => dataset.sel_exact(coord, value)?,
            SelectSpec::Range(lo, hi) => dataset.sel_range(coord, lo, hi)?,
        };
    }
    Ok(())
}

/// Named axis adjustments; the registered table consulted by
/// [`AxisAdjustment::from_name`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisAdjustment {
    /// Shift so the axis midpoint (mean of first and last value) is zero
    Centre,
    /// Subtract a fixed amount
    Shift { by: f64 },
    /// Multiply, then shift
    Scale { multiply_by: f64, shift_by: f64 },
}

impl AxisAdjustment {
    /// Resolve an adjustment by registered name: `centre`, `shift`,
    /// `scale` (alias `multiply`)
    pub fn from_name(name: &str, amount: Option<f64>) -> Result<Self> {
        match name {
            "centre" => Ok(AxisAdjustment::Centre),
            "shift" => Ok(AxisAdjustment::Shift {
                by: amount.unwrap_or(0.0),
            }),
            "scale" | "multiply" => Ok(AxisAdjustment::Scale {
                multiply_by: amount.unwrap_or(1.0),
                shift_by: 0.0,
            }),
            other => Err(SweepVisError::Generic(format!(
                "No adjustment function named '{}'; supported: centre, shift, scale",
                other
            ))),
        }
    }

    pub fn apply(&self, values: &mut [f64]) {
        match *self {
            AxisAdjustment::Centre => {
                if let (Some(&first), Some(&last)) = (values.first(), values.last()) {
                    let mid = (first + last) / 2.0;
                    for v in values.iter_mut() {
                        *v -= mid;
                    }
                }
            }
            AxisAdjustment::Shift { by } => {
                for v in values.iter_mut() {
                    *v -= by;
                }
            }
            AxisAdjustment::Scale {
                multiply_by,
                shift_by,
            } => {
                for v in values.iter_mut() {
                    *v = *v * multiply_by + shift_by;
                }
            }
        }
    }
}

/// Which axes an adjustment applies to. An index counts from the innermost
/// axis, i.e. position 0 is the last coordinate of each dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisTarget {
    All,
    Index(usize),
    Name(String),
}

/// Map one or more coordinate axes of every dataset to new values
pub fn adjust_axis(
    output: &mut SweepOutput,
    adjustment: AxisAdjustment,
    target: &AxisTarget,
) -> Result<()> {
    for dataset in output.datasets_mut() {
        let names: Vec<String> = match target {
            AxisTarget::All => dataset.coords.iter().map(|c| c.name.clone()).collect(),
            AxisTarget::Index(index) => {
                let reversed: Vec<String> = dataset
                    .coords
                    .iter()
                    .rev()
                    .map(|c| c.name.clone())
                    .collect();
                match reversed.get(*index) {
                    Some(name) => vec![name.clone()],
                    None => {
                        return Err(SweepVisError::OutOfRange {
                            index: *index,
                            len: reversed.len(),
                        })
                    }
                }
            }
            AxisTarget::Name(name) => {
                if dataset.coord(name).is_none() {
                    return Err(SweepVisError::CoordinateNotFound {
                        coord: name.clone(),
                    });
                }
                vec![name.clone()]
            }
        };
        for name in names {
            if let Some(coord) = dataset.coord_mut(&name) {
                adjustment.apply(&mut coord.values);
            }
        }
    }
    Ok(())
}

/// Subtract an offset from one coordinate of a dataset, keeping attributes
pub fn adjust_coordinate_offset(dataset: &mut Dataset, coord: &str, offset: f64) -> Result<()> {
    let coord = dataset
        .coord_mut(coord)
        .ok_or_else(|| SweepVisError::CoordinateNotFound {
            coord: coord.to_string(),
        })?;
    for v in &mut coord.values {
        *v -= offset;
    }
    Ok(())
}

/// Subtract an offset from one data variable of a dataset
pub fn adjust_data_offset(dataset: &mut Dataset, var: &str, offset: f64) -> Result<()> {
    let var = dataset
        .variable_mut(var)
        .ok_or_else(|| SweepVisError::VariableNotFound {
            var: var.to_string(),
        })?;
    var.values.par_mapv_inplace(|v| v - offset);
    Ok(())
}

/// Multiply every data variable across the collection by a factor
pub fn multiply(output: &mut SweepOutput, factor: f64) -> Result<()> {
    for dataset in output.datasets_mut() {
        for var in &mut dataset.data_vars {
            var.values.par_mapv_inplace(|v| v * factor);
        }
    }
    Ok(())
}

/// Combine each dataset's first two variables into their elementwise
/// product (`root` takes the square root, for correlating symmetric
/// measurement pairs), replacing both sources
pub fn correlated_product(output: &mut SweepOutput, root: bool) -> Result<()> {
    for dataset in output.datasets_mut() {
        if dataset.data_vars.len() < 2 {
            return Err(SweepVisError::Generic(
                "correlated product needs at least two data variables".to_string(),
            ));
        }
        let a = &dataset.data_vars[0];
        let b = &dataset.data_vars[1];
        if a.dims != b.dims {
            return Err(SweepVisError::ShapeMismatch {
                message: format!(
                    "variables '{}' and '{}' span different coordinates",
                    a.name, b.name
                ),
            });
        }
        let mut values = &a.values * &b.values;
        if root {
            values.par_mapv_inplace(f64::sqrt);
        }
        let product = DataVariable {
            name: format!("{}_correlated", a.name),
            dims: a.dims.clone(),
            values,
            attributes: a.attributes.clone(),
        };
        dataset.data_vars.drain(0..2);
        dataset.data_vars.insert(0, product);
    }
    Ok(())
}

/// Average each dataset's first variable over its outermost coordinate and
/// append the result as a new `average_*` variable
pub fn average_outer(output: &mut SweepOutput) -> Result<()> {
    for dataset in output.datasets_mut() {
        let var = match dataset.data_vars.first() {
            Some(var) => var,
            None => continue,
        };
        if var.dims.is_empty() {
            continue;
        }
        let averaged =
            var.values
                .mean_axis(Axis(0))
                .ok_or_else(|| SweepVisError::Dimensionality {
                    message: format!("variable '{}' has an empty outer axis", var.name),
                })?;
        let new_var = DataVariable {
            name: format!("average_{}", var.name),
            dims: var.dims[1..].to_vec(),
            values: averaged,
            attributes: var.attributes.clone(),
        };
        dataset.data_vars.push(new_var);
    }
    Ok(())
}

/// One named step of a processing pipeline
pub struct PipelineStep {
    pub name: String,
    func: Box<dyn Fn(&mut SweepOutput) -> Result<()>>,
}

/// Ordered processing steps with the partial-result failure policy
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

/// What a pipeline run did: the steps that completed, and the failing
/// step's name and error if one aborted the remainder
#[derive(Debug)]
pub struct PipelineReport {
    pub completed: Vec<String>,
    pub failed: Option<(String, SweepVisError)>,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(
        mut self,
        name: impl Into<String>,
        func: impl Fn(&mut SweepOutput) -> Result<()> + 'static,
    ) -> Self {
        self.steps.push(PipelineStep {
            name: name.into(),
            func: Box::new(func),
        });
        self
    }

    /// Add a step by registered name; unknown names fail immediately
    pub fn named_step(self, name: &str) -> Result<Self> {
        let func = builtin_step(name).ok_or_else(|| {
            SweepVisError::Generic(format!("No processing function named '{}'", name))
        })?;
        Ok(Self {
            steps: {
                let mut steps = self.steps;
                steps.push(PipelineStep {
                    name: name.to_string(),
                    func,
                });
                steps
            },
        })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the steps in order. The collection keeps the work of every step
    /// completed before a failure.
    pub fn run(&self, output: &mut SweepOutput) -> PipelineReport {
        let mut completed = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match (step.func)(output) {
                Ok(()) => completed.push(step.name.clone()),
                Err(e) => {
                    return PipelineReport {
                        completed,
                        failed: Some((step.name.clone(), e)),
                    }
                }
            }
        }
        PipelineReport {
            completed,
            failed: None,
        }
    }
}

/// Registered table of argument-free processing functions, consulted by
/// name from the CLI
pub fn builtin_step(name: &str) -> Option<Box<dyn Fn(&mut SweepOutput) -> Result<()>>> {
    match name {
        "transpose" => Some(Box::new(transpose)),
        "normalize" => Some(Box::new(|out| normalize(out, false))),
        "normalize_inverse" => Some(Box::new(|out| normalize(out, true))),
        "average_outer" => Some(Box::new(average_outer)),
        "correlated_product" => Some(Box::new(|out| correlated_product(out, false))),
        "correlated_product_root" => Some(Box::new(|out| correlated_product(out, true))),
        _ => None,
    }
}
