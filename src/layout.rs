//! Auto-layout decision engine
//!
//! Decides, from the number of datasets, the number of variables per
//! dataset and the dimensionality of each variable, how many figures to
//! make, the grid shape of each, and which plot primitive each grid cell
//! gets. The decision is captured as [`LayoutPlan`] values which are then
//! executed against a [`Renderer`]; planning itself draws nothing.
//!
//! The branching rules:
//!
//! 1. one dataset, any number of variables: a single figure with an axis
//!    per variable (or, for a 3-dimensional sole variable, an axis per cut
//!    along the first swept coordinate);
//! 2. several datasets where at least one has several variables: recurse
//!    per dataset, one figure each;
//! 3. several datasets with one variable each: a single figure with an
//!    axis per dataset.

use crate::config::PlotConfig;
use crate::dataset::{DataVariable, Dataset};
use crate::errors::{Result, SweepVisError};
use crate::output::SweepOutput;
use crate::parameters::ParameterRegistry;
use crate::render::{AxisId, FigureId, Renderer};
use ndarray::{Array1, Array2, Ix1, Ix2};

/// Plot primitive chosen for one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Line,
    Mesh,
}

/// Grid of 1-based cell ids in row-major order; 0 marks an unused slot in
/// a ragged last row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridShape {
    rows: Vec<Vec<usize>>,
}

impl GridShape {
    /// Lay out `n` cells with at most `max_cols` columns. Full rows come
    /// first; a remainder becomes a ragged row padded with 0-markers; fewer
    /// cells than columns yield a single row of exactly `n` cells.
    pub fn compute(n: usize, max_cols: usize) -> GridShape {
        if n == 0 {
            return GridShape { rows: Vec::new() };
        }
        let max_cols = max_cols.max(1);
        let full_rows = n / max_cols;
        let last_row = n - full_rows * max_cols;

        let mut rows: Vec<Vec<usize>> = Vec::new();
        for row in 0..full_rows {
            rows.push((0..max_cols).map(|i| i + 1 + max_cols * row).collect());
        }
        if last_row != 0 {
            rows.push(
                (0..max_cols)
                    .map(|i| {
                        if i < last_row {
                            i + 1 + max_cols * full_rows
                        } else {
                            0
                        }
                    })
                    .collect(),
            );
        }
        if full_rows == 0 {
            rows = vec![(0..n).map(|i| i + 1).collect()];
        }
        GridShape { rows }
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Number of active (non-zero) cells
    pub fn cell_count(&self) -> usize {
        self.rows.iter().flatten().filter(|&&c| c > 0).count()
    }
}

/// A nearest-neighbor cut backing one grid cell in the 3-D case
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateCut {
    pub coord: String,
    pub value: f64,
}

/// One grid cell's worth of drawing: the source dataset-variable pair, the
/// inferred primitive and the registry-derived labels
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    /// 0-based position in the figure's axis order
    pub cell: usize,
    /// Index of the source dataset within the collection
    pub dataset: usize,
    pub variable: String,
    pub kind: PlotKind,
    pub cut: Option<CoordinateCut>,
    pub x_label: String,
    pub y_label: String,
    pub colorbar_label: Option<String>,
    pub title: Option<String>,
}

/// Ephemeral per-figure output of the engine; not persisted
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub grid: GridShape,
    pub width: f64,
    pub height: f64,
    pub title: Option<String>,
    pub targets: Vec<RenderTarget>,
}

/// Figures and per-figure axis handles produced by plan execution, in plan
/// order (fan-out concatenates)
#[derive(Debug, Clone)]
pub struct PlotOutput {
    pub figures: Vec<FigureId>,
    pub axes: Vec<Vec<AxisId>>,
}

/// Decide the layout for a collection of datasets, one plan per figure
pub fn plan_layout(
    datasets: &[Dataset],
    registry: &ParameterRegistry,
    config: &PlotConfig,
) -> Result<Vec<LayoutPlan>> {
    let indexed: Vec<(usize, &Dataset)> = datasets.iter().enumerate().collect();
    plan_indexed(&indexed, registry, config)
}

/// Reload the registry, plan, and execute the plans against a renderer
pub fn autoplot<R: Renderer>(
    output: &SweepOutput,
    registry: &mut ParameterRegistry,
    config: &PlotConfig,
    renderer: &mut R,
) -> Result<PlotOutput> {
    // pick up the latest persisted labels before deciding anything
    registry.reload()?;
    let plans = plan_layout(output.datasets(), registry, config)?;
    execute_plans(&plans, output, config, renderer)
}

fn plan_indexed(
    datasets: &[(usize, &Dataset)],
    registry: &ParameterRegistry,
    config: &PlotConfig,
) -> Result<Vec<LayoutPlan>> {
    if datasets.is_empty() {
        return Ok(Vec::new());
    }

    let n_datasets = datasets.len();
    let multi_var = datasets.iter().any(|(_, ds)| ds.data_vars.len() > 1);

    // Several datasets where at least one has several variables:
    // one figure per dataset, decided recursively
    if n_datasets > 1 && multi_var {
        let mut plans = Vec::new();
        for &(idx, ds) in datasets {
            plans.extend(plan_indexed(&[(idx, ds)], registry, config)?);
        }
        return Ok(plans);
    }

    // Several datasets with one variable each: one grid, an axis per dataset
    if n_datasets > 1 {
        for (_, ds) in datasets {
            if let Some(var) = ds.data_vars.first() {
                let ndims = ds.non_degenerate_coords(var).len();
                if ndims > 2 {
                    return Err(SweepVisError::Dimensionality {
                        message: format!(
                            "the requested number of datasets and dimensions \
                             ({} datasets, {}-dimensional variable '{}')",
                            n_datasets, ndims, var.name
                        ),
                    });
                }
            }
        }

        let grid = GridShape::compute(n_datasets, config.max_cols());
        let mut targets = Vec::with_capacity(n_datasets);
        let mut run_ids = Vec::new();
        for (cell, &(idx, ds)) in datasets.iter().enumerate() {
            let var = first_variable(ds)?;
            targets.push(infer_target(cell, idx, ds, var, registry)?);
            if let Some(id) = ds.run_id() {
                run_ids.push(id.to_string());
            }
        }
        let title = config.set_title().then(|| {
            if run_ids.is_empty() {
                "Datasets".to_string()
            } else {
                format!("Datasets {}", run_ids.join(","))
            }
        });
        return Ok(vec![finish_plan(grid, title, targets, config)]);
    }

    // A single dataset
    let (idx, ds) = datasets[0];
    if ds.data_vars.is_empty() {
        return Ok(vec![finish_plan(
            GridShape::compute(0, config.max_cols()),
            None,
            Vec::new(),
            config,
        )]);
    }

    let first_var = first_variable(ds)?;
    let ndims = ds.non_degenerate_coords(first_var).len();
    if ndims > 3 {
        return Err(SweepVisError::Dimensionality {
            message: format!(
                "data with more than 3 coordinates (variable '{}' has {})",
                first_var.name, ndims
            ),
        });
    }
    if ndims > 2 && ds.data_vars.len() > 1 {
        return Err(SweepVisError::Dimensionality {
            message: "a multidimensional dataset with multiple variables; \
                      select a single variable to output"
                .to_string(),
        });
    }

    if ndims < 3 {
        // One axis per variable
        let grid = GridShape::compute(ds.data_vars.len(), config.max_cols());
        let title = config
            .set_title()
            .then(|| ds.run_id().map(|id| format!("Dataset {}", id)))
            .flatten();
        let targets = ds
            .data_vars
            .iter()
            .enumerate()
            .map(|(cell, var)| infer_target(cell, idx, ds, var, registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(vec![finish_plan(grid, title, targets, config)])
    } else {
        // 3-dimensional sole variable: one axis per cut along the first
        // swept coordinate, each cell a nearest-neighbor selection
        let cut_coord = ds.non_degenerate_coords(first_var)[0];
        let cut_name = cut_coord.name.clone();
        let cut_values = cut_coord.values.clone();
        let coord_label = registry.as_label(&cut_name, true)?;

        let grid = GridShape::compute(cut_values.len(), config.max_cols());
        let mut targets = Vec::with_capacity(cut_values.len());
        for (cell, &value) in cut_values.iter().enumerate() {
            let cut_ds = ds.sel_nearest(&cut_name, value)?;
            let var = first_variable(&cut_ds)?;
            let mut target = infer_target(cell, idx, &cut_ds, var, registry)?;
            target.cut = Some(CoordinateCut {
                coord: cut_name.clone(),
                value,
            });
            target.title = Some(format!("{} = {}", coord_label, value));
            targets.push(target);
        }
        Ok(vec![finish_plan(grid, None, targets, config)])
    }
}

/// Execute previously decided plans against a renderer, producing parallel
/// figure and axis-handle lists
pub fn execute_plans<R: Renderer>(
    plans: &[LayoutPlan],
    output: &SweepOutput,
    config: &PlotConfig,
    renderer: &mut R,
) -> Result<PlotOutput> {
    let mut result = PlotOutput {
        figures: Vec::with_capacity(plans.len()),
        axes: Vec::with_capacity(plans.len()),
    };

    for plan in plans {
        let (figure, axes) = renderer.create_grid(&plan.grid, plan.width, plan.height)?;
        if let Some(title) = &plan.title {
            renderer.set_figure_title(figure, title)?;
        }

        for target in &plan.targets {
            let axis = axes[target.cell];
            renderer.set_minor_ticks(axis, config.minorticks())?;

            let dataset = &output.datasets()[target.dataset];
            let cut_storage;
            let dataset = match &target.cut {
                Some(cut) => {
                    cut_storage = dataset.sel_nearest(&cut.coord, cut.value)?;
                    &cut_storage
                }
                None => dataset,
            };
            let var = dataset.variable(&target.variable).ok_or_else(|| {
                SweepVisError::VariableNotFound {
                    var: target.variable.clone(),
                }
            })?;

            match target.kind {
                PlotKind::Line => {
                    let (x, y) = line_data(dataset, var)?;
                    renderer.draw_line(axis, &x, &y, &config.style("line"))?;
                }
                PlotKind::Mesh => {
                    let (x, y, values) = mesh_data(dataset, var)?;
                    let image = renderer.draw_mesh(axis, &x, &y, values.view(), &config.style("mesh"))?;
                    if config.add_colorbars() {
                        if let Some(label) = &target.colorbar_label {
                            renderer.attach_colorbar(axis, image, label, &config.style("colorbar"))?;
                        }
                    }
                }
            }

            renderer.set_axis_labels(axis, &target.x_label, &target.y_label)?;
            if let Some(title) = &target.title {
                renderer.set_axis_title(axis, title)?;
            }
        }

        result.figures.push(figure);
        result.axes.push(axes);
    }

    Ok(result)
}

/// Choose the plot primitive for one dataset-variable pair from its
/// non-degenerate coordinate count: 2 is a mesh, 1 is a line, anything
/// else cannot be auto-plotted
fn infer_target(
    cell: usize,
    dataset: usize,
    ds: &Dataset,
    var: &DataVariable,
    registry: &ParameterRegistry,
) -> Result<RenderTarget> {
    let nd = ds.non_degenerate_coords(var);
    match nd.len() {
        2 => Ok(RenderTarget {
            cell,
            dataset,
            variable: var.name.clone(),
            kind: PlotKind::Mesh,
            cut: None,
            // data rows follow the first swept coordinate, columns the second
            x_label: registry.as_label(&nd[1].name, true)?,
            y_label: registry.as_label(&nd[0].name, true)?,
            colorbar_label: Some(registry.as_label(&var.name, true)?),
            title: None,
        }),
        1 => Ok(RenderTarget {
            cell,
            dataset,
            variable: var.name.clone(),
            kind: PlotKind::Line,
            cut: None,
            x_label: registry.as_label(&nd[0].name, true)?,
            y_label: registry.as_label(&var.name, true)?,
            colorbar_label: None,
            title: None,
        }),
        n => Err(SweepVisError::Dimensionality {
            message: format!(
                "variable '{}' has {} non-degenerate coordinate(s); expected 1 or 2",
                var.name, n
            ),
        }),
    }
}

fn first_variable(ds: &Dataset) -> Result<&DataVariable> {
    ds.data_vars
        .first()
        .ok_or_else(|| SweepVisError::Generic("dataset has no data variables".to_string()))
}

fn finish_plan(
    grid: GridShape,
    title: Option<String>,
    targets: Vec<RenderTarget>,
    config: &PlotConfig,
) -> LayoutPlan {
    let width = grid.n_cols() as f64 * config.col_width();
    let height = grid.n_rows() as f64 * config.row_height();
    LayoutPlan {
        grid,
        width,
        height,
        title,
        targets,
    }
}

fn line_data(ds: &Dataset, var: &DataVariable) -> Result<(Vec<f64>, Vec<f64>)> {
    let nd = ds.non_degenerate_coords(var);
    if nd.len() != 1 {
        return Err(SweepVisError::Dimensionality {
            message: format!(
                "variable '{}' is not 1-dimensional after squeezing",
                var.name
            ),
        });
    }
    let y: Array1<f64> = var.squeezed().into_dimensionality::<Ix1>()?;
    Ok((nd[0].values.clone(), y.to_vec()))
}

fn mesh_data(ds: &Dataset, var: &DataVariable) -> Result<(Vec<f64>, Vec<f64>, Array2<f64>)> {
    let nd = ds.non_degenerate_coords(var);
    if nd.len() != 2 {
        return Err(SweepVisError::Dimensionality {
            message: format!(
                "variable '{}' is not 2-dimensional after squeezing",
                var.name
            ),
        });
    }
    let values: Array2<f64> = var.squeezed().into_dimensionality::<Ix2>()?;
    Ok((nd[1].values.clone(), nd[0].values.clone(), values))
}
