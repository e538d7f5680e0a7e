//! Tests for the auto-layout decision engine
//!
//! Covers the grid-shape helper, the three layout branches, plot-kind
//! inference and plan execution against a recording renderer.

use ndarray::{ArrayD, ArrayView2};
use ru_sweep_vis::{
    dataset::{Coordinate, DataVariable, Dataset},
    errors::{Result, SweepVisError},
    layout::{autoplot, execute_plans, plan_layout, GridShape, PlotKind},
    output::SweepOutput,
    parameters::ParameterRegistry,
    render::{AxisId, FigureId, ImageId, LineId, Renderer},
    store::JsonMap,
    PlotConfig,
};
use tempfile::tempdir;

fn dataset_1d(run_id: Option<i64>, var_names: &[&str], n: usize) -> Dataset {
    let mut ds = Dataset::new();
    ds.coords
        .push(Coordinate::new("bias", (0..n).map(|i| i as f64).collect()));
    for &name in var_names {
        let values =
            ArrayD::from_shape_vec(vec![n], (0..n).map(|i| i as f64).collect()).unwrap();
        ds.data_vars
            .push(DataVariable::new(name, vec!["bias".to_string()], values));
    }
    if let Some(id) = run_id {
        ds.set_run_id(id);
    }
    ds
}

fn dataset_2d(run_id: Option<i64>, var_name: &str, rows: usize, cols: usize) -> Dataset {
    let mut ds = Dataset::new();
    ds.coords
        .push(Coordinate::new("field", (0..rows).map(|i| i as f64).collect()));
    ds.coords
        .push(Coordinate::new("bias", (0..cols).map(|i| i as f64).collect()));
    let values = ArrayD::from_shape_vec(
        vec![rows, cols],
        (0..rows * cols).map(|i| i as f64).collect(),
    )
    .unwrap();
    ds.data_vars.push(DataVariable::new(
        var_name,
        vec!["field".to_string(), "bias".to_string()],
        values,
    ));
    if let Some(id) = run_id {
        ds.set_run_id(id);
    }
    ds
}

fn dataset_3d(run_id: Option<i64>, var_name: &str, shape: (usize, usize, usize)) -> Dataset {
    let (l, m, n) = shape;
    let mut ds = Dataset::new();
    ds.coords
        .push(Coordinate::new("gate", (0..l).map(|i| i as f64).collect()));
    ds.coords
        .push(Coordinate::new("field", (0..m).map(|i| i as f64).collect()));
    ds.coords
        .push(Coordinate::new("bias", (0..n).map(|i| i as f64).collect()));
    let values =
        ArrayD::from_shape_vec(vec![l, m, n], (0..l * m * n).map(|i| i as f64).collect()).unwrap();
    ds.data_vars.push(DataVariable::new(
        var_name,
        vec![
            "gate".to_string(),
            "field".to_string(),
            "bias".to_string(),
        ],
        values,
    ));
    if let Some(id) = run_id {
        ds.set_run_id(id);
    }
    ds
}

/// Registry and config in a fresh store directory, with the collection
/// reformatted so every name has a parameter
fn prepared(
    datasets: Vec<Dataset>,
) -> (SweepOutput, ParameterRegistry, PlotConfig, tempfile::TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut registry = ParameterRegistry::open(temp_dir.path()).unwrap();
    let config = PlotConfig::load(temp_dir.path()).unwrap();
    let mut output = SweepOutput::new(datasets);
    output.reformat(&mut registry).unwrap();
    (output, registry, config, temp_dir)
}

/// Renderer that records every drawing call for assertions
#[derive(Default)]
struct RecordingRenderer {
    grids: Vec<(usize, usize)>,
    lines: Vec<usize>,
    meshes: Vec<(usize, usize)>,
    colorbars: Vec<String>,
    figure_titles: Vec<String>,
    axis_titles: Vec<String>,
    axis_labels: Vec<(String, String)>,
    next_axis: usize,
}

impl Renderer for RecordingRenderer {
    fn create_grid(
        &mut self,
        shape: &GridShape,
        _width: f64,
        _height: f64,
    ) -> Result<(FigureId, Vec<AxisId>)> {
        self.grids.push((shape.n_rows(), shape.n_cols()));
        let figure = FigureId(self.grids.len() - 1);
        let mut axes = Vec::new();
        for _ in 0..shape.cell_count() {
            axes.push(AxisId(self.next_axis));
            self.next_axis += 1;
        }
        Ok((figure, axes))
    }

    fn draw_line(
        &mut self,
        _axis: AxisId,
        x: &[f64],
        y: &[f64],
        _style: &JsonMap,
    ) -> Result<LineId> {
        assert_eq!(x.len(), y.len());
        self.lines.push(x.len());
        Ok(LineId(self.lines.len() - 1))
    }

    fn draw_mesh(
        &mut self,
        _axis: AxisId,
        x: &[f64],
        y: &[f64],
        values: ArrayView2<'_, f64>,
        _style: &JsonMap,
    ) -> Result<ImageId> {
        assert_eq!(values.shape(), &[y.len(), x.len()]);
        self.meshes.push((y.len(), x.len()));
        Ok(ImageId(self.meshes.len() - 1))
    }

    fn attach_colorbar(
        &mut self,
        _axis: AxisId,
        _image: ImageId,
        label: &str,
        _style: &JsonMap,
    ) -> Result<()> {
        self.colorbars.push(label.to_string());
        Ok(())
    }

    fn set_axis_labels(&mut self, _axis: AxisId, x_label: &str, y_label: &str) -> Result<()> {
        self.axis_labels
            .push((x_label.to_string(), y_label.to_string()));
        Ok(())
    }

    fn set_axis_title(&mut self, _axis: AxisId, title: &str) -> Result<()> {
        self.axis_titles.push(title.to_string());
        Ok(())
    }

    fn set_figure_title(&mut self, _figure: FigureId, title: &str) -> Result<()> {
        self.figure_titles.push(title.to_string());
        Ok(())
    }

    fn set_minor_ticks(&mut self, _axis: AxisId, _subdivisions: u32) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_grid_shape_full_and_ragged_rows() {
    // 7 cells in up to 3 columns: 2 full rows plus a ragged row of 1
    let grid = GridShape::compute(7, 3);
    assert_eq!(
        grid.rows(),
        &[vec![1, 2, 3], vec![4, 5, 6], vec![7, 0, 0]]
    );
    assert_eq!(grid.n_rows(), 3);
    assert_eq!(grid.n_cols(), 3);
    assert_eq!(grid.cell_count(), 7);

    // Fewer cells than columns: one row of exactly N
    let grid = GridShape::compute(2, 3);
    assert_eq!(grid.rows(), &[vec![1, 2]]);
    assert_eq!(grid.cell_count(), 2);

    // Exact multiple: full rows only
    let grid = GridShape::compute(6, 3);
    assert_eq!(grid.rows(), &[vec![1, 2, 3], vec![4, 5, 6]]);

    // Degenerate cases
    assert_eq!(GridShape::compute(0, 3).rows().len(), 0);
    assert_eq!(GridShape::compute(1, 3).rows(), &[vec![1]]);
}

#[test]
fn test_branch_fan_out_multiple_multivar_datasets() -> Result<()> {
    let (output, registry, config, _dir) = prepared(vec![
        dataset_1d(Some(1), &["a", "b"], 4),
        dataset_1d(Some(2), &["c", "d"], 4),
    ]);

    // Two datasets with two variables each: exactly two plans, in order
    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].targets.len(), 2);
    assert_eq!(plans[1].targets.len(), 2);
    assert!(plans[0].targets.iter().all(|t| t.dataset == 0));
    assert!(plans[1].targets.iter().all(|t| t.dataset == 1));
    assert_eq!(plans[0].title.as_deref(), Some("Dataset 1"));
    assert_eq!(plans[1].title.as_deref(), Some("Dataset 2"));

    // Execution yields one figure per plan, order preserved
    let mut renderer = RecordingRenderer::default();
    let plots = execute_plans(&plans, &output, &config, &mut renderer)?;
    assert_eq!(plots.figures.len(), 2);
    assert_eq!(plots.axes[0].len(), 2);
    assert_eq!(renderer.lines.len(), 4);
    assert_eq!(
        renderer.figure_titles,
        vec!["Dataset 1".to_string(), "Dataset 2".to_string()]
    );

    Ok(())
}

#[test]
fn test_branch_multiplex_single_var_datasets() -> Result<()> {
    let (output, registry, config, _dir) = prepared(vec![
        dataset_1d(Some(11), &["a"], 4),
        dataset_1d(Some(12), &["a"], 4),
        dataset_1d(Some(13), &["a"], 4),
    ]);

    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(plan.grid.rows(), &[vec![1, 2, 3]]);
    assert_eq!(plan.title.as_deref(), Some("Datasets 11,12,13"));
    assert_eq!(plan.targets.len(), 3);
    for (cell, target) in plan.targets.iter().enumerate() {
        assert_eq!(target.cell, cell);
        assert_eq!(target.dataset, cell);
        assert_eq!(target.kind, PlotKind::Line);
    }

    Ok(())
}

#[test]
fn test_branch_multiplex_rejects_high_dimensional_member() {
    let (output, registry, config, _dir) = prepared(vec![
        dataset_1d(Some(1), &["a"], 4),
        dataset_1d(Some(2), &["a"], 4),
        dataset_3d(Some(3), "a", (3, 4, 5)),
    ]);

    match plan_layout(output.datasets(), &registry, &config) {
        Err(SweepVisError::Dimensionality { .. }) => {}
        other => panic!("Expected Dimensionality error, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn test_branch_single_dataset_axis_per_variable() -> Result<()> {
    let (output, registry, config, _dir) =
        prepared(vec![dataset_1d(Some(21), &["a", "b", "c", "d"], 5)]);

    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    // 4 cells in up to 3 columns
    assert_eq!(plan.grid.rows(), &[vec![1, 2, 3], vec![4, 0, 0]]);
    assert_eq!(plan.targets.len(), 4);
    assert_eq!(plan.title.as_deref(), Some("Dataset 21"));
    assert_eq!(plan.targets[3].variable, "d");

    let mut renderer = RecordingRenderer::default();
    execute_plans(&plans, &output, &config, &mut renderer)?;
    assert_eq!(renderer.lines, vec![5, 5, 5, 5]);

    Ok(())
}

#[test]
fn test_mesh_inference_labels_and_colorbar() -> Result<()> {
    let (output, mut registry, config, _dir) = prepared(vec![dataset_2d(Some(5), "cond", 3, 4)]);

    let plans = plan_layout(output.datasets(), &registry, &config)?;
    let target = &plans[0].targets[0];
    assert_eq!(target.kind, PlotKind::Mesh);
    // x follows the second swept coordinate, y the first
    assert_eq!(target.x_label, "bias (-)");
    assert_eq!(target.y_label, "field (-)");
    assert_eq!(target.colorbar_label.as_deref(), Some("cond (-)"));

    let mut renderer = RecordingRenderer::default();
    execute_plans(&plans, &output, &config, &mut renderer)?;
    assert_eq!(renderer.meshes, vec![(3, 4)]);
    assert_eq!(renderer.colorbars, vec!["cond (-)".to_string()]);
    assert_eq!(
        renderer.axis_labels,
        vec![("bias (-)".to_string(), "field (-)".to_string())]
    );

    // autoplot picks up labels persisted since the registry was loaded
    registry.update("cond", &[("verbose_name", serde_json::json!("Conductance"))])?;
    let mut renderer = RecordingRenderer::default();
    autoplot(&output, &mut registry, &config, &mut renderer)?;
    assert_eq!(renderer.colorbars, vec!["Conductance (-)".to_string()]);

    Ok(())
}

#[test]
fn test_degenerate_axes_are_squeezed_out() -> Result<()> {
    // 3 coordinates but only 2 span more than one sample: still a mesh
    let mut ds = dataset_3d(Some(6), "cond", (1, 3, 4));
    ds.set_run_id(6);
    let (output, registry, config, _dir) = prepared(vec![ds]);

    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans[0].targets[0].kind, PlotKind::Mesh);
    assert_eq!(plans[0].targets[0].y_label, "field (-)");

    let mut renderer = RecordingRenderer::default();
    execute_plans(&plans, &output, &config, &mut renderer)?;
    assert_eq!(renderer.meshes, vec![(3, 4)]);

    Ok(())
}

#[test]
fn test_branch_single_dataset_three_dimensional_cuts() -> Result<()> {
    let (output, registry, config, _dir) = prepared(vec![dataset_3d(Some(31), "cond", (3, 4, 5))]);

    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    // One cell per value of the first swept coordinate
    assert_eq!(plan.targets.len(), 3);
    assert_eq!(plan.grid.rows(), &[vec![1, 2, 3]]);
    for (cell, target) in plan.targets.iter().enumerate() {
        assert_eq!(target.kind, PlotKind::Mesh);
        let cut = target.cut.as_ref().expect("3-D cells carry a cut");
        assert_eq!(cut.coord, "gate");
        assert_eq!(cut.value, cell as f64);
        assert_eq!(
            target.title.as_deref(),
            Some(format!("gate (-) = {}", cell).as_str())
        );
    }

    let mut renderer = RecordingRenderer::default();
    execute_plans(&plans, &output, &config, &mut renderer)?;
    assert_eq!(renderer.meshes, vec![(4, 5), (4, 5), (4, 5)]);
    assert_eq!(renderer.axis_titles.len(), 3);

    Ok(())
}

#[test]
fn test_dimensionality_guards() {
    // More than 3 swept coordinates cannot be auto-plotted
    let mut ds = dataset_3d(Some(1), "cond", (2, 3, 4));
    ds.coords
        .push(Coordinate::new("extra", vec![0.0, 1.0]));
    let var = ds.variable_mut("cond").unwrap();
    var.dims.insert(0, "extra".to_string());
    var.values = ArrayD::from_shape_vec(
        vec![2, 2, 3, 4],
        (0..48).map(|i| i as f64).collect(),
    )
    .unwrap();
    let (output, registry, config, _dir) = prepared(vec![ds]);
    assert!(matches!(
        plan_layout(output.datasets(), &registry, &config),
        Err(SweepVisError::Dimensionality { .. })
    ));

    // A 3-dimensional dataset with several variables must be narrowed first
    let mut ds = dataset_3d(Some(2), "cond", (2, 3, 4));
    let second = DataVariable::new(
        "other",
        ds.data_vars[0].dims.clone(),
        ds.data_vars[0].values.clone(),
    );
    ds.data_vars.push(second);
    let (output, registry, config, _dir) = prepared(vec![ds]);
    assert!(matches!(
        plan_layout(output.datasets(), &registry, &config),
        Err(SweepVisError::Dimensionality { .. })
    ));

    // A variable with no swept coordinate at all is an explicit error,
    // not a silently empty cell
    let mut ds = dataset_1d(Some(3), &["a"], 1);
    ds.coord_mut("bias").unwrap().values = vec![0.0];
    let (output, registry, config, _dir) = prepared(vec![ds]);
    assert!(matches!(
        plan_layout(output.datasets(), &registry, &config),
        Err(SweepVisError::Dimensionality { .. })
    ));
}

#[test]
fn test_title_configuration() -> Result<()> {
    let (output, registry, mut config, _dir) = prepared(vec![
        dataset_1d(Some(1), &["a"], 3),
        dataset_1d(None, &["a"], 3),
    ]);

    // Datasets without a run id are skipped in the composite title
    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans[0].title.as_deref(), Some("Datasets 1"));

    // Titles can be disabled entirely
    config.update("figs", "set_title", serde_json::json!(false))?;
    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(plans[0].title, None);

    Ok(())
}

#[test]
fn test_larger_max_cols_config() -> Result<()> {
    let (output, registry, mut config, _dir) = prepared(vec![dataset_1d(
        Some(1),
        &["a", "b", "c", "d", "e"],
        3,
    )]);

    config.update("figs", "max_cols", serde_json::json!(2))?;
    let plans = plan_layout(output.datasets(), &registry, &config)?;
    assert_eq!(
        plans[0].grid.rows(),
        &[vec![1, 2], vec![3, 4], vec![5, 0]]
    );
    // Physical size scales with the grid
    assert_eq!(plans[0].width, 2.0 * config.col_width());
    assert_eq!(plans[0].height, 3.0 * config.row_height());

    Ok(())
}
