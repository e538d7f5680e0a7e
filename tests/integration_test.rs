//! End-to-end test: write a run file, load it through the run loader,
//! reformat it and plan its layout.

use ndarray::ArrayD;
use ru_sweep_vis::dataset::{Coordinate, DataVariable, Dataset};
use ru_sweep_vis::layout::{plan_layout, PlotKind};
use ru_sweep_vis::output::{DataInput, KeyFilter, SweepOutput};
use ru_sweep_vis::parameters::ParameterRegistry;
use ru_sweep_vis::run_io::{write_dataset, NetCdfRunLoader, RunLoader};
use ru_sweep_vis::{PlotConfig, SweepVisError};
use serde_json::json;
use tempfile::tempdir;

/// A 2-D conductance map the way a measurement run would store it
fn sweep_dataset() -> Dataset {
    let mut ds = Dataset::new();

    let mut field = Coordinate::new("field", vec![-1.0, 0.0, 1.0]);
    field
        .attributes
        .insert("long_name".to_string(), json!("Magnetic field"));
    field.attributes.insert("units".to_string(), json!("T"));
    ds.coords.push(field);

    let mut bias = Coordinate::new("bias", vec![0.0, 0.5, 1.0, 1.5]);
    bias.attributes
        .insert("long_name".to_string(), json!("Bias voltage"));
    bias.attributes.insert("units".to_string(), json!("V"));
    ds.coords.push(bias);

    let values =
        ArrayD::from_shape_vec(vec![3, 4], (0..12).map(|i| i as f64 * 0.25).collect()).unwrap();
    let mut cond = DataVariable::new(
        "conductance",
        vec!["field".to_string(), "bias".to_string()],
        values,
    );
    cond.attributes
        .insert("long_name".to_string(), json!("Conductance"));
    cond.attributes.insert("units".to_string(), json!("e2/h"));
    ds.data_vars.push(cond);

    ds.set_run_id(7);
    ds.attributes.insert(
        "snapshot".to_string(),
        json!(r#"{"instruments": {"magnet": {"ramp_rate": 0.1}}}"#),
    );
    ds
}

#[test]
fn test_run_file_roundtrip_and_layout() {
    let data_dir = tempdir().expect("Failed to create temp dir");
    let store_dir = tempdir().expect("Failed to create temp dir");

    // Write the run file the loader is expected to find
    let original = sweep_dataset();
    let path = data_dir.path().join("run_7.nc");
    write_dataset(&original, &path).expect("Failed to write run file");
    assert!(path.exists());

    // Load it back through the loader
    let loader = NetCdfRunLoader::new(data_dir.path());
    let loaded = loader.load(7).expect("Failed to load run 7");

    assert_eq!(loaded.run_id(), Some(7));
    let mut coord_names = loaded.coord_names();
    coord_names.sort_unstable();
    assert_eq!(coord_names, vec!["bias", "field"]);
    let field = loaded.coord("field").expect("field coordinate");
    assert_eq!(field.values, vec![-1.0, 0.0, 1.0]);
    assert_eq!(field.attributes.get("units"), Some(&json!("T")));

    let cond = loaded.variable("conductance").expect("conductance variable");
    assert_eq!(cond.dims, vec!["field".to_string(), "bias".to_string()]);
    assert_eq!(cond.values.shape(), &[3, 4]);
    assert_eq!(cond.values[[1, 2]], 6.0 * 0.25);
    assert_eq!(cond.attributes.get("long_name"), Some(&json!("Conductance")));

    // The writer stamps a history attribute
    assert!(loaded
        .attributes
        .get("history")
        .and_then(|v| v.as_str())
        .map(|s| s.contains("RuSweepVis"))
        .unwrap_or(false));

    // An unknown run id fails up front
    match loader.load(404) {
        Err(SweepVisError::RunNotFound { run }) => assert_eq!(run, 404),
        _ => panic!("Expected RunNotFound error"),
    }

    // Assemble, reformat and plan: one mesh with labels from the run's
    // own metadata
    let mut registry = ParameterRegistry::open(store_dir.path()).expect("open registry");
    let config = PlotConfig::load(store_dir.path()).expect("load config");
    let mut output = SweepOutput::assemble(
        &loader,
        vec![DataInput::Run(7)],
        Some(KeyFilter::One("conductance".to_string())),
    )
    .expect("assemble run 7");
    output.reformat(&mut registry).expect("reformat");

    // Parameters were created from long_name/units and persisted
    assert_eq!(
        registry.as_label("conductance", true).unwrap(),
        "Conductance (e2/h)"
    );
    assert_eq!(registry.as_label("bias", true).unwrap(), "Bias voltage (V)");

    let plans = plan_layout(output.datasets(), &registry, &config).expect("plan layout");
    assert_eq!(plans.len(), 1);
    let target = &plans[0].targets[0];
    assert_eq!(target.kind, PlotKind::Mesh);
    assert_eq!(target.x_label, "Bias voltage (V)");
    assert_eq!(target.y_label, "Magnetic field (T)");
    assert_eq!(
        target.colorbar_label.as_deref(),
        Some("Conductance (e2/h)")
    );
    assert_eq!(plans[0].title.as_deref(), Some("Dataset 7"));

    // The instrument snapshot survives the NetCDF round trip
    let snapshots = output.snapshots().expect("snapshots");
    let snapshot = snapshots[0].as_ref().expect("snapshot present");
    assert_eq!(snapshot["instruments"]["magnet"]["ramp_rate"], json!(0.1));
}
