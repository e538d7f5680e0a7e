//! Entry point for the RuSweepVis application.
//! Handles CLI parsing, store loading, and dispatches assembly, processing
//! and the auto-layout plotting pipeline.

use clap::Parser;
use ru_sweep_vis::cli::Args;
use ru_sweep_vis::layout::{autoplot, plan_layout};
use ru_sweep_vis::output::{DataInput, KeyFilter, SubsetIndex, SweepOutput};
use ru_sweep_vis::parallel::ParallelConfig;
use ru_sweep_vis::parameters::ParameterRegistry;
use ru_sweep_vis::processing::Pipeline;
use ru_sweep_vis::render::TextRenderer;
use ru_sweep_vis::run_io::{NetCdfRunLoader, NetCdfRunWriter};
use ru_sweep_vis::PlotConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!(
        r#"
------------------------------------------------------------------
                        RuSweepVis
        Rust-based measurement sweep plotting tool
------------------------------------------------------------------
"#
    );

    let pool = ParallelConfig::new(args.threads);
    pool.setup_global_pool()?;
    if args.verbose {
        println!("Using {} thread(s) for element-wise processing", pool.current_threads());
    }

    let store_dir = args.store_dir.clone().unwrap_or_else(|| args.data_dir.clone());
    let mut registry = ParameterRegistry::open(&store_dir)?;
    let mut config = PlotConfig::load(&store_dir)?;

    if let Some(update) = &args.set_param {
        let fields: Vec<(&str, serde_json::Value)> = update
            .fields
            .iter()
            .map(|(field, value)| (field.as_str(), value.clone()))
            .collect();
        registry.update(&update.name, &fields)?;
        println!("✅ Updated parameter '{}'", update.name);
    }

    if let Some(update) = &args.set_config {
        config.update(&update.category, &update.key, update.value.clone())?;
        println!("✅ Updated setting {}:{}", update.category, update.key);
    }

    if args.list_params {
        println!("\n Parameters");
        println!("==============");
        if registry.is_empty() {
            println!("   (No parameters stored)");
        }
        for param in registry.list() {
            println!(
                "    {} - {} - Scale: {:.2e}, Offset: {:.2e}",
                param.name,
                param.as_label(true),
                param.scale,
                param.offset
            );
        }
    }

    if args.runs.is_empty() {
        return Ok(());
    }

    // Assemble the requested runs into one collection
    let loader = NetCdfRunLoader::new(&args.data_dir);
    let inputs: Vec<DataInput> = args.runs.iter().map(|&run| DataInput::Run(run)).collect();
    let keys = if args.keys.is_empty() {
        None
    } else {
        Some(KeyFilter::Flat(args.keys.clone()))
    };
    let mut output = SweepOutput::assemble(&loader, inputs, keys)?;
    println!("Loaded {} dataset(s) from {}", output.len(), args.data_dir.display());

    if !args.no_reformat {
        output.reformat(&mut registry)?;
    }

    if let Some(spec) = &args.subset {
        output = output.subset(SubsetIndex::parse(spec)?)?;
        println!("Subset '{}' kept {} dataset(s)", spec, output.len());
    }

    // Run the requested processing steps in order; a failing step keeps
    // the work already done and skips the rest
    if !args.process.is_empty() {
        let mut pipeline = Pipeline::new();
        for name in &args.process {
            pipeline = pipeline.named_step(name)?;
        }
        let report = pipeline.run(&mut output);
        for name in &report.completed {
            println!("✅ Ran processing step '{}'", name);
        }
        if let Some((name, error)) = &report.failed {
            println!("⚠ Error while running '{}': {}", name, error);
        }
    }

    if let Some(out_dir) = &args.output_netcdf {
        std::fs::create_dir_all(out_dir)?;
        let writer = NetCdfRunWriter::new(out_dir);
        for (idx, dataset) in output.datasets().iter().enumerate() {
            let path = writer.write(dataset, idx as i64)?;
            println!("✅ Saved result to {}", path.display());
        }
    }

    if args.plan_only {
        registry.reload()?;
        let plans = plan_layout(output.datasets(), &registry, &config)?;
        for (idx, plan) in plans.iter().enumerate() {
            println!(
                "\nFigure {}: {} row(s) x {} column(s), {:.1} x {:.1}",
                idx,
                plan.grid.n_rows(),
                plan.grid.n_cols(),
                plan.width,
                plan.height
            );
            if let Some(title) = &plan.title {
                println!("  title: {}", title);
            }
            for row in plan.grid.rows() {
                println!("  {:?}", row);
            }
            for target in &plan.targets {
                println!(
                    "  cell {}: {:?} of '{}' (dataset {})",
                    target.cell, target.kind, target.variable, target.dataset
                );
            }
        }
    } else {
        let mut renderer = TextRenderer::new();
        let plots = autoplot(&output, &mut registry, &config, &mut renderer)?;
        println!("✅ Plotted {} figure(s)", plots.figures.len());
    }

    Ok(())
}
