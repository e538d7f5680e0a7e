//! Defines command-line interface options using `clap` for the RuSweepVis application.

use clap::Parser;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// A CLI tool for post-processing and auto-plotting measurement sweep runs
#[derive(Parser, Debug)]
#[command(
    version = "0.4.0",
    name = "RuSweepVis",
    about = "App for post-processing and auto-plotting measurement sweep datasets"
)]
pub struct Args {
    /// Directory holding run_<id>.nc measurement files
    #[arg(short, long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory holding the parameter and plot-config stores. Defaults to the data directory.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Run ids to load, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub runs: Vec<i64>,

    /// Variable names to keep, comma separated (broadcast to every run)
    #[arg(short, long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Subset applied after assembly: an index, <start>:<end>, a position list, or a variable name
    #[arg(long)]
    pub subset: Option<String>,

    /// Skip the relabel/rescale reformat step
    #[arg(long, default_value_t = false)]
    pub no_reformat: bool,

    /// Processing steps to run in order, e.g. transpose,normalize
    #[arg(short, long, value_delimiter = ',')]
    pub process: Vec<String>,

    /// List all stored parameters
    #[arg(long)]
    pub list_params: bool,

    /// Update a parameter, formatted as <name>:<field>=<value>[,<field>=<value>...]
    #[arg(long, value_parser = parse_param_update)]
    pub set_param: Option<ParamUpdate>,

    /// Update a plot configuration setting, formatted as <category>:<key>=<value>
    #[arg(long, value_parser = parse_config_update)]
    pub set_config: Option<ConfigUpdate>,

    /// Print the auto-layout plan instead of rendering
    #[arg(long, default_value_t = false)]
    pub plan_only: bool,

    /// Directory to save processed datasets to as run_<id>.nc files
    #[arg(long)]
    pub output_netcdf: Option<PathBuf>,

    /// Number of threads for element-wise processing. Defaults to the global pool.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Parsed `--set-param` specification
#[derive(Debug, Clone)]
pub struct ParamUpdate {
    pub name: String,
    pub fields: Vec<(String, JsonValue)>,
}

/// Parsed `--set-config` specification
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub category: String,
    pub key: String,
    pub value: JsonValue,
}

fn parse_field_value(raw: &str) -> JsonValue {
    if let Ok(integer) = raw.parse::<i64>() {
        return JsonValue::from(integer);
    }
    if let Ok(number) = raw.parse::<f64>() {
        if let Some(value) = serde_json::Number::from_f64(number) {
            return JsonValue::Number(value);
        }
    }
    match raw {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(raw.to_string()),
    }
}

fn parse_param_update(s: &str) -> Result<ParamUpdate, String> {
    let (name, rest) = s
        .split_once(':')
        .ok_or_else(|| "Invalid format: Expected '<name>:<field>=<value>[,...]'".to_string())?;
    if name.is_empty() {
        return Err("Parameter name must not be empty".to_string());
    }

    let mut fields = Vec::new();
    for assignment in rest.split(',') {
        let (field, value) = assignment.split_once('=').ok_or_else(|| {
            format!("Invalid assignment '{}': Expected '<field>=<value>'", assignment)
        })?;
        fields.push((field.trim().to_string(), parse_field_value(value.trim())));
    }
    if fields.is_empty() {
        return Err("At least one <field>=<value> assignment is required".to_string());
    }

    Ok(ParamUpdate {
        name: name.to_string(),
        fields,
    })
}

fn parse_config_update(s: &str) -> Result<ConfigUpdate, String> {
    let (category, rest) = s
        .split_once(':')
        .ok_or_else(|| "Invalid format: Expected '<category>:<key>=<value>'".to_string())?;
    let (key, value) = rest
        .split_once('=')
        .ok_or_else(|| "Invalid format: Expected '<category>:<key>=<value>'".to_string())?;
    if category.is_empty() || key.is_empty() {
        return Err("Category and key must not be empty".to_string());
    }

    Ok(ConfigUpdate {
        category: category.to_string(),
        key: key.trim().to_string(),
        value: parse_field_value(value.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_update_parses_fields() {
        let update = parse_param_update("gate_voltage:verbose_name=Gate voltage,scale=1000").unwrap();
        assert_eq!(update.name, "gate_voltage");
        assert_eq!(update.fields.len(), 2);
        assert_eq!(update.fields[0].0, "verbose_name");
        assert_eq!(update.fields[0].1, JsonValue::String("Gate voltage".to_string()));
        assert_eq!(update.fields[1].1, serde_json::json!(1000));
    }

    #[test]
    fn param_update_rejects_bare_name() {
        assert!(parse_param_update("gate_voltage").is_err());
        assert!(parse_param_update("gate_voltage:scale").is_err());
    }

    #[test]
    fn config_update_parses_value_types() {
        let update = parse_config_update("figs:max_cols=4").unwrap();
        assert_eq!(update.category, "figs");
        assert_eq!(update.key, "max_cols");
        assert_eq!(update.value, serde_json::json!(4));

        let update = parse_config_update("mesh:cmap=viridis").unwrap();
        assert_eq!(update.value, JsonValue::String("viridis".to_string()));

        let update = parse_config_update("figs:add_colorbars=false").unwrap();
        assert_eq!(update.value, JsonValue::Bool(false));
    }
}
