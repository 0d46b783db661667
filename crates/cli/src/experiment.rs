//! `mblock run` / `mblock validate` — config-driven meta-blocking experiments.

use std::path::{Path, PathBuf};

use metablock_cli::{load_inputs, run_experiment, ConfigError, ExperimentConfig, ExperimentReport};

use crate::exit_codes::{
    run_exit_code, EXIT_CONFIG_INVALID, EXIT_CONFIG_PARSE, EXIT_CONFIG_READ, EXIT_INPUT_READ,
    EXIT_RUN_OUTPUT,
};
use crate::CliError;

fn experiment_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_config(config_path: &Path) -> Result<ExperimentConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        experiment_err(EXIT_CONFIG_READ, format!("cannot read {}: {e}", config_path.display()))
    })?;
    ExperimentConfig::from_toml(&config_str).map_err(|e| match e {
        ConfigError::Parse(_) => experiment_err(EXIT_CONFIG_PARSE, e.to_string()),
        ConfigError::Validation(_) => experiment_err(EXIT_CONFIG_INVALID, e.to_string()),
    })
}

fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

pub fn cmd_run(config_path: PathBuf, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    let inputs = load_inputs(&config, base_dir(&config_path)).map_err(|e| {
        let code = run_exit_code(&e);
        let err = experiment_err(code, e.to_string());
        if code == EXIT_INPUT_READ {
            err.with_hint("file paths in the config resolve relative to the config file")
        } else {
            err
        }
    })?;
    let report = run_experiment(&config, &inputs)
        .map_err(|e| experiment_err(run_exit_code(&e), e.to_string()))?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| experiment_err(EXIT_RUN_OUTPUT, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| experiment_err(EXIT_RUN_OUTPUT, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let combos = config.meta.combinations().len();
    eprintln!(
        "{}: ok ({} blocking method(s), {} combination(s), {} round(s))",
        config.name,
        config.blocking.methods.len(),
        combos,
        config.meta.rounds,
    );
    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ExperimentReport) {
    let inputs = &report.inputs;
    eprintln!(
        "{}: {} x {} records, {} gold pairs",
        report.meta.name, inputs.left.records, inputs.right.records, inputs.gold_pairs,
    );
    for method in &report.methods {
        eprintln!(
            "  {:<22} {:>8} blocks  PC {:>6.2}%  RR {:>6.2}%",
            method.method.to_string(),
            method.blocks.blocks,
            method.blocks.pair_completeness,
            method.blocks.reduction_ratio,
        );
        for combo in &method.combinations {
            if let Some(ev) = combo.final_evaluation() {
                eprintln!(
                    "    {:<14} {:>8} pairs  PC {:>6.2}%  RR {:>6.2}%  {:>6} ms",
                    format!("{}/{}", combo.weighting, combo.pruning),
                    ev.retained_pairs,
                    ev.pair_completeness,
                    ev.reduction_ratio,
                    combo.elapsed_ms,
                );
            }
        }
    }
}
