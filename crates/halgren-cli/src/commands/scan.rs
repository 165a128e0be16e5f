use super::{load_inputs, write_report};
use crate::cli::ScanArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use halgren::engine::progress::ProgressReporter;
use halgren::workflows::lambda_scan::{self, LambdaScanResult};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ScanReport {
    free_energy: f64,
    points: Vec<PointReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct PointReport {
    lambda: f64,
    energy: f64,
    dedl: f64,
    d2edl2: f64,
}

impl From<&LambdaScanResult> for ScanReport {
    fn from(result: &LambdaScanResult) -> Self {
        Self {
            free_energy: result.free_energy,
            points: result
                .points
                .iter()
                .map(|p| PointReport {
                    lambda: p.lambda,
                    energy: p.energy,
                    dedl: p.dedl,
                    d2edl2: p.d2edl2,
                })
                .collect(),
        }
    }
}

pub fn run(args: ScanArgs, threads: Option<usize>) -> Result<()> {
    let config = config::resolve(args.inputs.config.as_deref(), &args.inputs.set_values, threads)?;
    let (loaded, forcefield) = load_inputs(&args.inputs)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!(windows = args.windows, "Invoking the lambda scan workflow...");
    let result = lambda_scan::run(
        &loaded.system,
        &forcefield,
        &loaded.crystal,
        &config,
        args.windows,
        &reporter,
    )?;

    println!("{:>8}  {:>16}  {:>16}", "lambda", "E (kcal/mol)", "dE/dl");
    for point in &result.points {
        println!("{:>8.4}  {:>16.8}  {:>16.8}", point.lambda, point.energy, point.dedl);
    }
    println!("Integrated dE/dl: {:.8} kcal/mol", result.free_energy);

    if let Some(path) = &args.inputs.output {
        write_report(path, &ScanReport::from(&result))?;
    }
    Ok(())
}
