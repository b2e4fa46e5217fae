mod app;

use tracing::{error, info};

fn main() {
    app::init_tracing();
    info!("=== crossref host startup ===");

    let config = match app::HostConfig::from_env_and_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(2);
        }
    };

    match app::run(&config) {
        Ok(report) if report.checks_failed == 0 => {
            info!(
                checks_passed = report.checks_passed,
                steps = report.steps.len(),
                "scenario_passed"
            );
        }
        Ok(report) => {
            error!(
                checks_passed = report.checks_passed,
                checks_failed = report.checks_failed,
                "scenario_failed"
            );
            std::process::exit(1);
        }
        Err(err) => {
            error!(error = %err, "scenario_aborted");
            std::process::exit(2);
        }
    }
}
