//! vc-pattern
//!
//! Captures one random-pattern frame from `vc.ril.source` and shows it on a
//! DispmanX overlay for a second. Built without the `videocore` feature it
//! runs the same sequence against the simulated source and compositor.
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! cargo run --release --features videocore   # on a Raspberry Pi
//! ```

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vc_pattern::{CaptureSequence, DemoConfig, DemoError, RunReport};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("vc-pattern {}", vc_pattern::VERSION);

    match run(DemoConfig::default()) {
        Ok(report) => {
            tracing::info!(
                "Done: buffer {} ({} of {} bytes), {} completions ignored",
                report.frame.index,
                report.frame.length,
                report.frame.alloc_size,
                report.ignored_completions
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "videocore")]
fn run(config: DemoConfig) -> Result<RunReport, DemoError> {
    use vc_pattern::dispmanx::{BcmHost, VcDispmanx};
    use vc_pattern::mmal::VcFactory;

    CaptureSequence::new(BcmHost, VcFactory::new(), VcDispmanx, config).run()
}

#[cfg(not(feature = "videocore"))]
fn run(config: DemoConfig) -> Result<RunReport, DemoError> {
    use vc_pattern::dispmanx::sim::SimDispmanx;
    use vc_pattern::dispmanx::SimHost;
    use vc_pattern::mmal::sim::SimFactory;

    let host = SimHost::new();
    let display = SimDispmanx::default().with_host(host.clone());
    CaptureSequence::new(host, SimFactory::with_default(), display, config).run()
}
