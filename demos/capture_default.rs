use std::time::Instant;
use tracing::error;

use tracing_log_assert::init::{init_capture_with_config, CaptureConfig};
use tracing_log_assert::{Level, MatchSpec};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let capture = init_capture_with_config(
        CaptureConfig::default()
            .with_level(Level::WARN)
            .with_assert_empty(),
    );

    let n: u64 = 10_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "capture load test error");
    }

    let elapsed = start.elapsed();
    println!("captured {} events in {:?} (~{:.0} ev/s)",
        capture.len(),
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    capture.assert_precise(
        &MatchSpec::new("capture load test error")
            .level(Level::ERROR)
            .attr("iteration", 0),
    );
    let rest = capture.assert_some_message("capture load test error");
    println!("asserted {} remaining events", rest);
}
