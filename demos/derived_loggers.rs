use std::time::Duration;

use tracing_log_assert::{AssertHandler, Attr, HandlerOptions, Level, MatchSpec, Matcher};

#[tokio::main]
async fn main() {
    let handler = AssertHandler::new(HandlerOptions::default().with_level(Level::INFO));
    let log = handler.logger().with([Attr::new("service", "billing")]);

    let mut tasks = Vec::new();
    for worker in 0..4u64 {
        let log = log.with_group("worker").with([Attr::new("id", worker)]);
        tasks.push(tokio::spawn(async move {
            log.info(
                "job finished",
                [
                    Attr::group("job", [Attr::new("attempts", 1), Attr::new("ok", true)]),
                    Attr::new("elapsed", Duration::from_millis(20 * worker)),
                ],
            );
        }));
    }
    for task in tasks {
        if let Err(e) = task.await {
            eprintln!("worker failed: {}", e);
        }
    }

    for event in handler.unasserted() {
        print!("{}", event);
    }

    let slow = handler.assert_some_precise(
        &MatchSpec::new("job finished")
            .level(Level::INFO)
            .attr("service", "billing")
            .attr("worker.job.ok", true)
            .attr("worker.elapsed", Matcher::duration(|d| d >= Duration::from_millis(40))),
    );
    let rest = handler.assert_some_message("job finished");
    println!("{} slow jobs, {} fast jobs", slow, rest);
}
