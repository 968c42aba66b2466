//! Replay a recorded execution stream from a `.jsonl` file.
//!
//! Reads the file in small fixed-size chunks so lines are split the way a
//! network transport would split them, prints each event as it is reduced,
//! and dumps the final snapshot.
//!
//! ```bash
//! cargo run --example replay_jsonl -- crates/vigil-examples/demo/execution.jsonl 17
//! ```

use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_core::config::StreamConfig;
use vigil_core::event::ExecutionEvent;
use vigil_core::execution::Execution;
use vigil_stream::dispatch::ExecutionHooks;
use vigil_stream::tracker::{ExecutionTracker, StreamOutcome};

struct Printer;

impl ExecutionHooks for Printer {
    fn on_event(&mut self, event: &ExecutionEvent, execution: Option<&Execution>) {
        let status = execution.map(|e| e.status.to_string()).unwrap_or_default();
        match event.node_id() {
            Some(node) => println!("{:<26} {:<8} node={node}", event.op(), status),
            None => println!("{:<26} {:<8}", event.op(), status),
        }
    }

    fn on_finish(&mut self, execution: &Execution) {
        println!("\n=== Finished: {} ({}) ===", execution.id, execution.status);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_stream=info,replay_jsonl=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "crates/vigil-examples/demo/execution.jsonl".into());
    let chunk_size: usize = match args.next() {
        Some(raw) => raw.parse()?,
        None => 64,
    };

    let config = StreamConfig::new().with_tag("replay");
    let mut tracker = ExecutionTracker::new(config);
    let mut hooks = Printer;

    let mut file = tokio::fs::File::open(&path).await?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        tracker.push(&buf[..n], &mut hooks)?;
    }

    match tracker.finish(&mut hooks)? {
        StreamOutcome::Finished(execution) => {
            info!(
                path = %path,
                id = %execution.id,
                status = %execution.status,
                events = tracker.events_applied(),
                "Replay finished"
            );
            println!("{}", serde_json::to_string_pretty(&execution)?);
        }
        StreamOutcome::Incomplete(execution) => {
            warn!(path = %path, events = tracker.events_applied(), "Replay ended early");
            println!("Stream ended before the execution finished.");
            if let Some(execution) = execution {
                println!("{}", serde_json::to_string_pretty(&execution)?);
            }
        }
    }
    Ok(())
}
