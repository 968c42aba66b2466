//! Start an agent execution over HTTP and follow its event stream.
//!
//! `VIGIL_EXECUTE_URL` is the full execute endpoint of the agent; the
//! optional `VIGIL_API_KEY` is sent as a bearer token.
//!
//! ```bash
//! VIGIL_EXECUTE_URL=https://host/api/<account>/agent/<id>/execute \
//! VIGIL_API_KEY=... cargo run --example follow_http -- "Summarize Rust in one line"
//! ```

use std::collections::HashMap;

use futures::StreamExt;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_core::config::StreamConfig;
use vigil_core::request::ExecuteRequest;
use vigil_stream::transport::response_updates;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_stream=info,follow_http=info".into()),
        )
        .init();

    let url = std::env::var("VIGIL_EXECUTE_URL")
        .map_err(|_| "VIGIL_EXECUTE_URL environment variable is required")?;
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello from Vigil".into());

    let request = ExecuteRequest::streaming(HashMap::new()).with_input("prompt", json!(prompt));
    let mut builder = reqwest::Client::new().post(&url).json(&request);
    if let Ok(key) = std::env::var("VIGIL_API_KEY") {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    let response = builder.send().await?;
    info!(url = %url, status = %response.status(), "Execution started");

    let updates = response_updates(response, StreamConfig::new()).await?;
    futures::pin_mut!(updates);
    while let Some(update) = updates.next().await {
        let update = update?;
        println!("{:<26} {}", update.event.op(), update.execution.status);
        if update.finished {
            info!(
                id = %update.execution.id,
                status = %update.execution.status,
                "Execution finished"
            );
            println!("{}", serde_json::to_string_pretty(&update.execution.outputs)?);
        }
    }
    Ok(())
}
