//! Background consumer of an execution's event stream

use crate::client::SandboxClient;
use crate::error::{Result, SandboxError};
use crate::execution::{Execution, ExecutionState, LogStream};
use crate::sse::{SseEvent, SseParser};
use futures::StreamExt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Event types the service may send to mark the end of an execution
const END_EVENTS: [&str; 3] = ["end", "exit", "done"];

/// Start the listener task for `execution` and hand it the task handle
///
/// Fails only when there is no tokio runtime to spawn on.
pub(crate) fn spawn(execution: &Execution) -> Result<()> {
    let runtime = Handle::try_current()
        .map_err(|e| SandboxError::Stream(format!("no async runtime available: {e}")))?;

    let task = runtime.spawn(listen(
        execution.client().clone(),
        execution.sandbox_id().to_string(),
        execution.id().to_string(),
        execution.state(),
    ));
    execution.attach_listener(task);
    Ok(())
}

async fn listen(
    client: SandboxClient,
    sandbox_id: String,
    execution_id: String,
    state: Arc<ExecutionState>,
) {
    info!(%execution_id, "Listening for events...");
    tokio::time::sleep(client.config().listener_delay).await;

    match stream_events(&client, &sandbox_id, &execution_id, &state).await {
        Ok(()) => {
            debug!(%execution_id, "Event stream finished");
            state.complete();
        }
        Err(e) => {
            warn!(%execution_id, "Event listener failed: {e}");
            state.fail(e.to_string());
        }
    }
}

async fn stream_events(
    client: &SandboxClient,
    sandbox_id: &str,
    execution_id: &str,
    state: &ExecutionState,
) -> Result<()> {
    let response = client.open_event_stream(sandbox_id, execution_id).await?;
    state.mark_streaming();

    let mut bytes = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = bytes.next().await {
        for event in parser.feed(&chunk?)? {
            if !handle_event(state, event).await {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Apply one event; returns `false` once the execution has ended
async fn handle_event(state: &ExecutionState, event: SseEvent) -> bool {
    match event.event.as_str() {
        "stdout" => {
            debug!("stdout: {}", event.data);
            state.append(LogStream::Stdout, event.data).await;
        }
        "stderr" => {
            debug!("stderr: {}", event.data);
            state.append(LogStream::Stderr, event.data).await;
        }
        kind if END_EVENTS.contains(&kind) => {
            debug!(event = kind, "End of execution signalled");
            return false;
        }
        other => debug!(event = other, "Ignoring event"),
    }
    true
}
