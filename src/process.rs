use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Result, VideoError};

/// Run `cmd` to completion, killing it if it outlives `limit`.
///
/// A non-zero exit status is not an error here; callers decide what stderr means.
pub async fn output_with_timeout(
    mut cmd: Command,
    stage: &'static str,
    limit: Duration,
) -> Result<Output> {
    cmd.kill_on_drop(true);
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let child = cmd.output();
    match tokio::time::timeout(limit, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(VideoError::Api(format!(
            "Failed to run {program} (is it installed and on PATH?): {e}"
        ))),
        Err(_) => Err(VideoError::Timeout {
            stage,
            seconds: limit.as_secs(),
        }),
    }
}
