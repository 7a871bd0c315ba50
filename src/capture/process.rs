use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::capture::command::Invocation;
use crate::capture::{CapturePlan, Recorder};
use crate::error::RecordingError;
use crate::sync::do_sync;

/// Runs the capture process piped into the transcode process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRecorder;

impl Recorder for ProcessRecorder {
    #[instrument(skip_all, fields(output = %plan.temp_path.display(), duration = plan.duration))]
    fn record(&self, plan: &CapturePlan, cancel: &CancellationToken) -> Result<(), RecordingError> {
        do_sync(run_pipeline(plan, cancel)).map_err(|e| RecordingError::Spawn {
            program: "async runtime".to_string(),
            source: e,
        })?
    }
}

async fn run_pipeline(plan: &CapturePlan, cancel: &CancellationToken) -> Result<(), RecordingError> {
    let mut capture = spawn(&plan.capture, Stdio::null(), Stdio::piped())?;

    let capture_out: Stdio = match capture.stdout.take() {
        Some(stdout) => stdout.try_into().map_err(RecordingError::Pipe)?,
        None => {
            return Err(RecordingError::Pipe(std::io::Error::other(
                "capture stdout was not piped",
            )))
        }
    };
    let mut transcode = spawn(&plan.transcode, capture_out, Stdio::null())?;

    debug!(
        capture = ?capture.id(),
        transcode = ?transcode.id(),
        "pipeline started"
    );

    let finished = tokio::select! {
        _ = cancel.cancelled() => None,
        statuses = async { tokio::join!(capture.wait(), transcode.wait()) } => Some(statuses),
    };

    let (capture_status, transcode_status) = match finished {
        Some(statuses) => statuses,
        None => {
            stop(&mut capture, &plan.capture.program).await;
            stop(&mut transcode, &plan.transcode.program).await;
            return Err(RecordingError::Cancelled);
        }
    };

    let capture_status = wait_result(capture_status, &plan.capture.program)?;
    let transcode_status = wait_result(transcode_status, &plan.transcode.program)?;

    if !capture_status.success() {
        // rtmpdump reports a live download cut by --stop as incomplete.
        warn!(status = %capture_status, "capture exited unsuccessfully");
    }
    if !transcode_status.success() {
        return Err(RecordingError::Exited {
            program: plan.transcode.program.clone(),
            status: transcode_status,
        });
    }

    info!("pipeline finished");
    Ok(())
}

fn spawn(invocation: &Invocation, stdin: Stdio, stdout: Stdio) -> Result<Child, RecordingError> {
    Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(stdin)
        .stdout(stdout)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RecordingError::Spawn {
            program: invocation.program.clone(),
            source,
        })
}

fn wait_result(
    result: std::io::Result<ExitStatus>,
    program: &str,
) -> Result<ExitStatus, RecordingError> {
    result.map_err(|source| RecordingError::Wait {
        program: program.to_string(),
        source,
    })
}

async fn stop(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, program, "failed to stop child process");
    }
}
