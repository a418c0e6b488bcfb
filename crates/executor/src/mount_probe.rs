// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mount probe (§4.3): a `docker run --rm -v host:/test:ro image true`
//! dry run, retried up to a 5s deadline, to paper over Docker-Desktop
//! gRPC-FUSE latency for directories that were only just created on the
//! host.

use crate::error::ExecutorError;
use crate::runtime_cli::ContainerRuntime;
use std::path::Path;
use std::time::{Duration, Instant};

const PROBE_DEADLINE: Duration = Duration::from_secs(5);
const PROBE_RETRY_INTERVAL: Duration = Duration::from_millis(200);

pub async fn probe_mount(runtime: ContainerRuntime, host_path: &Path, image: &str) -> Result<(), ExecutorError> {
    let mount_arg = format!("{}:/test:ro", host_path.display());
    let deadline = Instant::now() + PROBE_DEADLINE;
    let mut last_reason = String::new();

    loop {
        match runtime.run(&["run", "--rm", "-v", &mount_arg, image, "true"]).await {
            Ok(_) => return Ok(()),
            Err(e) => last_reason = e.to_string(),
        }
        if Instant::now() >= deadline {
            return Err(ExecutorError::MountProbeTimeout { host_path: host_path.display().to_string(), reason: last_reason });
        }
        tokio::time::sleep(PROBE_RETRY_INTERVAL).await;
    }
}
