//! Interrupt (Ctrl-C / SIGINT) hookup.
//!
//! Once installed, an interrupt no longer kills the process outright. It sets
//! the [`CancelToken`]; children in the same process group still receive the
//! signal, so the blocking call in flight returns and the orchestrator stops at
//! that boundary.

use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cancel::CancelToken;

/// Install the interrupt handler on a background thread.
pub fn install(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;

    #[cfg(unix)]
    let mut interrupt = {
        use tokio::signal::unix::{SignalKind, signal};
        let _guard = runtime.enter();
        signal(SignalKind::interrupt()).context("register SIGINT handler")?
    };

    thread::Builder::new()
        .name("polecat-signal".to_string())
        .spawn(move || {
            #[cfg(unix)]
            let received = runtime.block_on(interrupt.recv()).is_some();
            #[cfg(not(unix))]
            let received = runtime.block_on(tokio::signal::ctrl_c()).is_ok();

            if received {
                warn!("interrupt received, stopping at next step boundary");
                token.cancel();
            } else {
                debug!("signal stream closed");
            }
        })
        .context("spawn signal thread")?;
    Ok(())
}
