use std::sync::atomic::{AtomicBool, Ordering};

use mediabot_core::control::ProcessControl;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Quit and restart both cancel the root token; `main` finishes shutdown and
/// then starts the replacement process if one was asked for.
pub struct DaemonControl {
    shutdown: CancellationToken,
    restart: AtomicBool,
}

impl DaemonControl {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            restart: AtomicBool::new(false),
        }
    }

    pub fn restart_requested(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }
}

impl ProcessControl for DaemonControl {
    fn quit(&self) {
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    fn restart(&self) {
        info!("Restart requested");
        self.restart.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
    }
}

/// Start a fresh copy of this executable with the same arguments.
pub fn respawn() -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    let child = std::process::Command::new(&exe)
        .args(std::env::args_os().skip(1))
        .spawn()?;
    info!("Started {:?} as pid {}", exe, child.id());
    Ok(())
}
