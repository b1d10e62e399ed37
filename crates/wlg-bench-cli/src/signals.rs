//! SIGINT/SIGTERM handling for `wlg run`.
//!
//! Generators run in their own process groups, so a terminal Ctrl-C never
//! reaches them. Instead the signal cancels the run: the orchestrator kills
//! every job, joins its workers and returns a record marked cancelled.

use std::io;

use wlg_bench_runner::CancelToken;

/// Cancels `token` on SIGINT or SIGTERM for as long as it is alive.
#[cfg(unix)]
pub struct InterruptGuard {
    handle: signal_hook::iterator::Handle,
    watcher: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl InterruptGuard {
    pub fn install(token: CancelToken) -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let watcher = std::thread::Builder::new()
            .name("signal-watcher".into())
            .spawn(move || {
                for signal in signals.forever() {
                    tracing::warn!(signal, "interrupt received; stopping every job");
                    token.cancel();
                }
            })?;
        Ok(Self {
            handle,
            watcher: Some(watcher),
        })
    }
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                tracing::warn!("signal watcher panicked");
            }
        }
    }
}

#[cfg(not(unix))]
pub struct InterruptGuard;

#[cfg(not(unix))]
impl InterruptGuard {
    pub fn install(_token: CancelToken) -> io::Result<Self> {
        Ok(Self)
    }
}
