use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lazy_static::lazy_static;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use signal_hook::SigId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sync::spawn;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

lazy_static! {
    /// While no guard is alive, SIGINT behaves as if no handler were installed.
    static ref DEFAULT_ACTION: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::default());
}

#[derive(Default)]
struct Registry {
    active: usize,
    fallback: Option<SigId>,
}

impl Registry {
    fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
        if self.active == 0 {
            DEFAULT_ACTION.store(true, Ordering::SeqCst);
        }
    }
}

struct Interrupt {
    interrupted: Arc<AtomicBool>,
    announced: AtomicBool,
    token: CancellationToken,
}

impl Interrupt {
    fn settle(&self) -> bool {
        if !self.interrupted.load(Ordering::SeqCst) {
            return false;
        }
        if !self.announced.swap(true, Ordering::SeqCst) {
            println!("Recording interrupted by user");
            self.token.cancel();
        }
        true
    }
}

/// Turns Ctrl-C into a cancelled token for as long as the guard lives.
///
/// Dropping the guard unregisters its handler. Once no guard is alive a
/// Ctrl-C terminates the process as usual.
pub struct InterruptGuard {
    state: Arc<Interrupt>,
    hook: Option<SigId>,
    watcher: Option<JoinHandle<()>>,
}

impl InterruptGuard {
    pub fn install(token: CancellationToken) -> Self {
        let state = Arc::new(Interrupt {
            interrupted: Arc::new(AtomicBool::new(false)),
            announced: AtomicBool::new(false),
            token,
        });

        let hook = match arm(&state.interrupted) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "interrupt handling unavailable");
                None
            }
        };

        // Cancels the token while a recording is being awaited on the runtime.
        let watched = Arc::clone(&state);
        let watcher = spawn(async move {
            loop {
                if watched.settle() {
                    break;
                }
                tokio::select! {
                    _ = watched.token.cancelled() => break,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
        });
        let watcher = match watcher {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "interrupt watcher unavailable");
                None
            }
        };

        Self {
            state,
            hook,
            watcher,
        }
    }

    /// Whether Ctrl-C arrived since the guard was installed. The first positive
    /// answer prints the notice and cancels the token.
    pub fn settle(&self) -> bool {
        self.state.settle()
    }
}

fn arm(interrupted: &Arc<AtomicBool>) -> io::Result<SigId> {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);

    if registry.fallback.is_none() {
        registry.fallback = Some(flag::register_conditional_default(
            SIGINT,
            Arc::clone(&DEFAULT_ACTION),
        )?);
    }

    registry.active += 1;
    DEFAULT_ACTION.store(false, Ordering::SeqCst);

    match flag::register(SIGINT, Arc::clone(interrupted)) {
        Ok(id) => Ok(id),
        Err(e) => {
            registry.release();
            Err(e)
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        if let Some(id) = self.hook.take() {
            signal_hook::low_level::unregister(id);
            REGISTRY
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release();
            debug!("interrupt handler removed");
        }
    }
}

/// Tests that raise SIGINT or install guards run one at a time.
#[cfg(test)]
pub(crate) fn exclusive() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
