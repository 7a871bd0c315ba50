use std::future::Future;
use std::io;

use lazy_static::lazy_static;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

lazy_static! {
    static ref RUNTIME: io::Result<Runtime> = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
}

fn runtime() -> io::Result<&'static Runtime> {
    RUNTIME
        .as_ref()
        .map_err(|e| io::Error::new(e.kind(), e.to_string()))
}

/// Perform an async operation in a blocking fashion on the current thread.
/// Use this method to call async-only code (HTTP, child processes, signals) from
/// the sequential rip pipeline.
pub(crate) fn do_sync<T, F: Future<Output = T>>(fut: F) -> io::Result<T> {
    Ok(runtime()?.block_on(fut))
}

/// Queue a background task. It only makes progress while some caller is inside
/// [do_sync].
pub(crate) fn spawn<F>(fut: F) -> io::Result<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Ok(runtime()?.spawn(fut))
}

#[cfg(test)]
mod test {
    use crate::sync::{do_sync, spawn};

    #[test]
    pub fn test_do_sync() {
        assert_eq!(do_sync(async { 40 + 2 }).unwrap(), 42);
    }

    #[test]
    pub fn test_spawn_runs_inside_do_sync() {
        let handle = spawn(async { "done" }).unwrap();
        assert_eq!(do_sync(handle).unwrap().unwrap(), "done");
    }
}
