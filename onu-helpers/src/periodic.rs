use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

/// Runs a callback at a fixed interval on the current runtime until dropped.
///
/// The first tick fires immediately. Panics if `period` is zero.
pub struct Periodic {
    handle: JoinHandle<()>,
}

impl Periodic {
    pub fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let mut interval = time::interval(period);
        let handle = tokio::spawn(async move {
            loop {
                interval.tick().await;
                tick();
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Periodic {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
