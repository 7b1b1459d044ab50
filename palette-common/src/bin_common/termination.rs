use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use signal_hook::{consts::signal::*, low_level};

/// Counts SIGINT and SIGTERM. Batch drivers poll it between items and stop after the one
/// in progress. The third signal falls through to the default handler.
#[derive(Clone, Debug)]
pub struct StopSignal {
    count: Arc<AtomicUsize>,
}

impl StopSignal {
    pub fn install() -> Result<Self, std::io::Error> {
        let count = Arc::new(AtomicUsize::new(0));

        for flag in [SIGINT, SIGTERM] {
            let count = Arc::clone(&count);
            // SAFETY: this only uses atomic stuff and functions the crate itself is using
            // in signal handlers
            unsafe {
                low_level::register(flag, move || {
                    let prev = count.fetch_add(1, Ordering::SeqCst);
                    if prev >= 2 {
                        let _ = low_level::emulate_default_handler(flag);
                    }
                })?;
            };
        }

        Ok(Self { count })
    }

    /// A signal that is never raised by anything but [`StopSignal::raise`].
    pub fn detached() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn raise(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= 1
    }
}
