//! Process-wide out-of-memory hook.
//!
//! Growth paths of the core structures reserve memory fallibly and route a
//! failure here. The default handler logs the request and aborts; embedders
//! and tests may install their own.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub type OomHandler = fn(usize);

static OOM_HANDLER: Lazy<RwLock<OomHandler>> = Lazy::new(|| RwLock::new(default_oom_handler));

fn default_oom_handler(size: usize) {
    tracing::error!(requested = size, "Out of memory trying to allocate");
}

/// Replaces the handler invoked on allocation failure.
pub fn set_oom_handler(handler: OomHandler) {
    *OOM_HANDLER.write() = handler;
}

/// Restores the logging handler.
pub fn reset_oom_handler() {
    *OOM_HANDLER.write() = default_oom_handler;
}

/// Reports an allocation failure of `size` bytes. Never returns: if the
/// installed handler returns, the process aborts.
pub fn handle(size: usize) -> ! {
    let handler = *OOM_HANDLER.read();
    handler(size);
    std::process::abort()
}

/// Reserves `additional` elements in `vec`, calling [`handle`] on failure.
pub(crate) fn reserve_or_abort<T>(
    vec: &mut Vec<T>,
    additional: usize,
) {
    if vec.try_reserve_exact(additional).is_err() {
        handle(additional.saturating_mul(std::mem::size_of::<T>().max(1)));
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn panicking_handler(size: usize) {
        panic!("oom: {size}");
    }

    /// A custom handler runs before the process would abort.
    #[test]
    #[serial]
    fn test_custom_handler_is_invoked() {
        set_oom_handler(panicking_handler);
        let result = std::panic::catch_unwind(|| handle(4096));
        reset_oom_handler();

        let payload = result.unwrap_err();
        let msg = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert_eq!(msg, "oom: 4096");
    }

    #[test]
    #[serial]
    fn test_reserve_or_abort_succeeds_for_small_requests() {
        let mut v: Vec<u8> = Vec::new();
        reserve_or_abort(&mut v, 64);
        assert!(v.capacity() >= 64);
    }
}
