//! Log subscriber setup for C hosts.

use tracing_subscriber::{fmt, EnvFilter};

use crate::status::FixheapStatus;

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "fixheap=info";

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls, or calls after the host
/// installed its own subscriber, leave the existing one in place.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn fixheap_log_init() -> i32 {
    ffi_guard!({
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .try_init()
            .ok();
        FixheapStatus::Ok as i32
    })
}
