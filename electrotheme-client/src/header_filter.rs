//! Optional response-header stripping.
//!
//! Some hosts refuse injected styles because of a restrictive
//! content-security-policy. When `remove_security_policy_header` is set, the
//! agent asks the host's header filter to drop that header and reload its
//! consumers. Hosts without such a hook pass `None` and get a warning.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::ws::ClientConfig;

/// Header removed when `remove_security_policy_header` is enabled.
pub const SECURITY_POLICY_HEADER: &str = "content-security-policy";

/// Host hook for rewriting response headers.
pub trait HeaderFilter: Send + Sync {
    /// Drops the named header (case-insensitive) from every later response.
    fn strip_response_header(&self, name: &str);

    /// Reloads consumers so the new header policy takes effect.
    fn reload_consumers(&self);
}

/// Removes every entry whose key matches `name` case-insensitively.
///
/// Returns the number of entries removed.
pub fn strip_header<V>(headers: &mut HashMap<String, V>, name: &str) -> usize {
    let before = headers.len();
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    before - headers.len()
}

/// Applies the security-policy option once at startup.
///
/// Returns true if a filter was installed.
pub fn apply_security_policy_option(
    config: &ClientConfig,
    filter: Option<&dyn HeaderFilter>,
) -> bool {
    if !config.remove_security_policy_header {
        return false;
    }

    match filter {
        Some(filter) => {
            filter.strip_response_header(SECURITY_POLICY_HEADER);
            filter.reload_consumers();
            info!(header = SECURITY_POLICY_HEADER, "Stripping response header");
            true
        }
        None => {
            warn!(
                header = SECURITY_POLICY_HEADER,
                "remove_security_policy_header is set but this host has no header filter"
            );
            false
        }
    }
}
