//! Shared constants for end-to-end tests
//!
//! When fixture behavior changes (keys, stub results), update only this file.

// ============================================================================
// Admin Access
// ============================================================================

/// Admin key the test server is configured with
pub const TEST_ADMIN_KEY: &str = "test-admin-key-12345";

/// A key that is never accepted
#[allow(dead_code)]
pub const WRONG_ADMIN_KEY: &str = "not-the-admin-key";

// ============================================================================
// Stub Job Results
// ============================================================================

/// New records reported by the succeeding franchise stub
pub const FRANCHISE_NEW_RECORDS: u64 = 3;

/// New records reported by the succeeding support stub
pub const SUPPORT_NEW_RECORDS: u64 = 2;

/// Error reported by the failing doroob stub
pub const DOROOB_FAILURE: &str = "upstream returned garbage";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for background scrapes to show up in the logs (milliseconds)
pub const SCRAPE_SETTLE_TIMEOUT_MS: u64 = 5000;
