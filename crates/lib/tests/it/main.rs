/*! Integration tests for the MyCloud client.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * Every test runs against the in-process mock backend in `helpers`:
 * - session: login, registration, the startup check and logout
 * - http: bearer handling, single-flight refresh and error messages
 * - resource: per-item in-flight tracking, uploads and admin operations
 * - store: persistence of the session across client instances
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mycloud=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod resource;
mod session;
