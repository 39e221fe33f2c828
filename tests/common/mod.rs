//! Shared helpers for integration tests
#![allow(dead_code)]

use mobium::driver::mock::MockDriver;
use mobium::driver::traits::DriverSession;
use std::sync::Arc;

/// Initialize test logging once per process
pub fn init_logging() {
    mobium::logging::init("debug");
}

/// A fresh mock driver, typed both concretely and as a trait object
pub fn mock_driver() -> (Arc<MockDriver>, Arc<dyn DriverSession>) {
    let mock = Arc::new(MockDriver::new());
    let session: Arc<dyn DriverSession> = mock.clone();
    (mock, session)
}
