//! Remote driver layer
//!
//! Abstracts the remote automation protocol behind [`traits::DriverSession`]
//! and [`traits::ElementHandle`]. The HTTP implementation speaks the W3C
//! WebDriver wire protocol; the mock implementation backs the test suite.

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpDriver;
pub use mock::{ElementScript, MockDriver, MockElement};
pub use traits::{DriverSession, ElementHandle, Swipe, WindowSize};
