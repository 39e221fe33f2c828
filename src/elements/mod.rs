//! Element location core
//!
//! Locators with fallback strategies, bounded polling waits, the
//! self-healing resolver, and scroll-until-found search.

pub mod locator;
pub mod resolver;
pub mod scroll;
pub mod wait;

pub use locator::{Candidate, Locator, Strategy};
pub use resolver::{ElementResolver, ResolveOptions, ResolvedElement};
pub use scroll::{Direction, ScrollOptions, ScrollSearch};
pub use wait::WaitCoordinator;
