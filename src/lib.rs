// Library exports for the demo binary and integration tests

pub mod bridge;
pub mod config;
pub mod dom;
pub mod guard;
pub mod injector;
pub mod overlay;
pub mod page;
pub mod scripts;

// Re-export commonly used types for tests
pub use bridge::{Bridge, BridgeError, NativeHost};
pub use config::Config;
pub use page::{Page, PageBuilder};
pub use scripts::inject_all;
