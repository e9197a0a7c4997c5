//! fOS Lazy Load
//!
//! Defers loading of off-screen images until they approach the viewport.
//! Elements opt in by carrying their real source in `data-src`; the engine
//! watches them with either debounced scroll polling or host intersection
//! notifications, loads each one at most once and reveals it with an
//! optional fade.
//!
//! # Example
//! ```rust,ignore
//! use fos_lazyload::{LazyLoad, RawOptions};
//!
//! let options = RawOptions::new()
//!     .with_threshold(200.0)
//!     .with_placeholder("placeholder.jpg")
//!     .with_error_image("error.jpg");
//! let lazy = LazyLoad::new(host, "body", options);
//! ```

pub mod config;
pub mod event_loop;
pub mod headless;
pub mod host;
pub mod loader;
pub mod registry;
pub mod strategy;
mod engine;

pub use config::{Animation, Config, ConfigError, RawOptions, resolve};
pub use engine::LazyLoad;
pub use headless::{HeadlessHost, HostEvent};
pub use host::{Host, IntersectionEntry, IntersectionHost, LoadError, NodeId};
pub use registry::{ElementRegistry, ElementState, TrackedElement};
pub use strategy::{StrategyKind, VisibilityStrategy};

// Re-export the DOM for hosts built on it
pub use fos_dom as dom;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
