//! Windowed paging and selection engine
//!
//! Keeps a sliding window of pages from a large dataset resident, fetching
//! pages as the viewport reaches them and evicting those it leaves, while
//! keeping row selection consistent across loads.
//!
//! The entry point is [`LiveGrid`]. Data comes from any [`source::DataSource`];
//! [`source::InMemorySource`] serves a local dataset.

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod events;
pub mod grid;
pub mod model;
pub mod planner;
pub mod rate_limit;
pub mod selection;
pub mod source;
pub mod store;

pub use config::GridConfig;
pub use coordinator::PagingCoordinator;
pub use error::Error;
pub use grid::LiveGrid;
pub use grid::ScrollFeed;
