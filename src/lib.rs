#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod render;
pub mod route_dump;
pub mod router;
pub mod scene;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, RouterConfig, load_config};
pub use error::{Result, RouteError};
pub use geometry::{Point, Rect};
pub use router::segments::Segment;
pub use router::{GridRouter, NodeAccessor};
pub use scene::{Scene, parse_scene};
