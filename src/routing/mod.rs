pub mod router;

pub use router::{Route, RouteMatch, Router, RouterBuilder, UpstreamAction};
