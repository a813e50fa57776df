pub mod api;
pub mod middleware;

pub use api::create_router;
