pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registrants;
pub mod routes;
pub mod tickets;

pub use routes::create_router;
