pub mod carriers;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod shipments;
pub mod worker;

pub use routes::create_router;
