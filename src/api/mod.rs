// HTTP boundary around the reconciliation engine. Thin by design: handlers
// parse the request, call the library, and map error kinds to status codes.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
