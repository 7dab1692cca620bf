//! Request and response types exchanged with user functions.

mod request;
mod response;

pub use hyper::{Method, StatusCode};
pub use request::Request;
pub use response::Response;
