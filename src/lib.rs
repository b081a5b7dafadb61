//! Octopus: a small HTTP server on raw POSIX sockets.
//!
//! A request is a single line, `<METHOD> <URI> <VERSION>`. It is parsed,
//! matched against static files and then path-template routes, and answered
//! with one response before the connection is closed.

#[macro_use] extern crate log;

pub mod api;
pub mod config;
pub mod context;
pub mod handlers;
pub mod logger;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod socket;
pub mod static_files;
pub mod utils;

pub use request::{HttpError, Method, Params, Request};
pub use response::Response;
pub use router::{Router, RouteError};
pub use server::{ConnectionRegistry, Server};
pub use socket::{Socket, SocketError};
pub use static_files::{ContentProvider, StaticFiles};
