//! # Server Module
//!
//! HTTP front end on `may_minihttp`: [`AppService`] parses each request,
//! runs it through [`dispatch`] against the bound [`Router`](crate::router::Router)
//! and writes the JSON reply. [`HttpServer`] starts the listener and hands
//! back a [`ServerHandle`].

pub mod dispatch;
pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use dispatch::dispatch;
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, split_path_and_query, ParsedRequest, RequestBody};
pub use service::AppService;
