use super::dispatch::dispatch;
use super::request::parse_request;
use super::response::write_json;
use crate::router::Router;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;

/// `may_minihttp` service answering every request from one route table.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
}

impl AppService {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        write_json(res, dispatch(&self.router, parsed));
        Ok(())
    }
}
