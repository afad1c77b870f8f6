use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long [`ServerHandle::wait_ready`] polls before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_millis(250);

const READY_POLL: Duration = Duration::from_millis(5);

/// Listener for an [`AppService`](super::AppService) (or any `HttpService`),
/// accepting up to 32 request headers.
pub struct HttpServer<T>(pub T);

/// Handle to a listening server. Dropping it leaves the server running;
/// call [`stop`](Self::stop) or [`join`](Self::join).
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle").field("addr", &self.addr).finish()
    }
}

impl ServerHandle {
    /// The address the server was asked to listen on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// [`wait_ready_within`](Self::wait_ready_within) with [`READY_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// `TimedOut` when the server is not accepting in time.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_within(READY_TIMEOUT)
    }

    /// Poll the listen address until a TCP connection succeeds or `timeout`
    /// elapses.
    ///
    /// # Errors
    ///
    /// `TimedOut` when no connection succeeded before the deadline.
    pub fn wait_ready_within(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                debug!(addr = %self.addr, "Server accepting connections");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(addr = %self.addr, timeout_ms = timeout.as_millis(), "Server not ready");
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("server on {} not ready after {timeout:?}", self.addr),
                ));
            }
            thread::sleep(READY_POLL);
        }
    }

    /// Cancel the accept loop and wait for it to finish.
    pub fn stop(self) {
        // SAFETY: the handle owns the accept coroutine, which is still alive
        // here; cancelling it is how `may` coroutines are shut down.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!(addr = %self.addr, "Server stopped");
    }

    /// Block until the server coroutine ends.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        let addr = self.addr;
        let result = self.handle.join();
        info!(addr = %addr, clean = result.is_ok(), "Server exited");
        result
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start accepting connections.
    ///
    /// The first resolved address is used. Port `0` is refused: the port the
    /// OS would pick cannot be read back, so [`ServerHandle::addr`] and
    /// [`ServerHandle::wait_ready`] would point nowhere.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the address does not resolve or names port `0`;
    /// the bind error (e.g. `AddrInUse`) when the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve"))?;
        if addr.port() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "port 0 is not supported, pass an explicit port",
            ));
        }
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        debug!(addr = %addr, max_headers = 32, "HTTP listener started");
        Ok(ServerHandle { addr, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use crate::server::AppService;

    #[test]
    fn test_port_zero_refused() {
        let err = HttpServer(AppService::new(Router::new()))
            .start("127.0.0.1:0")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_unresolvable_address_refused() {
        let err = HttpServer(AppService::new(Router::new()))
            .start("not an address")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
