#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temp file with the given extension; deleted on drop.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("oasbind_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }
}

pub mod recording {
    use oasbind::binder::{RouteRegistrar, RouteRegistration};
    use serde_json::Value;

    /// Registrar that keeps `(METHOD, path, schema)` of every registration.
    #[derive(Default)]
    pub struct Recorder {
        pub routes: Vec<(String, String, Value)>,
    }

    impl RouteRegistrar for Recorder {
        type Error = std::convert::Infallible;

        fn register(&mut self, route: RouteRegistration) -> Result<(), Self::Error> {
            self.routes.push((
                route.method.to_string(),
                route.path,
                route.schema.to_value(),
            ));
            Ok(())
        }
    }

    impl Recorder {
        pub fn keys(&self) -> Vec<String> {
            self.routes
                .iter()
                .map(|(m, p, _)| format!("{m} {p}"))
                .collect()
        }
    }
}

pub mod handlers {
    use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
    use serde_json::json;

    /// Registry answering `{}` for each of `ids`.
    pub fn registry_for(ids: &[&str]) -> HandlerRegistry {
        ids.iter()
            .fold(HandlerRegistry::builder(), |b, id| {
                b.register(*id, |_req: HandlerRequest| Reply::new().send(json!({})))
            })
            .build()
            .unwrap()
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    fn content_length(head: &str) -> Option<usize> {
        head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
    }

    /// Send a raw HTTP request and read one full response.
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(1000)))
            .unwrap();

        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let expected = content_length(&text[..end]).unwrap_or(0);
                if buf.len() >= end + 4 + expected {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status code and JSON body (Null when empty or not JSON).
    pub fn parse_response(resp: &str) -> (u16, serde_json::Value) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let status = head
            .lines()
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let json = serde_json::from_str(body).unwrap_or_default();
        (status, json)
    }

    pub fn get(addr: &SocketAddr, path: &str) -> (u16, serde_json::Value) {
        let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        parse_response(&send_request(addr, &req))
    }

    pub fn post_json(addr: &SocketAddr, path: &str, body: &str) -> (u16, serde_json::Value) {
        let req = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        parse_response(&send_request(addr, &req))
    }
}

pub mod test_server {
    use std::net::TcpListener;
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// A local address with a port that was free a moment ago.
    pub fn free_addr() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }
}

/// The two-operation document used across binder tests.
pub const PETS_YAML: &str = r#"
openapi: 3.0.0
info: { title: Pets, version: 1.0.0 }
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items: { type: object }
    post:
      operationId: createPets
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                name: { type: string }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { type: object }
"#;
