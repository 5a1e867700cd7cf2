//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;
use wiremock::MockServer;

/// A wiremock server together with the runtime driving it
///
/// The tests themselves use the blocking client, so they must not run inside
/// an async context; the runtime only serves the mock server.
pub struct TestServer {
    pub server: MockServer,
    pub runtime: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn mount(&self, mock: wiremock::Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }
}

/// Serves exactly one connection with a hand-written response
///
/// Used for responses wiremock cannot produce, such as a body without
/// `Content-Length` or a body shorter than announced.
pub fn serve_raw_once(head: String, body: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buffer).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
        }

        // The client may hang up early, e.g. after rejecting the headers
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    });

    (format!("http://{}/video.mp4", address), handle)
}

/// Builds an episode page with one `<source>` per `(src, res)` pair
pub fn episode_page(sources: &[(&str, &str)]) -> String {
    let sources: String = sources
        .iter()
        .map(|(src, res)| format!(r#"<source src="{src}" type="video/mp4" res="{res}">"#))
        .collect();
    format!("<html><body><h1>Episode</h1><video controls>{sources}</video></body></html>")
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}
