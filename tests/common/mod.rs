#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use octopus::config::ServerSettings;
use octopus::{Router, Server};


pub fn start(router: Router) -> (Server, u16) {
    let mut server = Server::new(router, &ServerSettings::default());
    server.start(0).expect("server should start on an ephemeral port");
    let port = server.local_port().expect("started server has a port");
    (server, port)
}

pub fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

/// Send raw bytes and read until the server closes the connection.
pub fn exchange(port: u16, request: &[u8]) -> Vec<u8> {
    let mut stream = connect(port);
    stream.write_all(request).unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).unwrap();
    buf
}

pub fn exchange_text(port: u16, request: &str) -> String {
    String::from_utf8(exchange(port, request.as_bytes())).unwrap()
}

pub fn status_line(response: &str) -> &str {
    response.split("\r\n").next().unwrap_or("")
}

pub fn body(response: &str) -> &str {
    response.split_once("\n\r\n").map(|(_, b)| b).unwrap_or("")
}

pub fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}
