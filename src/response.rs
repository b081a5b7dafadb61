use crate::request::HttpError;


pub const DEFAULT_SERVER_NAME: &str = "Octopus";
pub const DEFAULT_CONTENT_TYPE: &str = "text-plain";

pub const HTTP_200: u16 = 200;
pub const HTTP_400: u16 = 400;
pub const HTTP_404: u16 = 404;
pub const HTTP_500: u16 = 500;
pub const HTTP_505: u16 = 505;


#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub status_message: String,
    pub server: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Response::new(DEFAULT_SERVER_NAME)
    }
}

impl Response {
    /// A `200 OK` response with an empty payload.
    pub fn new(server: &str) -> Response {
        Response {
            status_code: HTTP_200,
            status_message: "OK".to_string(),
            server: server.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            payload: Vec::new(),
        }
    }

    pub fn from_error(err: HttpError, server: &str) -> Response {
        let (code, message) = err.status();
        Response::new(server).with_error_status(code, message)
    }

    /// Set an error status; the payload repeats the status line followed by
    /// an empty line.
    pub fn with_error_status(self, code: u16, message: &str) -> Response {
        self.with_status(code, message)
            .with_payload(format!("HTTP/1.1 {} {}\r\n\r\n", code, message))
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Response {
        self.payload = payload.into();
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Response {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_status(mut self, code: u16, message: &str) -> Response {
        self.status_code = code;
        self.status_message = message.to_string();
        self
    }

    /// Serialize to wire bytes.
    ///
    /// The mixed `\r\n` / `\n` header terminators are kept byte-for-byte for
    /// compatibility with existing clients of this server.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nServer: {}\nContent-Length: {}\r\nContent-type: {}\n\r\n",
            self.status_code,
            self.status_message,
            self.server,
            self.payload.len(),
            self.content_type,
        );
        let mut bytes = Vec::with_capacity(head.len() + self.payload.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_framing_is_exact() {
        let resp = Response::new("Octopus").with_payload("hello");
        assert_eq!(
            resp.to_bytes(),
            b"HTTP/1.1 200 OK\r\nServer: Octopus\nContent-Length: 5\r\nContent-type: text-plain\n\r\nhello".to_vec()
        );
    }

    #[test]
    fn content_length_counts_bytes() {
        let resp = Response::default().with_payload("héllo");
        let text = String::from_utf8(resp.to_bytes()).unwrap();
        assert!(text.contains("Content-Length: 6\r\n"));
    }

    #[test]
    fn error_response() {
        let resp = Response::from_error(HttpError::NotFound, "test");
        assert_eq!(resp.status_code, HTTP_404);
        assert_eq!(resp.status_message, "Not Found");
        assert_eq!(resp.payload, b"HTTP/1.1 404 Not Found\r\n\r\n".to_vec());
        assert_eq!(
            resp.to_bytes(),
            b"HTTP/1.1 404 Not Found\r\nServer: test\nContent-Length: 26\r\nContent-type: text-plain\n\r\nHTTP/1.1 404 Not Found\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn error_status_keeps_other_fields() {
        let resp = Response::new("test")
            .with_content_type("application/json")
            .with_error_status(HTTP_500, "Internal Server Error");
        assert_eq!(resp.status_code, HTTP_500);
        assert_eq!(resp.server, "test");
        assert_eq!(resp.content_type, "application/json");
        assert_eq!(resp.payload, b"HTTP/1.1 500 Internal Server Error\r\n\r\n".to_vec());
    }

    #[test]
    fn builder_overrides() {
        let resp = Response::default()
            .with_status(201, "Created")
            .with_content_type("application/json");
        assert_eq!(resp.status_code, 201);
        assert_eq!(resp.status_message, "Created");
        assert_eq!(resp.content_type, "application/json");
        assert_eq!(resp.server, DEFAULT_SERVER_NAME);
    }
}
