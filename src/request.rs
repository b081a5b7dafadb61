use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::response::{HTTP_400, HTTP_404, HTTP_505};


pub type Params = HashMap<String, String>;

/// Protocol and routing failures that are answered with an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("bad request")]
    BadRequest,
    #[error("method not supported")]
    MethodNotSupported,
    #[error("not found")]
    NotFound,
}

impl HttpError {
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            HttpError::BadRequest => (HTTP_400, "Bad Request"),
            HttpError::MethodNotSupported => (HTTP_505, "HTTP Version Not Supported"),
            HttpError::NotFound => (HTTP_404, "Not Found"),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub version: String,
    pub query_params: Params,
    /// Filled in by the router once a route matched.
    pub uri_params: Params,
}


pub fn parse_method(token: &str) -> Result<Method, HttpError> {
    match token.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::Get),
        "POST" => Ok(Method::Post),
        "HEAD" => Ok(Method::Head),
        _ => Err(HttpError::MethodNotSupported),
    }
}

/// Split the query part of `uri` into key/value pairs.
///
/// Pairs without `=` are skipped and later keys overwrite earlier ones.
pub fn parse_query_string(uri: &str) -> Params {
    let mut params = Params::new();
    let query = match uri.split_once('?') {
        Some((_, query)) => query,
        None => return params,
    };

    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

/// Parse a request line of the form `<METHOD> <URI> <VERSION>`.
pub fn parse_request(line: &str) -> Result<Request, HttpError> {
    let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() < 3 {
        return Err(HttpError::BadRequest);
    }

    let method = parse_method(tokens[0])?;
    let uri = tokens[1].to_string();
    let query_params = parse_query_string(&uri);

    Ok(Request {
        method,
        uri,
        version: tokens[2].to_string(),
        query_params,
        uri_params: Params::new(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_request_line() {
        for (token, method) in [("GET", Method::Get), ("POST", Method::Post), ("HEAD", Method::Head)] {
            let req = parse_request(&format!("{} /index.html HTTP/1.1", token)).unwrap();
            assert_eq!(req.method, method);
            assert_eq!(req.uri, "/index.html");
            assert_eq!(req.version, "HTTP/1.1");
            assert!(req.uri_params.is_empty());
        }
    }

    #[test]
    fn method_is_case_insensitive() {
        for token in ["get", "GET", "Get", "gEt"] {
            assert_eq!(parse_method(token), Ok(Method::Get));
        }
        assert_eq!(parse_method("head"), Ok(Method::Head));
    }

    #[test]
    fn unsupported_method() {
        assert_eq!(parse_method("ZZZ"), Err(HttpError::MethodNotSupported));
        assert_eq!(parse_method("delete"), Err(HttpError::MethodNotSupported));
        assert_eq!(
            parse_request("PUT /x HTTP/1.1").unwrap_err(),
            HttpError::MethodNotSupported
        );
    }

    #[test]
    fn too_few_tokens_is_bad_request() {
        for line in ["", "GET", "GET /", "GET  /", "   "] {
            assert_eq!(parse_request(line).unwrap_err(), HttpError::BadRequest, "line {:?}", line);
        }
    }

    #[test]
    fn token_count_is_checked_before_method() {
        assert_eq!(parse_request("ZZZ /x").unwrap_err(), HttpError::BadRequest);
    }

    #[test]
    fn version_is_kept_verbatim() {
        let req = parse_request("GET / whatever/9").unwrap();
        assert_eq!(req.version, "whatever/9");
    }

    #[test]
    fn query_string_pairs() {
        let params = parse_query_string("/a?x=1&y=2");
        assert_eq!(params.len(), 2);
        assert_eq!(params["x"], "1");
        assert_eq!(params["y"], "2");
    }

    #[test]
    fn query_string_drops_malformed_pairs() {
        let params = parse_query_string("/a?x=1&bogus&y=2");
        assert_eq!(params.len(), 2);
        assert_eq!(params["x"], "1");
        assert_eq!(params["y"], "2");
    }

    #[test]
    fn query_string_absent() {
        assert!(parse_query_string("/a").is_empty());
        assert!(parse_query_string("/a?").is_empty());
    }

    #[test]
    fn query_string_last_write_wins() {
        let params = parse_query_string("/a?k=1&k=2");
        assert_eq!(params["k"], "2");
    }

    #[test]
    fn query_string_splits_on_first_equals() {
        let params = parse_query_string("/a?expr=a=b&empty=");
        assert_eq!(params["expr"], "a=b");
        assert_eq!(params["empty"], "");
    }

    #[test]
    fn request_carries_query_params() {
        let req = parse_request("GET /search?q=rust HTTP/1.1").unwrap();
        assert_eq!(req.uri, "/search?q=rust");
        assert_eq!(req.query_params["q"], "rust");
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(HttpError::BadRequest.status(), (400, "Bad Request"));
        assert_eq!(HttpError::MethodNotSupported.status(), (505, "HTTP Version Not Supported"));
        assert_eq!(HttpError::NotFound.status(), (404, "Not Found"));
    }
}
