//! Path-template router.
//!
//! Templates are `/`-separated; a segment starting with `:` names a numeric
//! parameter. Each template is compiled once into an anchored regex whose Nth
//! capture group belongs to the Nth parameter name.

use regex::Regex;
use thiserror::Error;

use crate::request::{HttpError, Params, Request};
use crate::response::Response;
use crate::static_files::ContentProvider;


const MODULE: &str = "ROUTER";

pub const PARAM_SENTINEL: char = ':';
const PARAM_PLACEHOLDER: &str = r"(\d+)";

/// Turns the request and the response built so far into the final response.
pub type Handler = Box<dyn Fn(&Request, Response, &Params) -> Response + Send + Sync>;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route template `{template}`: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: regex::Error,
    },
}


pub struct Route {
    pub method: String,
    pub template: String,
    pattern: Regex,
    param_names: Vec<String>,
    handler: Handler,
}

impl Route {
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    fn extract_params(&self, uri: &str) -> Params {
        let mut params = Params::new();
        let captures = match self.pattern.captures(uri) {
            Some(c) => c,
            None => return params,
        };
        for (name, value) in self.param_names.iter().zip(captures.iter().skip(1)) {
            match value {
                Some(m) => {
                    params.insert(name.clone(), m.as_str().to_string());
                }
                None => break,
            }
        }
        params
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("pattern", &self.pattern.as_str())
            .field("param_names", &self.param_names)
            .finish()
    }
}


/// Compile a template into an anchored pattern plus its ordered parameter names.
pub fn compile_template(template: &str) -> Result<(Regex, Vec<String>), regex::Error> {
    let mut param_names = Vec::new();
    let mut segments = Vec::new();

    for segment in template.split('/') {
        match segment.strip_prefix(PARAM_SENTINEL) {
            Some(name) => {
                param_names.push(name.to_string());
                segments.push(PARAM_PLACEHOLDER.to_string());
            }
            None => segments.push(regex::escape(segment)),
        }
    }

    let pattern = Regex::new(&format!("^{}$", segments.join("/")))?;
    Ok((pattern, param_names))
}


/// Ordered route table. Built before the server starts and read-only afterwards.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    static_content: Option<Box<dyn ContentProvider>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `provider` before any route on every request.
    pub fn with_static_content(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.static_content = Some(Box::new(provider));
        self
    }

    pub fn add_route<F>(&mut self, method: &str, template: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&Request, Response, &Params) -> Response + Send + Sync + 'static,
    {
        let (pattern, param_names) = compile_template(template).map_err(|source| {
            RouteError::InvalidTemplate { template: template.to_string(), source }
        })?;

        debug!(
            "[{}] Registered {} {} as `{}` with params {:?}",
            MODULE, method, template, pattern.as_str(), param_names
        );
        self.routes.push(Route {
            method: method.to_string(),
            template: template.to_string(),
            pattern,
            param_names,
            handler: Box::new(handler),
        });
        Ok(())
    }

    pub fn get<F>(&mut self, template: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&Request, Response, &Params) -> Response + Send + Sync + 'static,
    {
        self.add_route("GET", template, handler)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Produce the response for `request`.
    ///
    /// Static content wins over routes. Among routes whose method and pattern
    /// match, the one registered last is used.
    pub fn resolve(&self, request: &mut Request, response: Response) -> Result<Response, HttpError> {
        if let Some(provider) = &self.static_content {
            if let Some((bytes, content_type)) = provider.lookup(&request.uri) {
                return Ok(response.with_payload(bytes).with_content_type(content_type));
            }
        }

        let route = self
            .routes
            .iter()
            .rev()
            .find(|r| {
                r.method.eq_ignore_ascii_case(request.method.as_str()) && r.pattern.is_match(&request.uri)
            })
            .ok_or(HttpError::NotFound)?;

        let params = route.extract_params(&request.uri);
        debug!("[{}] {} {} matched {} {:?}", MODULE, request.method, request.uri, route.template, params);
        request.uri_params = params.clone();

        Ok((route.handler)(request, response, &params))
    }
}
