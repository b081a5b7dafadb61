//! Demo routes served by the `octopus` binary.

use crate::api::{new_response, write_json, ApiPost, ApiUser};
use crate::request::{HttpError, Params, Request};
use crate::response::Response;
use crate::router::{RouteError, Router};


const WELCOME: &str = "Welcome on Octopus";


pub fn register(router: &mut Router) -> Result<(), RouteError> {
    router.get("/", index)?;
    router.get("/users/:id", get_user)?;
    router.get("/users/:id/posts/:postId", get_user_post)?;
    Ok(())
}

pub fn index(_req: &Request, res: Response, _params: &Params) -> Response {
    res.with_payload(WELCOME)
}

pub fn get_user(_req: &Request, res: Response, params: &Params) -> Response {
    match param_u64(params, "id") {
        Some(id) => write_json(res, &new_response(ApiUser { id })),
        None => bad_param(res),
    }
}

pub fn get_user_post(_req: &Request, res: Response, params: &Params) -> Response {
    match (param_u64(params, "id"), param_u64(params, "postId")) {
        (Some(user_id), Some(post_id)) => write_json(res, &new_response(ApiPost { user_id, post_id })),
        _ => bad_param(res),
    }
}

// Digits too long for u64 pass the route pattern but not this parse.
fn param_u64(params: &Params, name: &str) -> Option<u64> {
    params.get(name).and_then(|v| v.parse().ok())
}

fn bad_param(res: Response) -> Response {
    let (code, message) = HttpError::BadRequest.status();
    res.with_error_status(code, message)
}
