use domain::{Priority, SortKey, TodoDraft, TodoFilters, TodoId, TodoPatch};
use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::handlers;
use crate::AppState;

pub async fn route(req: Request, state: &AppState) -> Result<Response<Body>, lambda_http::Error> {
    let path = req.uri().path().to_string();
    let method = req.method().as_str().to_string();

    tracing::info!(path = %path, method = %method, "Incoming request");

    let result = match route_inner(req, state, &path, &method).await {
        Ok(mut resp) => {
            add_cors_headers(&mut resp);
            resp
        }
        Err(e) => {
            tracing::warn!(error = %e, "Request failed");
            let mut resp = e.into_response();
            add_cors_headers(&mut resp);
            resp
        }
    };

    Ok(result)
}

async fn route_inner(
    req: Request,
    state: &AppState,
    path: &str,
    method: &str,
) -> Result<Response<Body>, ApiError> {
    if method == "OPTIONS" {
        return Ok(Response::builder().status(204).body(Body::Empty).unwrap());
    }

    let owner_id = extract_owner(&req)?;

    match (method, path) {
        ("GET", "/todos") => {
            let filters = filters_from_query(&req)?;
            handlers::list_todos(state, &owner_id, filters).await
        }
        ("POST", "/todos") => {
            let draft: TodoDraft = parse_body(&req)?;
            handlers::create_todo(state, &owner_id, draft).await
        }
        ("GET", "/todos/stats") => handlers::todo_stats(state, &owner_id).await,
        (_, p) if p.starts_with("/todos/") => {
            let rest = &p[7..];
            if rest.is_empty() {
                return Err(ApiError::BadRequest("Missing todo ID".to_string()));
            }

            if let Some(raw_id) = rest.strip_suffix("/toggle_complete") {
                let todo_id = TodoId::from_string(raw_id.to_string());
                return match method {
                    "PATCH" | "POST" => {
                        handlers::toggle_complete(state, &owner_id, &todo_id).await
                    }
                    _ => Err(ApiError::NotFound),
                };
            }

            if rest.contains('/') {
                return Err(ApiError::NotFound);
            }

            let todo_id = TodoId::from_string(rest.to_string());
            match method {
                "GET" => handlers::get_todo(state, &owner_id, &todo_id).await,
                "PUT" => {
                    let draft: TodoDraft = parse_body(&req)?;
                    handlers::update_todo(state, &owner_id, &todo_id, draft).await
                }
                "PATCH" => {
                    let patch: TodoPatch = parse_body(&req)?;
                    handlers::patch_todo(state, &owner_id, &todo_id, patch).await
                }
                "DELETE" => handlers::delete_todo(state, &owner_id, &todo_id).await,
                _ => Err(ApiError::NotFound),
            }
        }
        _ => Err(ApiError::NotFound),
    }
}

/// JWT オーソライザのリクエストコンテキストから認証済み所有者を取り出す。
/// ここより先のコードは owner_id を信頼して動く。
fn extract_owner(req: &Request) -> Result<String, ApiError> {
    let context = req.request_context_ref();

    if let Some(lambda_http::request::RequestContext::ApiGatewayV2(ctx)) = context {
        if let Some(authorizer) = &ctx.authorizer {
            if let Some(jwt) = &authorizer.jwt {
                return jwt
                    .claims
                    .get("sub")
                    .cloned()
                    .ok_or_else(|| ApiError::Unauthorized("Missing sub claim".to_string()));
            }
        }
    }

    Err(ApiError::Unauthorized(
        "Invalid authorization context".to_string(),
    ))
}

fn parse_body<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    let body_str = match req.body() {
        Body::Text(text) => text.clone(),
        Body::Binary(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|_| ApiError::BadRequest("Invalid UTF-8".to_string()))?,
        Body::Empty => return Err(ApiError::BadRequest("Empty body".to_string())),
    };

    Ok(serde_json::from_str(&body_str)?)
}

fn filters_from_query(req: &Request) -> Result<TodoFilters, ApiError> {
    let params = req.query_string_parameters();

    // completed は true/false 以外を未知のソートキーと同様に無視する
    let completed = params.first("completed").and_then(parse_bool_param);
    let priority = params
        .first("priority")
        .map(|raw| raw.parse::<Priority>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let search = params
        .first("search")
        .map(|raw| raw.to_string())
        .filter(|raw| !raw.is_empty());
    let sort_by = params.first("sort_by").and_then(SortKey::parse);

    Ok(TodoFilters {
        completed,
        priority,
        search,
        sort_by,
    })
}

fn parse_bool_param(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn add_cors_headers(resp: &mut Response<Body>) {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", "*".parse().unwrap());
    headers.insert(
        "Access-Control-Allow-Methods",
        "GET,POST,PUT,PATCH,DELETE,OPTIONS".parse().unwrap(),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        "Content-Type,Authorization".parse().unwrap(),
    );
}
