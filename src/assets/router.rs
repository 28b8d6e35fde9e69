//! Static file serving

use axum::{
    body::Body,
    http::{Response, StatusCode, Uri, header},
};
use rust_embed::Embed;

/// Embed the public directory
#[derive(Embed)]
#[folder = "public"]
struct Asset;

/// Serve any path no route matched
pub async fn static_handler(uri: Uri) -> Response<Body> {
    let path = uri.path().trim_start_matches('/');

    // Security check: reject paths containing ..
    if path.contains("..") {
        return plain(StatusCode::BAD_REQUEST, "Invalid path");
    }

    match Asset::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime)
                .header(header::CACHE_CONTROL, "public, max-age=3600")
                .body(Body::from(content.data.into_owned()))
                .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "Bad asset"))
        }
        None => plain(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}
