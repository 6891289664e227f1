use std::net::SocketAddr;

use hyper::header::{ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};
use serde::Serialize;

use crate::handler::HandlerResult;
use crate::Body;

const APPLICATION_JSON: &str = "application/json; charset=utf-8";
const APPLICATION_JAVASCRIPT: &str = "application/javascript; charset=utf-8";
const APPLICATION_XML: &str = "application/xml; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const XML_HEADER: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Returns the best guess of the client's IP address.
///
/// Proxy headers are trusted first: `X-Real-Ip`, then the first entry of
/// `X-Forwarded-For`. Otherwise the address of the connected peer is used.
pub fn client_ip<B>(req: &Request<B>, peer: Option<SocketAddr>) -> Option<String> {
    let headers = req.headers();

    if let Some(ip) = header_str(headers, "x-real-ip").map(str::trim) {
        if !ip.is_empty() {
            return Some(ip.to_owned());
        }
    }

    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        let ip = forwarded.split(',').next().unwrap_or("").trim();
        if !ip.is_empty() {
            return Some(ip.to_owned());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

/// Returns the languages listed in the `Accept-Language` header, in the
/// order the client sent them, without their quality values.
pub fn accepted_languages(headers: &HeaderMap) -> Vec<String> {
    let accepted = match headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()) {
        Some(accepted) if !accepted.is_empty() => accepted,
        _ => return Vec::new(),
    };

    accepted
        .split(',')
        .map(|option| option.split(';').next().unwrap_or("").trim().to_owned())
        .collect()
}

/// Serializes `value` as JSON and responds with it.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HandlerResult {
    json_bytes(status, serde_json::to_vec(value)?)
}

/// Responds with already encoded JSON.
pub fn json_bytes(status: StatusCode, body: impl Into<Body>) -> HandlerResult {
    respond(status, APPLICATION_JSON, body.into())
}

/// Serializes `value` as JSON and responds with it wrapped in a call to
/// `callback`, as in `callback({...});`.
pub fn jsonp<T>(status: StatusCode, value: &T, callback: &str) -> HandlerResult
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(value)?;

    let mut body = Vec::with_capacity(callback.len() + json.len() + 3);
    body.extend_from_slice(callback.as_bytes());
    body.push(b'(');
    body.extend_from_slice(&json);
    body.extend_from_slice(b");");

    respond(status, APPLICATION_JAVASCRIPT, body.into())
}

/// Responds with already encoded XML, prefixed with the standard XML header.
pub fn xml_bytes(status: StatusCode, xml: impl AsRef<[u8]>) -> HandlerResult {
    let xml = xml.as_ref();

    let mut body = Vec::with_capacity(XML_HEADER.len() + xml.len());
    body.extend_from_slice(XML_HEADER);
    body.extend_from_slice(xml);

    respond(status, APPLICATION_XML, body.into())
}

/// Responds with `contents` as a file download named `filename`.
///
/// The content type is guessed from the file extension and falls back to
/// `application/octet-stream`.
pub fn attachment(filename: &str, contents: impl Into<Body>) -> HandlerResult {
    disposition("attachment", filename, contents.into())
}

/// Responds with `contents` as a file named `filename` that the client
/// should display rather than download.
pub fn inline(filename: &str, contents: impl Into<Body>) -> HandlerResult {
    disposition("inline", filename, contents.into())
}

fn disposition(kind: &str, filename: &str, contents: Body) -> HandlerResult {
    let content_type = mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM);

    let res = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_DISPOSITION, format!("{};filename={}", kind, filename))
        .header(CONTENT_TYPE, content_type)
        .body(contents)?;
    Ok(res)
}

fn respond(status: StatusCode, content_type: &'static str, body: Body) -> HandlerResult {
    let res = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(body)?;
    Ok(res)
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
