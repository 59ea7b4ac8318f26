//! CGI relay: turns an HTTP request into a CGI/1.1 subprocess invocation and
//! streams the backend's stdout back as the HTTP response, instead of
//! buffering the whole body in memory.
//!
//! Literal connection hijacking (as `net/http/cgi.Handler` does) isn't
//! something axum's response type exposes; streaming the body through a
//! chunked transfer achieves the same goal of never holding an entire git
//! pack or hgweb page in memory at once.

use std::io;
use std::process::Stdio;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use vcsmirror_core::HttpError;

use crate::actions::proxy::CgiDescriptor;

const READ_CHUNK: usize = 8192;

/// Build the CGI meta-variables RFC 3875 specifies, plus the descriptor's
/// own backend-specific environment.
fn meta_variables(method: &Method, query: &str, headers: &HeaderMap, descriptor: &CgiDescriptor) -> Vec<(String, String)> {
    let mut vars = vec![
        ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
        ("SERVER_PROTOCOL".to_string(), "HTTP/1.1".to_string()),
        ("SERVER_SOFTWARE".to_string(), "vcsmirror".to_string()),
        ("REQUEST_METHOD".to_string(), method.to_string()),
        ("SCRIPT_NAME".to_string(), descriptor.script_path.clone()),
        ("PATH_INFO".to_string(), descriptor.script_path.clone()),
        ("QUERY_STRING".to_string(), query.to_string()),
    ];
    if !descriptor.root.is_empty() {
        vars.push(("SCRIPT_ROOT".to_string(), descriptor.root.clone()));
    }
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        if name == axum::http::header::CONTENT_TYPE {
            vars.push(("CONTENT_TYPE".to_string(), value.to_string()));
        } else if name == axum::http::header::CONTENT_LENGTH {
            vars.push(("CONTENT_LENGTH".to_string(), value.to_string()));
        } else {
            let key = format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_"));
            vars.push((key, value.to_string()));
        }
    }
    vars.extend(descriptor.env.iter().cloned());
    vars
}

/// Spawn the backend named by `descriptor`, forward `body` to its stdin
/// concurrently, parse the CGI header block from its stdout, and return an
/// HTTP response whose body streams the rest of stdout as it's produced.
///
/// # Errors
/// `internal` (500) if the subprocess can't be spawned, its stdout can't be
/// parsed as a CGI header block, or the response can't be assembled.
pub async fn relay(descriptor: CgiDescriptor, method: Method, query: &str, headers: &HeaderMap, body: Body) -> Result<Response<Body>, HttpError> {
    let vars = meta_variables(&method, query, headers, &descriptor);

    let mut command = Command::new(&descriptor.program);
    command
        .args(&descriptor.args)
        .current_dir(&descriptor.dir)
        .env_clear()
        .envs(vars)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        warn!(error = %e, program = %descriptor.program.display(), "failed to spawn cgi backend");
        HttpError::internal("failed to start backend process")
    })?;

    let mut stdin = child.stdin.take().expect("stdin was requested as piped");
    let mut request_body = body.into_data_stream();
    tokio::spawn(async move {
        while let Some(chunk) = request_body.next().await {
            let Ok(bytes) = chunk else { break };
            if stdin.write_all(&bytes).await.is_err() {
                break;
            }
        }
        let _ = stdin.shutdown().await;
    });

    let stdout = child.stdout.take().expect("stdout was requested as piped");
    let mut reader = BufReader::new(stdout);

    let (status, response_headers) = read_header_block(&mut reader).await?;

    let body_stream = stream::unfold(reader, |mut reader| async move {
        let mut buf = vec![0_u8; READ_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok::<Bytes, io::Error>(Bytes::from(buf)), reader))
            }
            Err(e) => Some((Err(e), reader)),
        }
    });

    let mut builder = Response::builder().status(status);
    for (name, value) in &response_headers {
        builder = builder.header(name, value);
    }
    let response = builder
        .body(Body::from_stream(body_stream))
        .map_err(|_| HttpError::internal("failed to assemble backend response"))?;

    tokio::spawn(async move {
        if let Some(mut stderr) = child.stderr.take() {
            let mut output = String::new();
            let _ = stderr.read_to_string(&mut output).await;
            if !output.is_empty() {
                warn!(stderr = %output, "cgi backend wrote to stderr");
            }
        }
        match child.wait().await {
            Ok(status) => debug!(?status, "cgi backend exited"),
            Err(e) => warn!(error = %e, "failed waiting for cgi backend to exit"),
        }
    });

    Ok(response)
}

/// Read CGI response headers from `reader` up to the first blank line, per
/// RFC 3875 §6.3. A `Status:` header sets the HTTP status; every other
/// header is forwarded verbatim.
async fn read_header_block(reader: &mut BufReader<tokio::process::ChildStdout>) -> Result<(StatusCode, HeaderMap), HttpError> {
    let mut status = StatusCode::OK;
    let mut headers = HeaderMap::new();

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.map_err(|e| {
            warn!(error = %e, "failed reading cgi header block");
            HttpError::internal("backend process produced a malformed response")
        })?;
        if n == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else { continue };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("status") {
            if let Some(code) = value.split_whitespace().next().and_then(|s| s.parse::<u16>().ok()) {
                status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
            }
            continue;
        }

        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }

    Ok((status, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell_descriptor(script: &str) -> CgiDescriptor {
        CgiDescriptor {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            dir: std::env::temp_dir(),
            env: Vec::new(),
            script_path: "/example.com/r/info/refs".to_string(),
            root: String::new(),
        }
    }

    #[tokio::test]
    async fn relays_status_header_and_body_from_backend() {
        let descriptor = shell_descriptor(r#"printf 'Status: 404 Not Found\r\nContent-Type: text/plain\r\n\r\nnope'"#);
        let response = relay(descriptor, Method::GET, "", &HeaderMap::new(), Body::empty()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"nope");
    }

    #[tokio::test]
    async fn defaults_to_200_when_backend_omits_status() {
        let descriptor = shell_descriptor(r#"printf 'Content-Type: text/plain\r\n\r\nok'"#);
        let response = relay(descriptor, Method::GET, "", &HeaderMap::new(), Body::empty()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwards_request_body_to_backend_stdin() {
        let descriptor = shell_descriptor(r#"printf 'Content-Type: text/plain\r\n\r\n'; cat"#);
        let response = relay(descriptor, Method::POST, "", &HeaderMap::new(), Body::from("hello backend")).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello backend");
    }
}
