//! Inbound trigger: a tiny blocking HTTP endpoint that runs the pipeline.
//!
//! Routes:
//! - `GET /`: health check.
//! - `GET /api/serve?getLQI` (alias `/api/luft`): runs the pipeline once.
//!   Without the `getLQI` query parameter the pipeline does not run and
//!   `success` is `false`.
//!
//! Connections are served one at a time, so two requests never run the
//! pipeline concurrently within one process. Each connection gets a read
//! and write timeout and at most [`MAX_REQUEST_BYTES`] of request head, so
//! an idle or endless client only holds the server until the timeout.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logging::{self, DataSource};
use crate::pipeline::RunOutcome;

/// Paths that run the pipeline. The first is the canonical one.
pub const RUN_PATHS: [&str; 2] = ["/api/serve", "/api/luft"];
pub const RUN_GATE_PARAM: &str = "getLQI";

/// Upper bound on request line plus headers.
pub const MAX_REQUEST_BYTES: u64 = 8 * 1024;

/// Body returned by the run endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    /// Whether the pipeline ran.
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct HealthResponse {
    message: &'static str,
    status: &'static str,
}

/// Status code and JSON body of a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    fn json<T: Serialize>(status: u16, value: &T) -> HttpReply {
        match serde_json::to_string(value) {
            Ok(body) => HttpReply { status, body },
            Err(e) => HttpReply::error(500, &e.to_string()),
        }
    }

    fn error(status: u16, message: &str) -> HttpReply {
        HttpReply {
            status,
            body: serde_json::json!({ "message": message }).to_string(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// True if the query string carries the run gate parameter.
pub fn is_run_requested(query: Option<&str>) -> bool {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .any(|name| name == RUN_GATE_PARAM)
}

/// Runs the pipeline if the gate is open and maps the outcome to a reply.
///
/// Any completed run answers 200, including failed fetches or posts; the
/// message says what happened. A panic inside the run answers 500.
pub fn handle_run<F>(query: Option<&str>, run: F, now: DateTime<Utc>) -> HttpReply
where
    F: FnOnce() -> RunOutcome,
{
    if !is_run_requested(query) {
        return HttpReply::json(
            200,
            &TriggerResponse {
                success: false,
                message: format!("Nicht ausgeführt: Parameter {} fehlt", RUN_GATE_PARAM),
                timestamp: now,
            },
        );
    }

    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(outcome) => HttpReply::json(
            200,
            &TriggerResponse {
                success: true,
                message: outcome.summary(),
                timestamp: now,
            },
        ),
        Err(_) => {
            logging::error(DataSource::Trigger, None, "Pipeline panicked");
            HttpReply::json(
                500,
                &TriggerResponse {
                    success: false,
                    message: "Interner Fehler".to_string(),
                    timestamp: now,
                },
            )
        }
    }
}

/// Routes one request line (`GET /path?query HTTP/1.1`).
pub fn route<F>(request_line: &str, run: F, now: DateTime<Utc>) -> HttpReply
where
    F: FnOnce() -> RunOutcome,
{
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return HttpReply::error(400, "malformed request line");
    };

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };

    let path = path.trim_end_matches('/');
    let known = path.is_empty() || RUN_PATHS.contains(&path);

    match (method, path) {
        ("GET", "") => HttpReply::json(
            200,
            &HealthResponse {
                message: "Luftqualität Chemnitz App",
                status: "running",
            },
        ),
        ("GET", _) if known => handle_run(query, run, now),
        _ if known => HttpReply::error(405, "method not allowed"),
        _ => HttpReply::error(404, "not found"),
    }
}

/// Reads one request from `reader`, writes the reply to `writer`.
///
/// Reads at most [`MAX_REQUEST_BYTES`]; a longer request line is cut off
/// and answered as malformed.
pub fn handle_connection<R, W, F>(reader: R, mut writer: W, run: F) -> std::io::Result<HttpReply>
where
    R: BufRead,
    W: Write,
    F: FnOnce() -> RunOutcome,
{
    let mut lines = reader.take(MAX_REQUEST_BYTES).lines();
    let request_line = lines.next().transpose()?.unwrap_or_default();

    // Drain headers; bodies are not used.
    for line in lines {
        if line?.trim().is_empty() {
            break;
        }
    }

    let reply = route(&request_line, run, Utc::now());
    logging::info(
        DataSource::Trigger,
        None,
        &format!("{} -> {}", request_line.trim(), reply.status),
    );

    write!(
        writer,
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        reply.status,
        reply.reason(),
        reply.body.len(),
        reply.body
    )?;
    writer.flush()?;
    Ok(reply)
}

/// Applies the per-connection timeouts and splits off a reader.
fn prepare(stream: &TcpStream, io_timeout: Duration) -> std::io::Result<BufReader<TcpStream>> {
    stream.set_read_timeout(Some(io_timeout))?;
    stream.set_write_timeout(Some(io_timeout))?;
    Ok(BufReader::new(stream.try_clone()?))
}

/// Serves requests on `listener` until it fails.
///
/// `io_timeout` bounds every read and write on an accepted connection.
pub fn serve<F>(listener: TcpListener, run: F, io_timeout: Duration) -> std::io::Result<()>
where
    F: Fn() -> RunOutcome,
{
    logging::info(
        DataSource::Trigger,
        None,
        &format!("Listening on {}", listener.local_addr()?),
    );

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                logging::warn(DataSource::Trigger, None, &format!("Accept failed: {}", e));
                continue;
            }
        };

        let reader = match prepare(&stream, io_timeout) {
            Ok(r) => r,
            Err(e) => {
                let message = format!("Connection setup failed: {}", e);
                logging::warn(DataSource::Trigger, None, &message);
                continue;
            }
        };

        if let Err(e) = handle_connection(reader, stream, &run) {
            logging::warn(DataSource::Trigger, None, &format!("Connection error: {}", e));
        }
    }

    Ok(())
}
