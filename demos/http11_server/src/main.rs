//! HTTP サーバーの例 (std::net のブロッキング I/O)
//!
//! 接続ごとにスレッドを立て、リクエストを 1 つ読んで内容を表示し、
//! 同じ内容をレスポンスとして返す。
//!
//! 使い方:
//!   cargo run -p http11_server
//!   cargo run -p http11_server -- --port 3000 --read-timeout 5 --max-body-size 1024
//!
//!   curl -v http://localhost:8080/echo -d 'hello'
//!   curl -v http://localhost:8080/echo -H 'Transfer-Encoding: chunked' -d 'hello'
//!
//! ログは RUST_LOG で調整できる:
//!   RUST_LOG=shiguredo_http11_reader=trace cargo run -p http11_server

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use shiguredo_http11_reader::{
    Body, Error, ErrorCategory, HeadReader, HttpHead, Message, ReaderLimits, encode_head,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

struct ServerOptions {
    port: u16,
    read_timeout: Option<Duration>,
    allow_incomplete_head: bool,
    max_body_size: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = parse_args()?;

    let addr = format!("0.0.0.0:{}", options.port);
    let listener = TcpListener::bind(&addr)?;
    println!("HTTP server listening on http://{}", addr);

    let limits = ReaderLimits {
        max_body_size: options.max_body_size,
        ..Default::default()
    };
    let reader =
        HeadReader::with_limits(limits).allow_incomplete_head(options.allow_incomplete_head);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("accept error: {e}");
                continue;
            }
        };
        let reader = reader.clone();
        let read_timeout = options.read_timeout;

        std::thread::spawn(move || {
            let peer_addr = stream
                .peer_addr()
                .map_or_else(|_| "unknown".to_string(), |a| a.to_string());
            if let Err(e) = handle_client(stream, &reader, read_timeout) {
                tracing::warn!(%peer_addr, "client error: {e}");
            }
        });
    }

    Ok(())
}

fn parse_args() -> Result<ServerOptions, Box<dyn std::error::Error>> {
    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "http11_server";

    // --help フラグ
    noargs::HELP_FLAG.take_help(&mut args);

    // --version フラグ
    let version_flag: bool = noargs::flag("version")
        .short('V')
        .doc("Show version")
        .take(&mut args)
        .is_present();
    if version_flag {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    // --port オプション
    let port: u16 = noargs::opt("port")
        .short('p')
        .doc("Port to listen on")
        .default("8080")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    // --read-timeout オプション (秒)
    let read_timeout: Option<Duration> = noargs::opt("read-timeout")
        .doc("Read timeout in seconds (no timeout if omitted)")
        .take(&mut args)
        .present_and_then(|o| o.value().parse::<u64>().map(Duration::from_secs))
        .map_err(|e| format!("{:?}", e))?;

    // --allow-incomplete-head フラグ
    let allow_incomplete_head: bool = noargs::flag("allow-incomplete-head")
        .doc("Accept a request head that ends without a blank line")
        .take(&mut args)
        .is_present();

    // --max-body-size オプション (バイト)
    let max_body_size: u64 = noargs::opt("max-body-size")
        .doc("Maximum request body size in bytes")
        .default("10485760")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    // 未知の引数があればエラー、ヘルプが返されたら表示
    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        std::process::exit(0);
    }

    Ok(ServerOptions {
        port,
        read_timeout,
        allow_incomplete_head,
        max_body_size,
    })
}

fn handle_client(
    stream: TcpStream,
    reader: &HeadReader,
    read_timeout: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let peer_addr = stream.peer_addr()?;
    println!("Connection from {}", peer_addr);

    stream.set_read_timeout(read_timeout)?;
    let mut writer = stream.try_clone()?;
    let input = BufReader::new(stream);

    let (status, reason, body) = match read_request(input, reader, peer_addr) {
        Ok(body) => (200, "OK", body),
        Err(Error::Io(e)) => return Err(e.into()),
        Err(e) => {
            let (status, reason) = error_status(&e);
            tracing::info!(%peer_addr, status, "rejected request: {e}");
            (status, reason, format!("{}\n", e).into_bytes())
        }
    };

    let head = encode_head(&[
        format!("HTTP/1.1 {} {}", status, reason),
        "Content-Type: text/plain; charset=utf-8".to_string(),
        format!("Content-Length: {}", body.len()),
        "Connection: close".to_string(),
        format!("Server: http11_server/{}", env!("CARGO_PKG_VERSION")),
    ]);
    writer.write_all(&head)?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// リクエストを読んで表示し、エコー用のテキストを返す
fn read_request<R: Read>(
    input: R,
    reader: &HeadReader,
    peer_addr: SocketAddr,
) -> Result<Vec<u8>, Error> {
    let message = reader.read_head(input)?;
    let request_line = message.request_line()?;
    println!(
        "{} {} {} from {}",
        request_line.method(),
        request_line.target(),
        request_line.version().unwrap_or("-"),
        peer_addr
    );

    let mut echo = String::new();
    for line in message.head_lines() {
        echo.push_str(line);
        echo.push('\n');
    }

    let mut message = message.into_framed_with_limits(reader.limits())?;
    let body = read_body(&mut message)?;
    println!("  {} head lines, {} body bytes", message.head_lines().len(), body.len());

    if !body.is_empty() {
        echo.push_str(&format!("\nBody ({} bytes):\n", body.len()));
        match std::str::from_utf8(&body) {
            Ok(text) => echo.push_str(text),
            Err(_) => echo.push_str("[binary data]"),
        }
    }
    Ok(echo.into_bytes())
}

fn read_body<R: Read>(message: &mut Message<Body<R>>) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    message
        .body_mut()
        .read_to_end(&mut body)
        .map_err(Error::from_io)?;

    if let Body::Length(reader) = message.body()
        && let Some(missing) = reader.remaining().filter(|&n| n > 0)
    {
        tracing::warn!(missing, "connection closed before Content-Length bytes");
    }
    if let Body::Chunked(reader) = message.body_mut() {
        let trailers = reader.read_trailers()?;
        if !trailers.is_empty() {
            tracing::debug!(?trailers, "trailers");
        }
    }
    Ok(body)
}

fn error_status(e: &Error) -> (u16, &'static str) {
    match e {
        Error::HeadLineTooLong { .. } | Error::TooManyHeadLines { .. } => {
            (431, "Request Header Fields Too Large")
        }
        _ if e.category() == ErrorCategory::Limit => (413, "Content Too Large"),
        Error::UnsupportedTransferCoding(_) => (501, "Not Implemented"),
        _ if e.is_client_error() => (400, "Bad Request"),
        _ => (500, "Internal Server Error"),
    }
}
