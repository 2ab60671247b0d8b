//! HTTP/1.x リクエストのデコーダーモジュール
//!
//! ブロッキングな `std::io::Read` からヘッド行を読み、残りのストリームを
//! ボディとして返す。ボディは宣言された長さまたは chunked で区切る。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_http11_reader::{Body, HeadReader, HttpHead};
//! use std::io::Read;
//!
//! let input = &b"POST /echo HTTP/1.1\r\n\
//!     Host: example.com\r\n\
//!     Transfer-Encoding: chunked\r\n\
//!     \r\n\
//!     5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"[..];
//!
//! // ヘッドを読む
//! let message = HeadReader::new().read_head(input).unwrap();
//! let request_line = message.request_line().unwrap();
//! assert_eq!(request_line.method(), "POST");
//! assert_eq!(request_line.target(), "/echo");
//! assert_eq!(message.get_header("host"), Some("example.com"));
//!
//! // ボディをフレーミングして読む
//! let mut message = message.into_framed().unwrap();
//! assert!(matches!(message.body(), Body::Chunked(_)));
//! let mut body = String::new();
//! message.body_mut().read_to_string(&mut body).unwrap();
//! assert_eq!(body, "hello world");
//! ```

mod body;
mod chunked;
mod head;
mod length;
mod message;
mod phase;
mod request_line;

pub use body::{Body, BodyKind, split_header_line};
pub use chunked::ChunkedReader;
pub use head::{HeadLines, HeadReader, HttpHead};
pub use length::LengthLimitedReader;
pub use message::Message;
pub use request_line::RequestLine;
