//! # shiguredo_http11_reader
//!
//! ブロッキング I/O 用の HTTP/1.x リクエストリーダー
//!
//! ## 特徴
//!
//! - **ブロッキング I/O**: `std::io::Read` を 1 バイトずつ読み、ヘッドの後ろは読み過ぎない
//! - **ボディのフレーミング**: Content-Length による打ち切りと chunked のデコード
//! - **合成**: ボディの変換はメッセージを受け取って同じ形のメッセージを返す
//!
//! ヘッダーマップの構築、レスポンスの組み立て、圧縮は扱わない。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_http11_reader::{Error, HeadReader, HttpHead};
//! use std::io::Read;
//!
//! fn handle(stream: impl Read) -> Result<Vec<u8>, Error> {
//!     let message = HeadReader::new().read_head(stream)?;
//!     let method = message.request_line()?.method().to_string();
//!     assert_eq!(method, "PUT");
//!
//!     let mut body = Vec::new();
//!     message
//!         .into_framed()?
//!         .body_mut()
//!         .read_to_end(&mut body)
//!         .map_err(Error::from_io)?;
//!     Ok(body)
//! }
//!
//! let body = handle(&b"PUT /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc"[..]).unwrap();
//! assert_eq!(body, b"abc");
//! ```

mod decoder;
mod encoder;
mod error;
mod limits;
mod source;

pub use decoder::{
    Body, BodyKind, ChunkedReader, HeadLines, HeadReader, HttpHead, LengthLimitedReader, Message,
    RequestLine, split_header_line,
};
pub use encoder::{encode_chunk, encode_chunks, encode_head};
pub use error::{Error, ErrorCategory};
pub use limits::ReaderLimits;
pub use source::{ByteSource, PeekableReader};
