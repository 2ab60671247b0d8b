//! ヘッド行とボディストリームの組
//!
//! [`Message`] はヘッド行とボディストリームだけを持つ。
//! ボディの変換はメッセージを 1 つ受け取って同じ形のメッセージを返す。

use std::cell::OnceCell;
use std::io::Read;

use crate::error::Error;
use crate::limits::ReaderLimits;
use crate::source::PeekableReader;

use super::body::{Body, BodyKind};
use super::chunked::ChunkedReader;
use super::head::{HeadLines, HttpHead};
use super::length::LengthLimitedReader;
use super::request_line::RequestLine;

/// HTTP メッセージ
///
/// ```rust
/// use shiguredo_http11_reader::{HeadReader, HttpHead};
/// use std::io::Read;
///
/// let input = &b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloNEXT"[..];
/// let message = HeadReader::new().read_head(input).unwrap();
/// assert_eq!(message.request_line().unwrap().method(), "POST");
///
/// let mut message = message.into_framed().unwrap();
/// let mut body = String::new();
/// message.body_mut().read_to_string(&mut body).unwrap();
/// assert_eq!(body, "hello");
/// ```
#[derive(Debug)]
pub struct Message<B> {
    head: HeadLines,
    body: B,
    request_line: OnceCell<RequestLine>,
}

impl<B> Message<B> {
    /// ヘッド行とボディからメッセージを作成
    pub fn new(head: HeadLines, body: B) -> Self {
        Self {
            head,
            body,
            request_line: OnceCell::new(),
        }
    }

    /// リクエストラインを取得
    ///
    /// 初回呼び出し時に先頭行をパースし、以降は同じ結果を返す。
    /// パースに失敗した場合はキャッシュせず、呼び出すたびにエラーを返す。
    pub fn request_line(&self) -> Result<&RequestLine, Error> {
        if let Some(line) = self.request_line.get() {
            return Ok(line);
        }
        let line = RequestLine::from_head_lines(&self.head)?;
        Ok(self.request_line.get_or_init(|| line))
    }

    /// ボディへの参照を取得
    pub fn body(&self) -> &B {
        &self.body
    }

    /// ボディへの可変参照を取得
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// ボディを取り出す
    pub fn into_body(self) -> B {
        self.body
    }

    /// ヘッド行とボディに分解する
    pub fn into_parts(self) -> (HeadLines, B) {
        (self.head, self.body)
    }

    /// ボディを変換する
    ///
    /// ヘッド行とパース済みのリクエストラインは引き継ぐ。
    pub fn map_body<C, F>(self, f: F) -> Message<C>
    where
        F: FnOnce(B) -> C,
    {
        Message {
            head: self.head,
            body: f(self.body),
            request_line: self.request_line,
        }
    }
}

impl<B: Read> Message<B> {
    /// ボディを `n` バイトで打ち切る
    pub fn limit_length(self, n: u64) -> Message<LengthLimitedReader<B>> {
        self.map_body(|body| LengthLimitedReader::new(body, n))
    }

    /// ボディを chunked としてデコードする
    pub fn chunked(self) -> Message<ChunkedReader<B>> {
        self.chunked_with_limits(&ReaderLimits::default())
    }

    /// 制限付きでボディを chunked としてデコードする
    pub fn chunked_with_limits(self, limits: &ReaderLimits) -> Message<ChunkedReader<B>> {
        let limits = limits.clone();
        self.map_body(|body| ChunkedReader::with_limits(body, limits))
    }

    /// ボディに 1 バイトの先読みを付ける
    pub fn peekable(self) -> Message<PeekableReader<B>> {
        self.map_body(PeekableReader::new)
    }

    /// ヘッド行に従ってボディをフレーミングする
    pub fn into_framed(self) -> Result<Message<Body<B>>, Error> {
        self.into_framed_with_limits(&ReaderLimits::default())
    }

    /// 制限付きでヘッド行に従ってボディをフレーミングする
    pub fn into_framed_with_limits(self, limits: &ReaderLimits) -> Result<Message<Body<B>>, Error> {
        let kind = BodyKind::from_head_lines(&self.head)?;
        let Message {
            head,
            body,
            request_line,
        } = self;
        Ok(Message {
            head,
            body: Body::new(body, kind, limits)?,
            request_line,
        })
    }
}

impl<B> HttpHead for Message<B> {
    fn head_lines(&self) -> &HeadLines {
        &self.head
    }
}
