//! リクエストラインのパース
//!
//! `METHOD SP TARGET [SP VERSION]` を分解する。
//! METHOD は token (0x21-0x7E のうち区切り文字以外)、
//! TARGET と VERSION は空白を含まない空でない文字列。
//! 区切りはちょうど 1 つの SP で、HTAB や連続した SP、行頭と行末の空白は受け付けない。

use crate::error::Error;

use super::head::HeadLines;

/// token に使えない区切り文字
const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";

/// token 文字か確認
fn is_token_byte(b: u8) -> bool {
    (0x21..=0x7E).contains(&b) && !SEPARATORS.contains(&b)
}

/// 空でなく空白を含まないか確認
fn is_non_space_run(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

/// リクエストライン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// 大文字に正規化されたメソッド
    method: String,
    target: String,
    version: Option<String>,
}

impl RequestLine {
    /// 1 行をパース
    ///
    /// トークンの区切りは 1 つの SP のみ。
    /// 空のトークン、HTAB 区切り、行頭と行末の空白、4 つ目のトークンはエラー。
    pub fn parse(line: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidRequestLine(line.to_string());

        let (method, rest) = line.split_once(' ').ok_or_else(invalid)?;
        let (target, version) = match rest.split_once(' ') {
            Some((target, version)) => (target, Some(version)),
            None => (rest, None),
        };

        if method.is_empty() || !method.bytes().all(is_token_byte) {
            return Err(invalid());
        }
        if !is_non_space_run(target) || version.is_some_and(|v| !is_non_space_run(v)) {
            return Err(invalid());
        }

        Ok(Self {
            method: method.to_ascii_uppercase(),
            target: target.to_string(),
            version: version.map(str::to_string),
        })
    }

    /// ヘッド行の先頭行をパース
    pub fn from_head_lines(lines: &HeadLines) -> Result<Self, Error> {
        let line = lines.first().ok_or(Error::MissingRequestLine)?;
        Self::parse(line).inspect_err(|e| tracing::debug!("rejected request line: {e}"))
    }

    /// 1 始まりのインデックスでトークンを取得
    ///
    /// 1 = メソッド、2 = ターゲット、3 = バージョン。
    /// バージョンが省略されている場合は `Ok(None)` を返す。
    /// 範囲外のインデックスは `Error::TokenIndexOutOfRange`。
    pub fn token(&self, index: usize) -> Result<Option<&str>, Error> {
        match index {
            1 => Ok(Some(&self.method)),
            2 => Ok(Some(&self.target)),
            3 => Ok(self.version.as_deref()),
            _ => Err(Error::TokenIndexOutOfRange(index)),
        }
    }

    /// メソッド (大文字)
    pub fn method(&self) -> &str {
        &self.method
    }

    /// リクエストターゲット
    pub fn target(&self) -> &str {
        &self.target
    }

    /// HTTP バージョン
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
