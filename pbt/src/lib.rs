//! PBT テスト共通ユーティリティ

use std::io::{self, Read};

use proptest::prelude::*;

// ========================================
// リクエストライン生成
// ========================================

/// token 文字 (区切り文字を含まない可視文字)
pub fn token_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        prop::sample::select(vec!['!', '#', '$', '%', '&', '\'', '*', '+', '-', '.', '^', '_', '`', '|', '~']),
    ]
}

/// メソッド (token)
pub fn method() -> impl Strategy<Value = String> {
    proptest::collection::vec(token_char(), 1..=16).prop_map(|chars| chars.into_iter().collect())
}

/// リクエストターゲット
pub fn request_target() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/".to_string()),
        Just("*".to_string()),
        "/[a-zA-Z0-9/_.?=&%-]{1,64}".prop_map(|s| s),
        "http://[a-z]{1,16}\\.example/[a-z0-9]{0,16}".prop_map(|s| s),
    ]
}

/// HTTP バージョン
pub fn http_version() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("HTTP/1.0".to_string()),
        Just("HTTP/1.1".to_string()),
        "HTTP/[0-9]\\.[0-9]".prop_map(|s| s),
    ]
}

/// 区切りとして受け付けない空白 (HTAB を含むか、SP が 2 つ以上)
pub fn invalid_separator() -> impl Strategy<Value = String> {
    prop_oneof!["[ \t]{0,3}\t[ \t]{0,3}", " {2,4}"]
}

// ========================================
// ヘッド行生成
// ========================================

/// ヘッダー名
pub fn header_name() -> impl Strategy<Value = String> {
    "X-[A-Za-z0-9-]{1,16}".prop_map(|s| s)
}

/// ヘッダー値 (CR / LF を含まない)
pub fn header_value() -> impl Strategy<Value = String> {
    "[ -~]{0,64}".prop_map(|s| s)
}

/// `name: value` 形式のヘッダー行
pub fn header_line() -> impl Strategy<Value = String> {
    (header_name(), header_value()).prop_map(|(name, value)| format!("{}: {}", name, value))
}

// ========================================
// ボディ生成
// ========================================

/// ボディ
pub fn body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..512)
}

/// chunked の各チャンク (空のチャンクは終端と区別できないので含まない)
pub fn chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..64), 0..8)
}

/// チャンク拡張 (`;name=value` または引用符付きの値)
pub fn chunk_extension() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,8}".prop_map(|name| format!(";{}", name)),
        ("[a-z]{1,8}", "[a-z0-9]{1,8}").prop_map(|(n, v)| format!(";{}={}", n, v)),
        ("[a-z]{1,8}", "[a-z;= ]{0,8}").prop_map(|(n, v)| format!(";{}=\"{}\"", n, v)),
    ]
}

/// 1 回の read() で返すバイト数
pub fn read_step() -> impl Strategy<Value = usize> {
    1usize..=17
}

// ========================================
// テスト用リーダー
// ========================================

/// 1 回の read() で最大 `step` バイトしか返さないリーダー
#[derive(Debug)]
pub struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl<'a> Trickle<'a> {
    /// 新しいリーダーを作成
    pub fn new(data: &'a [u8], step: usize) -> Self {
        Self {
            data,
            step: step.max(1),
        }
    }

    /// 未読のデータ
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
