//! エンコーダー
//!
//! リーダーが読む形式のバイト列を組み立てる。

/// 16 進数の桁 (小文字)
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// チャンクサイズを 16 進数で書き込む
fn push_hex(buf: &mut Vec<u8>, value: usize) {
    let mut digits = [0u8; 2 * std::mem::size_of::<usize>()];
    let mut pos = digits.len();
    let mut value = value;
    loop {
        pos -= 1;
        digits[pos] = HEX_DIGITS[value & 0xF];
        value >>= 4;
        if value == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[pos..]);
}

/// チャンクを 1 つ追加する
fn push_chunk(buf: &mut Vec<u8>, data: &[u8]) {
    push_hex(buf, data.len());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Chunked Transfer Encoding 用のチャンクをエンコード
///
/// 空のデータを渡すと終端チャンク (`0\r\n\r\n`) を生成する。
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return b"0\r\n\r\n".to_vec();
    }
    let mut buf = Vec::with_capacity(data.len() + 20);
    push_chunk(&mut buf, data);
    buf
}

/// 複数のデータを chunked 形式でエンコード
///
/// 空のデータは終端チャンクと区別できないため読み飛ばす。
/// 最後に終端チャンクを追加する。
pub fn encode_chunks(chunks: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    for chunk in chunks.iter().filter(|c| !c.is_empty()) {
        push_chunk(&mut buf, chunk);
    }
    buf.extend_from_slice(b"0\r\n\r\n");
    buf
}

/// ヘッド行をエンコード
///
/// 各行に CRLF を付け、最後に空行を追加する。
pub fn encode_head<S: AsRef<str>>(lines: &[S]) -> Vec<u8> {
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(line.as_ref().as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");
    buf
}
