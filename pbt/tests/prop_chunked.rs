//! chunked デコーダーのプロパティテスト (decoder/chunked.rs)

use std::io::{ErrorKind, Read};

use pbt::{Trickle, chunk_extension, chunks, read_step};
use proptest::prelude::*;
use shiguredo_http11_reader::{ChunkedReader, Error, encode_chunk, encode_chunks};

/// 拡張付きで chunked にエンコード
fn encode_with_extensions(chunks: &[Vec<u8>], extensions: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let ext = extensions.get(i).map(String::as_str).unwrap_or("");
        buf.extend_from_slice(format!("{:X}{}\r\n", chunk.len(), ext).as_bytes());
        buf.extend_from_slice(chunk);
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"0\r\n\r\n");
    buf
}

// ========================================
// デコード結果
// ========================================

proptest! {
    #[test]
    fn prop_decodes_concatenation(chunks in chunks(), step in read_step()) {
        let refs: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        let encoded = encode_chunks(&refs);

        let mut reader = ChunkedReader::new(Trickle::new(&encoded, step));
        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();

        prop_assert_eq!(body, chunks.concat());
        prop_assert!(reader.is_done());
    }

    #[test]
    fn prop_reads_never_cross_chunk_boundary(chunks in chunks(), buf_len in 1usize..128) {
        let refs: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        let encoded = encode_chunks(&refs);

        let mut reader = ChunkedReader::new(&encoded[..]);
        let mut buf = vec![0u8; buf_len];
        for chunk in &chunks {
            let mut left = chunk.len();
            while left > 0 {
                let n = reader.read(&mut buf).unwrap();
                prop_assert!(n > 0);
                prop_assert!(n <= left);
                left -= n;
            }
        }
        prop_assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn prop_extensions_are_ignored(
        chunks in chunks(),
        extensions in proptest::collection::vec(chunk_extension(), 8),
    ) {
        let encoded = encode_with_extensions(&chunks, &extensions);
        let mut body = Vec::new();
        ChunkedReader::new(&encoded[..]).read_to_end(&mut body).unwrap();
        prop_assert_eq!(body, chunks.concat());
    }

    #[test]
    fn prop_read_byte_matches_read(chunks in chunks()) {
        let refs: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        let encoded = encode_chunks(&refs);

        let mut reader = ChunkedReader::new(&encoded[..]);
        let mut body = Vec::new();
        while let Some(b) = reader.read_byte().unwrap() {
            body.push(b);
        }
        prop_assert_eq!(body, chunks.concat());
    }

    #[test]
    fn prop_single_chunk(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let mut encoded = encode_chunk(&data);
        encoded.extend_from_slice(&encode_chunk(&[]));
        let mut body = Vec::new();
        ChunkedReader::new(&encoded[..]).read_to_end(&mut body).unwrap();
        prop_assert_eq!(body, data);
    }
}

// ========================================
// 途中で切れた入力
// ========================================

proptest! {
    #[test]
    fn prop_truncation_is_error(chunks in chunks(), cut in any::<prop::sample::Index>()) {
        let refs: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        let encoded = encode_chunks(&refs);
        // 終端チャンクの "0\r\n" まで含めば完了とみなされる
        let complete_at = encoded.len() - 2;
        let cut = cut.index(complete_at);

        let mut reader = ChunkedReader::new(&encoded[..cut]);
        let mut body = Vec::new();
        let err = reader.read_to_end(&mut body).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        prop_assert!(matches!(Error::from_io(err), Error::TruncatedChunkedBody));
        prop_assert!(chunks.concat().starts_with(&body));
    }
}

// ========================================
// 不正なチャンクサイズ
// ========================================

proptest! {
    #[test]
    fn prop_non_hex_size_is_error(size in "[g-zG-Z]{1,8}") {
        let input = format!("{}\r\n", size);
        let mut reader = ChunkedReader::new(input.as_bytes());
        let err = Error::from_io(reader.read(&mut [0u8; 8]).unwrap_err());
        prop_assert!(matches!(err, Error::InvalidChunkSize(ref s) if *s == size));
    }

    #[test]
    fn prop_hex_size_case_insensitive(data in proptest::collection::vec(any::<u8>(), 10..512)) {
        let mut decoded = Vec::new();
        for size in [format!("{:x}", data.len()), format!("{:X}", data.len())] {
            let mut input = format!("{}\r\n", size).into_bytes();
            input.extend_from_slice(&data);
            input.extend_from_slice(b"\r\n0\r\n\r\n");
            let mut body = Vec::new();
            ChunkedReader::new(&input[..]).read_to_end(&mut body).unwrap();
            decoded.push(body);
        }
        prop_assert_eq!(&decoded[0], &data);
        prop_assert_eq!(&decoded[1], &data);
    }
}
