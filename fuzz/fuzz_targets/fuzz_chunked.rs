#![no_main]

use std::io::{self, Read};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_http11_reader::{ChunkedReader, Error, PeekableReader, encode_chunk, encode_chunks};

#[derive(Arbitrary, Debug)]
struct FuzzChunked {
    chunks: Vec<Vec<u8>>,
    split_hint: u8,
    raw: Vec<u8>,
}

/// 1 回の read() で最大 `step` バイトしか返さないリーダー
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fn normalize_chunks(mut chunks: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    chunks.retain(|chunk| !chunk.is_empty());
    if chunks.len() > 64 {
        chunks.truncate(64);
    }
    chunks
}

fn decode(encoded: &[u8], step: usize) -> Result<Vec<u8>, Error> {
    let mut reader = ChunkedReader::new(Trickle {
        data: encoded,
        step,
    });
    let mut body = Vec::new();
    reader.read_to_end(&mut body).map_err(Error::from_io)?;
    Ok(body)
}

fuzz_target!(|input: FuzzChunked| {
    let chunks = normalize_chunks(input.chunks);
    let expected = chunks.concat();
    let step = (input.split_hint as usize % 32) + 1;

    let chunk_refs: Vec<&[u8]> = chunks.iter().map(|chunk| chunk.as_slice()).collect();
    let body_from_chunks = encode_chunks(&chunk_refs);

    let mut body_from_single = Vec::new();
    for chunk in &chunks {
        body_from_single.extend_from_slice(&encode_chunk(chunk));
    }
    body_from_single.extend_from_slice(&encode_chunk(&[]));

    // エンコードしたものは必ずデコードできる
    assert_eq!(decode(&body_from_chunks, step).unwrap(), expected);
    assert_eq!(decode(&body_from_single, step).unwrap(), expected);

    // 途中で切れたものは必ずエラー
    if body_from_chunks.len() > 2 {
        let cut = input.raw.len() % (body_from_chunks.len() - 2);
        assert!(matches!(
            decode(&body_from_chunks[..cut], step),
            Err(Error::TruncatedChunkedBody)
        ));
    }

    // 任意のバイト列で panic しない
    let mut reader = ChunkedReader::new(PeekableReader::new(&input.raw[..]));
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => assert!(n <= buf.len()),
        }
    }
    let _ = reader.read_trailers();
});
