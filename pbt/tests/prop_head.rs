//! ヘッド読み取りのプロパティテスト (decoder/head.rs, decoder/body.rs)

use std::io::Read;

use pbt::{Trickle, body, header_line, read_step};
use proptest::prelude::*;
use shiguredo_http11_reader::{Body, Error, HeadReader, HttpHead};

proptest! {
    #[test]
    fn prop_lines_and_residual_body(
        lines in proptest::collection::vec(header_line(), 0..16),
        rest in body(),
        step in read_step(),
    ) {
        let mut input = b"GET / HTTP/1.1\r\n".to_vec();
        for line in &lines {
            input.extend_from_slice(line.as_bytes());
            input.extend_from_slice(b"\r\n");
        }
        input.extend_from_slice(b"\r\n");
        input.extend_from_slice(&rest);

        let mut message = HeadReader::new().read_head(Trickle::new(&input, step)).unwrap();
        prop_assert_eq!(message.head_lines().len(), lines.len() + 1);
        prop_assert_eq!(message.head_lines().header_lines(), &lines[..]);

        // 空行の直後から先は読まれていない
        prop_assert_eq!(message.body().remaining(), &rest[..]);
        let mut residual = Vec::new();
        message.body_mut().read_to_end(&mut residual).unwrap();
        prop_assert_eq!(residual, rest);
    }

    #[test]
    fn prop_strict_head_requires_blank_line(
        lines in proptest::collection::vec(header_line(), 0..8),
    ) {
        let mut input = b"GET / HTTP/1.1\r\n".to_vec();
        for line in &lines {
            input.extend_from_slice(line.as_bytes());
            input.extend_from_slice(b"\r\n");
        }

        let err = HeadReader::new().read_head(&input[..]).unwrap_err();
        prop_assert!(matches!(err, Error::IncompleteHead { lines: n } if n == lines.len() + 1));

        let message = HeadReader::new()
            .allow_incomplete_head(true)
            .read_head(&input[..])
            .unwrap();
        prop_assert_eq!(message.head_lines().len(), lines.len() + 1);
    }

    #[test]
    fn prop_content_length_framing(data in body(), trailing in body()) {
        let mut input = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", data.len()).into_bytes();
        input.extend_from_slice(&data);
        input.extend_from_slice(&trailing);

        let mut message = HeadReader::new().read_head(&input[..]).unwrap().into_framed().unwrap();
        prop_assert!(matches!(message.body(), Body::Length(_)));
        let mut out = Vec::new();
        message.body_mut().read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, data);
        prop_assert_eq!(message.into_body().into_inner(), &trailing[..]);
    }
}
