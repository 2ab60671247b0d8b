#![no_main]

use std::io::Read;

use libfuzzer_sys::fuzz_target;
use shiguredo_http11_reader::{ByteSource, HeadReader, HttpHead, ReaderLimits};

fuzz_target!(|data: &[u8]| {
    let limits = ReaderLimits {
        max_head_line_size: 256,
        max_head_lines: 16,
        max_body_size: 1024,
        max_chunk_line_size: 64,
    };

    for allow_incomplete_head in [false, true] {
        let reader = HeadReader::with_limits(limits.clone())
            .allow_incomplete_head(allow_incomplete_head);
        let Ok(message) = reader.read_head(data) else {
            continue;
        };

        let head = message.head_lines();
        assert!(head.len() <= limits.max_head_lines);
        for line in head {
            assert!(line.len() <= limits.max_head_line_size);
            assert!(!line.contains('\r') && !line.contains('\n'));
        }

        if let Ok(request_line) = message.request_line() {
            assert!(!request_line.method().is_empty());
            assert!(!request_line.target().is_empty());
        }

        let Ok(mut message) = message.into_framed_with_limits(&limits) else {
            continue;
        };
        let declared = message.body().available();
        let mut body = Vec::new();
        let _ = message.body_mut().read_to_end(&mut body);
        assert!(declared <= data.len());
        assert!(body.len() as u64 <= limits.max_body_size);
    }
});
