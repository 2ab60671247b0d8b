#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_http11_reader::RequestLine;

const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";

fuzz_target!(|line: &str| {
    let Ok(parsed) = RequestLine::parse(line) else {
        return;
    };

    let method = parsed.method();
    assert!(!method.is_empty());
    assert!(
        method
            .bytes()
            .all(|b| (0x21..=0x7E).contains(&b) && !SEPARATORS.contains(&b))
    );
    assert!(!method.bytes().any(|b| b.is_ascii_lowercase()));
    assert!(!parsed.target().chars().any(char::is_whitespace));

    assert_eq!(parsed.token(1).ok().flatten(), Some(method));
    assert_eq!(parsed.token(2).ok().flatten(), Some(parsed.target()));
    assert_eq!(parsed.token(3).ok().flatten(), parsed.version());
    assert!(parsed.token(0).is_err());
    assert!(parsed.token(4).is_err());

    // 受け付けた行は単一 SP 区切りで組み立て直した行と大文字小文字を除いて一致する
    let rebuilt = match parsed.version() {
        Some(version) => format!("{} {} {}", method, parsed.target(), version),
        None => format!("{} {}", method, parsed.target()),
    };
    assert!(rebuilt.eq_ignore_ascii_case(line));
    assert_eq!(RequestLine::parse(&rebuilt).ok(), Some(parsed.clone()));
});
