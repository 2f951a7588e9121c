#![no_main]

use libfuzzer_sys::fuzz_target;
use tdat::dump_parser::{parse_dump, parse_dump_str};

fuzz_target!(|data: &[u8]| {
    // Any bytes must parse without panicking
    let threads = parse_dump(data).expect("in-memory reader cannot fail");

    // Valid UTF-8 must give the same result through both entry points
    if let Ok(text) = std::str::from_utf8(data) {
        if !text.contains('\r') {
            assert_eq!(threads, parse_dump_str(text));
        }
    }
});
