#![no_main]

use libfuzzer_sys::fuzz_target;
use tdat::usage_parser::parse_usage;

fuzz_target!(|data: &[u8]| {
    let _ = parse_usage(data);
});
