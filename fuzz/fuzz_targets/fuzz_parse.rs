//! Fuzz target: raw bytes into the event parser
//!
//! Feeds completely random bytes to the parser in every mode. The goal
//! is to ensure the automaton never panics on arbitrary input, whole or
//! fragmented.

#![no_main]

use h1parse::{Callbacks, Mode, Parser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for mode in [Mode::Request, Mode::Response, Mode::Auto] {
        // Whole input in one call
        let mut parser = Parser::new(mode);
        let mut callbacks = Callbacks::new();
        let _ = parser.parse(&mut callbacks, data);
        let _ = parser.finish(&mut callbacks);

        // Split input to exercise cross-fragment state
        if data.len() > 10 {
            let mut parser = Parser::new(mode);
            let mid = data.len() / 2;
            let _ = parser.parse(&mut callbacks, &data[..mid]);
            let _ = parser.parse(&mut callbacks, &data[mid..]);
            let _ = parser.finish(&mut callbacks);
        }
    }
});
