//! Lists the entries of an ICNS, ICO or PNG file.
//!
//! ```shell
//! cargo run --example icondump <path/to/file>
//! ```

extern crate iconvert;

use std::env;
use std::process;

fn main() {
    if env::args().count() != 2 {
        println!("Usage: icondump <path>");
        return;
    }
    let path = env::args().nth(1).unwrap();
    match iconvert::open(&path) {
        Ok(container) => print!("{}", container.summary()),
        Err(error) => {
            eprintln!("icondump: {}: {}", path, error);
            process::exit(1);
        }
    }
}
