//! Converts an icon file into another container format.
//!
//! ```shell
//! cargo run --example iconcopy <kind> <source> <target> [<selector>]
//! ```
//!
//! Where <kind> is `icns`, `ico` or `png` (or `apple`, `microsoft`,
//! `raster`), and <selector> optionally overrides single entries, for
//! example `0=png;3=*` writes entry 0 as PNG and leaves entry 3 out.

extern crate iconvert;

use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args.len() > 5 {
        println!("Usage: iconcopy <kind> <source> <target> [<selector>]");
        return;
    }
    let selector = args.get(4).map(String::as_str);
    let result = iconvert::open(&args[2])
        .and_then(|mut source| iconvert::create(&args[1], &args[3], &mut source, selector));
    match result {
        Ok(created) => print!("{}", created.summary()),
        Err(error) => {
            eprintln!("iconcopy: {}", error);
            process::exit(1);
        }
    }
}
