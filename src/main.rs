use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};

use crate::dispatch::Engine;
use crate::runtime::interp::Interpreter;
use crate::runtime::introspect;

mod ast;
mod dispatch;
mod frame;
mod lexer;
mod parser;
mod runtime;
mod source;
mod token;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let engine = Rc::new(Engine::new());
    let mut interpreter = Interpreter::new(engine);
    introspect::install(&mut interpreter);

    let output = if let Some(path) = input_path {
        interpreter.run_path(Path::new(&path))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        interpreter.run_source("<stdin>", &buffer)?
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
