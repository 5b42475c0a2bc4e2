use std::io::{self, Cursor, Read, Write};

use blc::config::{Command, Config, USAGE};
use blc::error::{BlcResult, Error};
use blc::lazy::eval_closed;
use blc::printer::print_expression;
use blc::reader::read_expression;
use blc::scott::{bits_to_string, list_to_bits};
use blc::store::Store;
use blc::sugar::desugar;
use blc::term::tinput;

fn open_program(config: &Config) -> io::Result<Box<dyn Read>> {
  let mut source: Box<dyn Read> = match &config.file {
    Some(path) => Box::new(std::fs::File::open(path)?),
    None => Box::new(io::stdin()),
  };
  if config.desugar {
    let mut text = String::new();
    source.read_to_string(&mut text)?;
    source = Box::new(Cursor::new(desugar(&text).into_bytes()));
  }
  Ok(source)
}

// Decodes and runs top-level terms until the program stream ends.
fn run(store: &mut Store, config: &Config, program: Box<dyn Read>) -> BlcResult<()> {
  let stream = store.open_input(program, config.input_mode);
  let mut rest = tinput(stream, store);
  let stdout = io::stdout();
  let base = store.depth();
  loop {
    store.pop_to(base);
    store.push(rest);
    let term = match read_expression(store, rest) {
      Ok(None) => break,
      Ok(Some((term, next))) => {
        rest = store.push(next);
        store.push(term)
      }
      Err(Error::Decode(e)) => {
        // nothing follows a truncated term
        eprintln!("{}", Error::Decode(e));
        break;
      }
      Err(e) => return Err(e),
    };
    if store.trace {
      eprintln!("[read] {}", print_expression(store, term));
    }
    let value = eval_closed(store, term)?;
    store.push(value);
    let bits = list_to_bits(store, value)?;
    store.flush_output()?;
    let mut out = stdout.lock();
    writeln!(out, "{}", bits_to_string(&bits))?;
    out.flush()?;
  }
  store.pop_to(base);
  store.flush_output()?;
  Ok(())
}

fn main() {
  let args: Vec<String> = std::env::args().skip(1).collect();
  let config = match Config::from_env().parse_args(&args) {
    Ok(Command::Run(config)) => config,
    Ok(Command::Help) => {
      println!("{}", USAGE);
      std::process::exit(0);
    }
    Err(msg) => {
      eprintln!("{}", msg);
      eprintln!("Try 'blc --help' for usage information.");
      std::process::exit(1);
    }
  };

  let program = match open_program(&config) {
    Ok(program) => program,
    Err(e) => {
      eprintln!("{}", Error::from(e));
      std::process::exit(1);
    }
  };

  let mut store = Store::with_config(&config);
  store.set_output(Box::new(io::stdout()), config.output_mode);
  if let Err(e) = run(&mut store, &config, program) {
    eprintln!("{}", e);
    std::process::exit(1);
  }
}
