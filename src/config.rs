use crate::stream::BitMode;

pub const USAGE: &str = "\
Usage: blc [OPTIONS]

Reads binary lambda calculus terms from standard input (or --file), one
after another, evaluates each as a list of bits and prints the bits.

Options:
  --file <path>      Read the program from a file instead of stdin
  --text             Program bits are ASCII 0/1 digits (default)
  --binary           Program bits are packed eight to a byte
  --binary-output    Pack bits written through OUTPUT into bytes
  --desugar          Accept ->x. as the lambda prefix (text mode only)
  --trace            Log forced thunks and stream traffic to stderr
  --help, -h         Show this help message

Environment variables:
  BLC_TRACE=1        Same as --trace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub trace: bool,
  /// How program bits are read.
  pub input_mode: BitMode,
  /// How bits applied to OUTPUT are written.
  pub output_mode: BitMode,
  pub desugar: bool,
  pub file: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      trace: false,
      input_mode: BitMode::Text,
      output_mode: BitMode::Text,
      desugar: false,
      file: None,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
  Run(Config),
  Help,
}

impl Config {
  /// Defaults, then the environment.
  pub fn from_env() -> Self {
    let mut config = Config::default();
    if std::env::var("BLC_TRACE").map(|v| v == "1").unwrap_or(false) {
      config.trace = true;
    }
    config
  }

  /// Applies command-line flags (without the program name) on top of
  /// `self`.
  pub fn parse_args(mut self, args: &[String]) -> Result<Command, String> {
    let mut i = 0;
    while i < args.len() {
      match args[i].as_str() {
        "--file" => {
          let Some(path) = args.get(i + 1) else {
            return Err("--file requires a path".to_string());
          };
          self.file = Some(path.clone());
          i += 1;
        }
        "--text" => self.input_mode = BitMode::Text,
        "--binary" => self.input_mode = BitMode::Binary,
        "--binary-output" => self.output_mode = BitMode::Binary,
        "--desugar" => self.desugar = true,
        "--trace" => self.trace = true,
        "--help" | "-h" => return Ok(Command::Help),
        other => return Err(format!("Unknown argument: {}", other)),
      }
      i += 1;
    }
    if self.desugar && self.input_mode == BitMode::Binary {
      return Err("--desugar only applies to text input".to_string());
    }
    Ok(Command::Run(self))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn flags_override_defaults() {
    let cmd = Config::default()
      .parse_args(&args(&["--binary", "--binary-output", "--trace", "--file", "prog.blc"]))
      .unwrap();
    let Command::Run(config) = cmd else { panic!("expected a run") };
    assert_eq!(config.input_mode, BitMode::Binary);
    assert_eq!(config.output_mode, BitMode::Binary);
    assert!(config.trace);
    assert!(!config.desugar);
    assert_eq!(config.file.as_deref(), Some("prog.blc"));
  }

  #[test]
  fn help_and_errors() {
    assert_eq!(Config::default().parse_args(&args(&["-h"])), Ok(Command::Help));
    assert!(Config::default().parse_args(&args(&["--bogus"])).is_err());
    assert!(Config::default().parse_args(&args(&["--file"])).is_err());
    assert!(Config::default().parse_args(&args(&["--binary", "--desugar"])).is_err());
  }

  #[test]
  fn no_flags_keeps_the_defaults() {
    assert_eq!(Config::default().parse_args(&[]), Ok(Command::Run(Config::default())));
  }
}
