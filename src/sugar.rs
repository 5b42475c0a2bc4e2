//! Named-binder notation for hand-written programs: `->x.` stands for the
//! lambda prefix `00`. The name is only documentation and is dropped, so
//! bodies still use de Bruijn indices.

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
  Init,
  Minus,
  Lambda,
}

/// Rewrites every `->name.` to `00`. A `-` not followed by `>` is kept, and
/// the character ending a name is kept unless it is the `.`.
pub fn desugar(source: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut state = State::Init;
  for c in source.chars() {
    state = match (state, c) {
      (State::Init, '-') => State::Minus,
      (State::Init, c) => {
        out.push(c);
        State::Init
      }
      (State::Minus, '-') => {
        out.push('-');
        State::Minus
      }
      (State::Minus, '>') => {
        out.push_str("00");
        State::Lambda
      }
      (State::Minus, c) => {
        out.push('-');
        out.push(c);
        State::Init
      }
      (State::Lambda, c) if c.is_ascii_alphabetic() => State::Lambda,
      (State::Lambda, '.') => State::Init,
      (State::Lambda, c) => {
        out.push(c);
        State::Init
      }
    };
  }
  if state == State::Minus {
    out.push('-');
  }
  out
}
