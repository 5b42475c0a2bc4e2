use std::fmt::Write;

use crate::store::Store;
use crate::term::{idx, Term, TermPtr};

enum Piece {
  Term(TermPtr),
  Text(&'static str),
}

/// Debug rendering of a term: de Bruijn indices, `λ` for abstractions,
/// parenthesised calls, and `#<...>` for runtime cells.
pub fn print_expression(store: &Store, term: TermPtr) -> String {
  let mut out = String::new();
  let mut todo = vec![Piece::Term(term)];
  while let Some(piece) = todo.pop() {
    let term = match piece {
      Piece::Text(text) => {
        out.push_str(text);
        continue;
      }
      Piece::Term(term) => term,
    };
    match store[term] {
      Term::Var(_) => out.push_str(&print_variable(store, term)),
      Term::Lambda(bod) => {
        out.push('λ');
        todo.push(Piece::Term(bod));
      }
      Term::Call(fun, arg) => {
        out.push('(');
        todo.push(Piece::Text(")"));
        todo.push(Piece::Term(arg));
        todo.push(Piece::Text(" "));
        todo.push(Piece::Term(fun));
      }
      Term::Proc(bod, _) => {
        out.push_str("#<proc λ");
        todo.push(Piece::Text(">"));
        todo.push(Piece::Term(bod));
      }
      Term::Wrap(unwrap, _) => {
        out.push_str("#<wrap ");
        todo.push(Piece::Text(">"));
        todo.push(Piece::Term(unwrap));
      }
      Term::Memoize(value, _) => {
        out.push_str("#<memo ");
        todo.push(Piece::Text(">"));
        todo.push(Piece::Term(value));
      }
      Term::Input(stream, used) => {
        let _ = write!(out, "#<{} {}>", if used { "used" } else { "input" }, stream);
      }
      Term::Output => out.push_str("#<output>"),
    }
  }
  out
}

pub fn print_variable(store: &Store, var: TermPtr) -> String {
  idx(var, store).to_string()
}
