use crate::store::Store;
use crate::term::{Term, TermPtr};

/// Structural equality of two terms.
///
/// Closures compare by their term only, ignoring the captured stack, and
/// memo cells compare their target thunk by identity.
pub fn equal(a: TermPtr, b: TermPtr, store: &Store) -> bool {
  let mut todo = vec![(a, b)];
  while let Some((a, b)) = todo.pop() {
    if a == b {
      continue;
    }
    match (store[a], store[b]) {
      (Term::Var(i), Term::Var(j)) => {
        if i != j {
          return false;
        }
      }
      (Term::Lambda(x), Term::Lambda(y)) => todo.push((x, y)),
      (Term::Call(f, x), Term::Call(g, y)) => {
        todo.push((x, y));
        todo.push((f, g));
      }
      (Term::Proc(x, _), Term::Proc(y, _)) => todo.push((x, y)),
      (Term::Wrap(x, c), Term::Wrap(y, d)) => {
        todo.push((c, d));
        todo.push((x, y));
      }
      (Term::Memoize(v, t), Term::Memoize(w, u)) => {
        if t != u {
          return false;
        }
        todo.push((v, w));
      }
      (Term::Input(s, used), Term::Input(t, other)) => {
        if s != t || used != other {
          return false;
        }
      }
      (Term::Output, Term::Output) => (),
      _ => return false,
    }
  }
  true
}
