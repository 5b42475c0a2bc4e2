use crate::store::Store;
use crate::term::{tapp, tlam, tvar, Term, TermPtr};

enum Step {
  Visit(TermPtr, usize),
  Lambda(TermPtr),
  Call(TermPtr),
}

/// Shifts every variable at or above `cutoff` (counted at its occurrence)
/// up by one, relocating `term` under one more binder. Subterms without
/// such variables are shared with the original.
pub fn reindex(term: TermPtr, cutoff: usize, store: &mut Store) -> TermPtr {
  store.held(&[term], |store| {
    let mut todo = vec![Step::Visit(term, cutoff)];
    let mut done: Vec<TermPtr> = Vec::new();
    while let Some(step) = todo.pop() {
      match step {
        Step::Visit(term, cutoff) => match store[term] {
          Term::Var(idx) if idx >= cutoff => done.push(tvar(idx + 1, store)),
          Term::Lambda(bod) => {
            todo.push(Step::Lambda(term));
            todo.push(Step::Visit(bod, cutoff + 1));
          }
          Term::Call(fun, arg) => {
            todo.push(Step::Call(term));
            todo.push(Step::Visit(arg, cutoff));
            todo.push(Step::Visit(fun, cutoff));
          }
          _ => done.push(term),
        },
        Step::Lambda(orig) => {
          let Some(bod) = done.pop() else { unreachable!() };
          let shifted = if Term::Lambda(bod) == store[orig] { orig } else { tlam(bod, store) };
          done.push(shifted);
        }
        Step::Call(orig) => {
          let (Some(arg), Some(fun)) = (done.pop(), done.pop()) else { unreachable!() };
          let shifted = if Term::Call(fun, arg) == store[orig] { orig } else { tapp(fun, arg, store) };
          done.push(shifted);
        }
      }
    }
    match done.pop() {
      Some(shifted) => shifted,
      None => unreachable!(),
    }
  })
}
