use tailcall::trampoline;

use crate::error::BlcResult;
use crate::store::Store;
use crate::stream::read_input;
use crate::term::{as_pair, tapp, tpair, tproc_stack, twrap, Term, TermPtr};

macro_rules! fault {
  ($($arg:tt)*) => {
    panic!("fault: {}", format_args!($($arg)*))
  };
}

/// Argument thunks waiting for a closure, innermost last.
pub type Args = Vec<TermPtr>;

pub type Continuation = Option<Box<Node>>;

pub enum Node {
  APPLY(Args, Continuation),
  UPDATE(TermPtr, Continuation),
  EMIT(Args, Continuation),
}

type State<'a> = (&'a mut Store, TermPtr, TermPtr, Args, Continuation);
type Next<'a> = trampoline::Next<State<'a>, BlcResult<TermPtr>>;

/// The thunk at de Bruijn index `idx` of a Scott-list environment.
#[inline(always)]
fn lookup(store: &Store, mut env: TermPtr, idx: usize) -> TermPtr {
  for depth in 0..=idx {
    match as_pair(env, store) {
      Some((head, _)) if depth == idx => return head,
      Some((_, tail)) => env = tail,
      None => fault!("free variable {} in an environment of {} entries", idx, depth),
    }
  }
  unreachable!()
}

#[inline(always)]
fn cont_or_ret<'a>(store: &'a mut Store, mut val: TermPtr, mut cont: Continuation) -> Next<'a> {
  loop {
    match cont {
      None => return trampoline::Finish(Ok(val)),
      Some(ptr) => match *ptr {
        Node::UPDATE(thunk, new_cont) => {
          store.update(thunk, val);
          cont = new_cont;
        }
        Node::APPLY(mut args, new_cont) => {
          let Some(arg) = args.pop() else {
            cont = new_cont;
            continue;
          };
          let cell = store[val];
          match cell {
            Term::Proc(bod, stack) => {
              let env = tpair(arg, stack, store);
              return trampoline::Recurse((store, bod, env, args, new_cont));
            }
            Term::Output => {
              // select between the canonical booleans to learn the bit
              let (t, f) = (store.t(), store.f());
              let sel = tapp(arg, t, store);
              let choice = tapp(sel, f, store);
              let cont = Some(Box::new(Node::EMIT(args, new_cont)));
              return trampoline::Recurse((store, choice, f, vec![], cont));
            }
            other => fault!("cannot apply a {}", other.kind().name()),
          }
        }
        Node::EMIT(args, new_cont) => {
          let bit = match store[val] {
            Term::Proc(bod, _) if bod == store.t_body() => true,
            Term::Proc(bod, _) if bod == store.f_body() => false,
            other => fault!("output of a {} that is not a bit", other.kind().name()),
          };
          if let Err(e) = store.emit(bit) {
            return trampoline::Finish(Err(e));
          }
          val = store.output();
          cont = Some(Box::new(Node::APPLY(args, new_cont)));
        }
      },
    }
  }
}

#[inline(always)]
pub fn force<'a>(store: &'a mut Store, thunk: TermPtr, mut cont: Continuation) -> Next<'a> {
  let cell = store[thunk];
  match cell {
    Term::Memoize(val, _) => cont_or_ret(store, val, cont),
    Term::Wrap(term, context) => {
      if store.trace {
        eprintln!("[force] thunk {} ({} cells)", thunk, store.cells());
      }
      cont = Some(Box::new(Node::UPDATE(thunk, cont)));
      trampoline::Recurse((store, term, context, vec![], cont))
    }
    Term::Input(_, true) => fault!("input position {} was already consumed", thunk),
    Term::Input(stream, false) => match read_input(stream, store) {
      Ok(list) => {
        let empty = store.f();
        cont = Some(Box::new(Node::UPDATE(thunk, cont)));
        trampoline::Recurse((store, list, empty, vec![], cont))
      }
      Err(e) => trampoline::Finish(Err(e)),
    },
    Term::Proc(..) | Term::Output => cont_or_ret(store, thunk, cont),
    // bare syntax in an environment slot is a closed term
    Term::Var(_) | Term::Lambda(_) | Term::Call(..) => {
      let empty = store.f();
      trampoline::Recurse((store, thunk, empty, vec![], cont))
    }
  }
}

// Every handle the evaluator holds outside the arena, for compaction.
fn compact(
  store: &mut Store,
  term: &mut TermPtr,
  env: &mut TermPtr,
  args: &mut Args,
  cont: &mut Continuation,
) {
  let mut live: Vec<&mut TermPtr> = vec![term, env];
  live.extend(args.iter_mut());
  let mut node = cont.as_deref_mut();
  while let Some(next) = node {
    node = match next {
      Node::APPLY(args, cont) | Node::EMIT(args, cont) => {
        live.extend(args.iter_mut());
        cont.as_deref_mut()
      }
      Node::UPDATE(thunk, cont) => {
        live.push(thunk);
        cont.as_deref_mut()
      }
    };
  }
  store.compact(&mut live);
}

pub fn eval_step<'a>((store, mut term, mut env, mut args, mut cont): State<'a>) -> Next<'a> {
  if store.wants_compact() {
    compact(store, &mut term, &mut env, &mut args, &mut cont);
  }
  let cell = store[term];
  match cell {
    Term::Call(fun, arg) => {
      let thunk = twrap(arg, env, store);
      args.push(thunk);
      trampoline::Recurse((store, fun, env, args, cont))
    }
    Term::Lambda(bod) => match args.pop() {
      Some(arg) => {
        let env = tpair(arg, env, store);
        trampoline::Recurse((store, bod, env, args, cont))
      }
      None => {
        let val = tproc_stack(bod, env, store);
        cont_or_ret(store, val, cont)
      }
    },
    Term::Var(idx) => {
      let thunk = lookup(store, env, idx);
      if !args.is_empty() {
        cont = Some(Box::new(Node::APPLY(args, cont)));
      }
      force(store, thunk, cont)
    }
    Term::Proc(..) | Term::Output => {
      cont = Some(Box::new(Node::APPLY(args, cont)));
      cont_or_ret(store, term, cont)
    }
    Term::Wrap(..) | Term::Memoize(..) | Term::Input(..) => {
      if !args.is_empty() {
        cont = Some(Box::new(Node::APPLY(args, cont)));
      }
      force(store, term, cont)
    }
  }
}

/// Reduces `term` under `env` to weak head normal form: a closure, or the
/// output sentinel. Only I/O failures come back as errors; applying
/// something that is not a function is a fault and panics.
pub fn eval(store: &mut Store, term: TermPtr, env: TermPtr) -> BlcResult<TermPtr> {
  store.held(&[term, env], |store| {
    let opened = store.open_region();
    let result = trampoline::run(eval_step, (&mut *store, term, env, vec![], None));
    store.close_region(opened);
    result
  })
}

/// Evaluates a closed term.
pub fn eval_closed(store: &mut Store, term: TermPtr) -> BlcResult<TermPtr> {
  let empty = store.f();
  eval(store, term, empty)
}
