use crate::store::Store;
use crate::stream::StreamPtr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
  Var(usize),
  Lambda(TermPtr),
  Call(TermPtr, TermPtr),
  // lambda body, captured stack
  Proc(TermPtr, TermPtr),
  // unevaluated term, context it closes over
  Wrap(TermPtr, TermPtr),
  // cached value, the thunk it replaces
  Memoize(TermPtr, TermPtr),
  Input(StreamPtr, bool),
  Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  Var,
  Lambda,
  Call,
  Proc,
  Wrap,
  Memoize,
  Input,
  Output,
}

pub type TermPtr = usize;

impl Term {
  pub fn kind(&self) -> Kind {
    match self {
      Term::Var(_) => Kind::Var,
      Term::Lambda(_) => Kind::Lambda,
      Term::Call(..) => Kind::Call,
      Term::Proc(..) => Kind::Proc,
      Term::Wrap(..) => Kind::Wrap,
      Term::Memoize(..) => Kind::Memoize,
      Term::Input(..) => Kind::Input,
      Term::Output => Kind::Output,
    }
  }

  /// The same cell with every handle it holds passed through `f`.
  #[inline(always)]
  pub fn map(self, f: impl Fn(TermPtr) -> TermPtr) -> Term {
    match self {
      Term::Lambda(bod) => Term::Lambda(f(bod)),
      Term::Call(a, b) => Term::Call(f(a), f(b)),
      Term::Proc(a, b) => Term::Proc(f(a), f(b)),
      Term::Wrap(a, b) => Term::Wrap(f(a), f(b)),
      Term::Memoize(a, b) => Term::Memoize(f(a), f(b)),
      Term::Var(_) | Term::Input(..) | Term::Output => self,
    }
  }
}

impl Kind {
  pub fn name(self) -> &'static str {
    match self {
      Kind::Var => "VAR",
      Kind::Lambda => "LAMBDA",
      Kind::Call => "CALL",
      Kind::Proc => "PROC",
      Kind::Wrap => "WRAP",
      Kind::Memoize => "MEMOIZE",
      Kind::Input => "INPUT",
      Kind::Output => "OUTPUT",
    }
  }
}

/// Allocates a zero-initialized cell of the given kind.
pub fn cell(kind: Kind, store: &mut Store) -> TermPtr {
  let term = match kind {
    Kind::Var => Term::Var(0),
    Kind::Lambda => Term::Lambda(0),
    Kind::Call => Term::Call(0, 0),
    Kind::Proc => Term::Proc(0, 0),
    Kind::Wrap => Term::Wrap(0, 0),
    Kind::Memoize => Term::Memoize(0, 0),
    Kind::Input => Term::Input(0, false),
    Kind::Output => return store.output(),
  };
  store.alloc(term)
}

// Every constructor roots its operands before allocating, so callers only
// have to protect values they hold across more than one allocation.

#[inline(always)]
pub fn tvar(idx: usize, store: &mut Store) -> TermPtr {
  store.alloc(Term::Var(idx))
}
#[inline(always)]
pub fn tlam(bod: TermPtr, store: &mut Store) -> TermPtr {
  store.push(bod);
  let term = store.alloc(Term::Lambda(bod));
  store.pop(1);
  term
}
#[inline(always)]
pub fn tapp(fun: TermPtr, arg: TermPtr, store: &mut Store) -> TermPtr {
  store.push(fun);
  store.push(arg);
  let term = store.alloc(Term::Call(fun, arg));
  store.pop(2);
  term
}
#[inline(always)]
pub fn tproc(term: TermPtr, store: &mut Store) -> TermPtr {
  let empty = store.f();
  tproc_stack(term, empty, store)
}
#[inline(always)]
pub fn tproc_stack(term: TermPtr, stack: TermPtr, store: &mut Store) -> TermPtr {
  store.push(term);
  store.push(stack);
  let proc = store.alloc(Term::Proc(term, stack));
  store.pop(2);
  proc
}
#[inline(always)]
pub fn twrap(term: TermPtr, context: TermPtr, store: &mut Store) -> TermPtr {
  store.push(term);
  store.push(context);
  let wrap = store.alloc(Term::Wrap(term, context));
  store.pop(2);
  wrap
}
#[inline(always)]
pub fn tmemo(value: TermPtr, target: TermPtr, store: &mut Store) -> TermPtr {
  store.push(value);
  store.push(target);
  let memo = store.alloc(Term::Memoize(value, target));
  store.pop(2);
  memo
}
#[inline(always)]
pub fn tinput(stream: StreamPtr, store: &mut Store) -> TermPtr {
  store.alloc(Term::Input(stream, false))
}
/// A consumed position on the same stream as `input`.
pub fn tused(input: TermPtr, store: &mut Store) -> TermPtr {
  let stream = stream(input, store);
  store.alloc(Term::Input(stream, true))
}
#[inline(always)]
pub fn toutput(store: &mut Store) -> TermPtr {
  store.output()
}

#[inline(always)]
pub fn tfalse(store: &mut Store) -> TermPtr {
  store.f()
}
#[inline(always)]
pub fn ttrue(store: &mut Store) -> TermPtr {
  store.t()
}
#[inline(always)]
pub fn tbool(bit: bool, store: &mut Store) -> TermPtr {
  if bit { store.t() } else { store.f() }
}

/// `\s. s a b`. The components sit under the selector binder unchanged, so
/// they must be closed (or reindexed by the caller).
pub fn tpair(a: TermPtr, b: TermPtr, store: &mut Store) -> TermPtr {
  store.push(a);
  store.push(b);
  let sel = tvar(0, store);
  let fun = tapp(sel, a, store);
  let bod = tapp(fun, b, store);
  let pair = tlam(bod, store);
  store.pop(2);
  pair
}
#[inline(always)]
pub fn tfirst(pair: TermPtr, store: &mut Store) -> TermPtr {
  let t = store.t();
  tapp(pair, t, store)
}
#[inline(always)]
pub fn tsecond(pair: TermPtr, store: &mut Store) -> TermPtr {
  let f = store.f();
  tapp(pair, f, store)
}
/// `if c then a else b`, i.e. `c a b`.
pub fn tif(cond: TermPtr, then: TermPtr, other: TermPtr, store: &mut Store) -> TermPtr {
  store.push(other);
  let fun = tapp(cond, then, store);
  let term = tapp(fun, other, store);
  store.pop(1);
  term
}

fn mismatch(term: TermPtr, expected: Kind, store: &Store) -> ! {
  panic!("term {} is a {}, expected {}", term, store[term].kind().name(), expected.name())
}

pub fn idx(term: TermPtr, store: &Store) -> usize {
  match store[term] {
    Term::Var(idx) => idx,
    _ => mismatch(term, Kind::Var, store),
  }
}
pub fn body(term: TermPtr, store: &Store) -> TermPtr {
  match store[term] {
    Term::Lambda(bod) => bod,
    _ => mismatch(term, Kind::Lambda, store),
  }
}
pub fn fun(term: TermPtr, store: &Store) -> TermPtr {
  match store[term] {
    Term::Call(fun, _) => fun,
    _ => mismatch(term, Kind::Call, store),
  }
}
pub fn arg(term: TermPtr, store: &Store) -> TermPtr {
  match store[term] {
    Term::Call(_, arg) => arg,
    _ => mismatch(term, Kind::Call, store),
  }
}
pub fn term(proc: TermPtr, store: &Store) -> TermPtr {
  match store[proc] {
    Term::Proc(term, _) => term,
    _ => mismatch(proc, Kind::Proc, store),
  }
}
pub fn stack(proc: TermPtr, store: &Store) -> TermPtr {
  match store[proc] {
    Term::Proc(_, stack) => stack,
    _ => mismatch(proc, Kind::Proc, store),
  }
}
pub fn unwrap(wrap: TermPtr, store: &Store) -> TermPtr {
  match store[wrap] {
    Term::Wrap(term, _) => term,
    _ => mismatch(wrap, Kind::Wrap, store),
  }
}
pub fn context(wrap: TermPtr, store: &Store) -> TermPtr {
  match store[wrap] {
    Term::Wrap(_, context) => context,
    _ => mismatch(wrap, Kind::Wrap, store),
  }
}
pub fn value(memo: TermPtr, store: &Store) -> TermPtr {
  match store[memo] {
    Term::Memoize(value, _) => value,
    _ => mismatch(memo, Kind::Memoize, store),
  }
}
pub fn target(memo: TermPtr, store: &Store) -> TermPtr {
  match store[memo] {
    Term::Memoize(_, target) => target,
    _ => mismatch(memo, Kind::Memoize, store),
  }
}
pub fn stream(input: TermPtr, store: &Store) -> StreamPtr {
  match store[input] {
    Term::Input(stream, _) => stream,
    _ => mismatch(input, Kind::Input, store),
  }
}
pub fn is_used(input: TermPtr, store: &Store) -> bool {
  match store[input] {
    Term::Input(_, used) => used,
    _ => mismatch(input, Kind::Input, store),
  }
}

/// Structural view of a list cell built by `tpair`: `Some((head, tail))`.
pub fn as_pair(list: TermPtr, store: &Store) -> Option<(TermPtr, TermPtr)> {
  let Term::Lambda(bod) = store[list] else { return None };
  let Term::Call(fun, tail) = store[bod] else { return None };
  let Term::Call(sel, head) = store[fun] else { return None };
  match store[sel] {
    Term::Var(0) => Some((head, tail)),
    _ => None,
  }
}
pub fn head_(list: TermPtr, store: &Store) -> TermPtr {
  match as_pair(list, store) {
    Some((head, _)) => head,
    None => panic!("term {} is not a pair", list),
  }
}
pub fn tail_(list: TermPtr, store: &Store) -> TermPtr {
  match as_pair(list, store) {
    Some((_, tail)) => tail,
    None => panic!("term {} is not a pair", list),
  }
}
/// Whether `term` is syntactically `\a.\b.b`.
pub fn is_false_(term: TermPtr, store: &Store) -> bool {
  let Term::Lambda(outer) = store[term] else { return false };
  let Term::Lambda(inner) = store[outer] else { return false };
  matches!(store[inner], Term::Var(0))
}
/// The `n`th element of a structural list.
pub fn at_(mut list: TermPtr, n: usize, store: &Store) -> TermPtr {
  for _ in 0..n {
    list = tail_(list, store);
  }
  head_(list, store)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::equal::equal;

  #[test]
  fn constructors_tag_cells() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let v = tvar(1, s);
      assert_eq!(s[v].kind(), Kind::Var);
      assert_eq!(idx(v, s), 1);
      let v0 = tvar(0, s);
      let l = tlam(v0, s);
      assert_eq!(s[l].kind(), Kind::Lambda);
      assert!(equal(body(l, s), tvar(0, s), s));
      let v1 = tvar(1, s);
      let l1 = tlam(v1, s);
      let v2 = tvar(2, s);
      let c = tapp(l1, v2, s);
      assert_eq!(s[c].kind(), Kind::Call);
      assert_eq!(fun(c, s), l1);
      assert_eq!(arg(c, s), v2);
    });
  }

  #[test]
  fn if_is_nested_call() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let (a, b, c) = (tvar(1, s), tvar(2, s), tvar(3, s));
      let cond = tif(a, b, c, s);
      let inner = tapp(a, b, s);
      let expected = tapp(inner, c, s);
      assert!(equal(cond, expected, s));
    });
  }

  #[test]
  fn pairs_are_structural_lists() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let f = tfalse(s);
      let t = ttrue(s);
      let p = tpair(t, f, s);
      assert!(!is_false_(p, s));
      assert!(is_false_(f, s));
      assert!(!is_false_(t, s));
      let v1 = tvar(1, s);
      let p1 = tpair(v1, f, s);
      assert!(equal(head_(p1, s), tvar(1, s), s));
      assert!(is_false_(tail_(p1, s), s));

      let (v1, v2, v3) = (tvar(1, s), tvar(2, s), tvar(3, s));
      let l3 = tpair(v3, f, s);
      let l2 = tpair(v2, l3, s);
      let l1 = tpair(v1, l2, s);
      assert_eq!(idx(at_(l1, 0, s), s), 1);
      assert_eq!(idx(at_(l1, 1, s), s), 2);
      assert_eq!(idx(at_(l1, 2, s), s), 3);
    });
  }

  #[test]
  fn closures_default_to_an_empty_stack() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let v0 = tvar(0, s);
      let l = tlam(v0, s);
      let p = tproc(l, s);
      assert_eq!(s[p].kind(), Kind::Proc);
      assert_eq!(term(p, s), l);
      assert!(is_false_(stack(p, s), s));

      let (t, f) = (ttrue(s), tfalse(s));
      let env = tpair(t, f, s);
      let v0 = tvar(0, s);
      let p = tproc_stack(v0, env, s);
      let expected = tpair(t, f, s);
      assert!(equal(stack(p, s), expected, s));
    });
  }

  #[test]
  fn memo_cells_remember_their_thunk() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let f = tfalse(s);
      let w = twrap(f, f, s);
      let v0 = tvar(0, s);
      let m = tmemo(v0, w, s);
      assert_eq!(s[m].kind(), Kind::Memoize);
      assert!(equal(value(m, s), tvar(0, s), s));
      assert_eq!(target(m, s), w);
      assert_eq!(unwrap(w, s), f);
      assert_eq!(context(w, s), f);
    });
  }

  #[test]
  fn input_positions_and_output_sentinel() {
    let mut store = Store::new();
    store.held(&[], |s| {
      let stream = s.open_input(Box::new(std::io::empty()), crate::stream::BitMode::Binary);
      let i = tinput(stream, s);
      assert_eq!(s[i].kind(), Kind::Input);
      assert!(!is_used(i, s));
      let u = tused(i, s);
      assert_eq!(super::stream(u, s), stream);
      assert!(is_used(u, s));
      let out = toutput(s);
      assert_eq!(out, toutput(s));
      assert_eq!(s[out].kind(), Kind::Output);
    });
  }

  #[test]
  fn zeroed_cells() {
    let mut store = Store::new();
    let s = &mut store;
    let v = cell(Kind::Var, s);
    assert_eq!(s[v], Term::Var(0));
    let c = cell(Kind::Call, s);
    assert_eq!(s[c].kind(), Kind::Call);
    assert_eq!(cell(Kind::Output, s), s.output());
  }

  #[test]
  fn map_rewrites_handles_only() {
    let shift = |term: TermPtr| term + 10;
    assert_eq!(Term::Call(1, 2).map(shift), Term::Call(11, 12));
    assert_eq!(Term::Memoize(4, 3).map(shift), Term::Memoize(14, 13));
    assert_eq!(Term::Var(1).map(shift), Term::Var(1));
    assert_eq!(Term::Input(2, true).map(shift), Term::Input(2, true));
  }

  #[test]
  #[should_panic(expected = "expected LAMBDA")]
  fn accessor_kind_mismatch_panics() {
    let mut store = Store::new();
    let v = tvar(0, &mut store);
    body(v, &store);
  }
}
