use std::io::{Read, Write};
use std::ops::Index;

use im::OrdSet;

use crate::config::Config;
use crate::error::BlcResult;
use crate::stream::{BitMode, BitSink, StreamPtr, StreamTable};
use crate::term::{Term, TermPtr};

/// Cells allocated by a running evaluation are compacted once the arena
/// grows this far past the region floor.
pub const COMPACT_MIN: usize = 1 << 14;

#[derive(Debug, Clone, Copy)]
struct Region {
  floor: usize,
  // arena length that triggers the next compaction
  next: usize,
}

#[derive(Debug, Clone, Copy)]
struct Root {
  term: TermPtr,
  // one past the highest handle protected by this root or any below it
  high: usize,
}

/// One interpreter session: the cell arena, its protection stack, and the
/// streams programs read from and write to.
///
/// Reclamation is a watermark truncation rather than a trace. Cells only
/// ever reference older cells, except when a thunk is overwritten with its
/// value; those overwrites are recorded as pins so the value survives as
/// long as the thunk does. Everything above the highest root (extended by
/// the pins below it) is dropped at the next allocation.
///
/// An evaluation keeps its intermediates off the protection stack, so the
/// watermark cannot move while one runs. Instead the evaluator offers safe
/// points where it names every handle it holds, and the store slides the
/// reachable cells of the evaluation's region down over the garbage.
pub struct Store {
  cells: Vec<Term>,
  roots: Vec<Root>,
  // (cached value, overwritten slot), ordered by value
  pins: OrdSet<(TermPtr, TermPtr)>,
  holds: usize,
  region: Option<Region>,
  compactions: usize,
  // cells below this are permanent for the session
  base: usize,
  pub(crate) streams: StreamTable,
  pub(crate) sink: BitSink,
  pub trace: bool,
  output: TermPtr,
  f: TermPtr,
  t: TermPtr,
  nonempty_test: TermPtr,
}

impl Store {
  pub fn new() -> Self {
    let mut store = Store {
      cells: Vec::with_capacity(1024),
      roots: Vec::new(),
      pins: OrdSet::new(),
      holds: 1,
      region: None,
      compactions: 0,
      base: 0,
      streams: StreamTable::new(),
      sink: BitSink::new(BitMode::Text),
      trace: false,
      output: 0,
      f: 0,
      t: 0,
      nonempty_test: 0,
    };
    store.output = store.alloc(Term::Output);
    let v0 = store.alloc(Term::Var(0));
    let l0 = store.alloc(Term::Lambda(v0));
    store.f = store.alloc(Term::Lambda(l0));
    let v1 = store.alloc(Term::Var(1));
    let l1 = store.alloc(Term::Lambda(v1));
    store.t = store.alloc(Term::Lambda(l1));
    // \h.\t.\d. false, answers "not empty" when a list selects it
    let l = store.alloc(Term::Lambda(store.f));
    let l = store.alloc(Term::Lambda(l));
    store.nonempty_test = store.alloc(Term::Lambda(l));
    store.base = store.cells.len();
    store.holds = 0;
    store
  }

  pub fn with_config(config: &Config) -> Self {
    let mut store = Store::new();
    store.trace = config.trace;
    store.sink = BitSink::new(config.output_mode);
    store
  }

  /// Roots `term` and hands it back.
  #[inline(always)]
  pub fn push(&mut self, term: TermPtr) -> TermPtr {
    let below = self.roots.last().map_or(0, |root| root.high);
    self.roots.push(Root {
      term,
      high: below.max(term + 1),
    });
    term
  }

  /// Releases the `n` most recent roots.
  #[inline(always)]
  pub fn pop(&mut self, n: usize) {
    assert!(
      n <= self.roots.len(),
      "pop of {} roots with only {} protected",
      n,
      self.roots.len()
    );
    self.roots.truncate(self.roots.len() - n);
  }

  /// Current depth of the protection stack, for `pop_to`.
  pub fn depth(&self) -> usize {
    self.roots.len()
  }

  pub fn pop_to(&mut self, depth: usize) {
    let n = self.roots.len().saturating_sub(depth);
    self.pop(n);
  }

  pub(crate) fn alloc(&mut self, term: Term) -> TermPtr {
    self.reclaim();
    self.cells.push(term);
    self.cells.len() - 1
  }

  /// Runs `f` with `roots` protected and reclamation suspended, so `f` may
  /// hold unrooted intermediates. The result comes back unrooted.
  pub fn held<R>(&mut self, roots: &[TermPtr], f: impl FnOnce(&mut Store) -> R) -> R {
    let depth = self.depth();
    for &root in roots {
      self.push(root);
    }
    self.reclaim();
    self.holds += 1;
    let result = f(self);
    self.holds -= 1;
    self.pop_to(depth);
    result
  }

  /// Overwrites a forced thunk with its value, keeping the handle identity.
  pub(crate) fn update(&mut self, thunk: TermPtr, value: TermPtr) {
    self.cells[thunk] = Term::Memoize(value, thunk);
    if value > thunk {
      self.pins.insert((value, thunk));
    }
  }

  // Only pins valued at or above the watermark are visited.
  fn reclaim(&mut self) {
    if self.holds > 0 {
      return;
    }
    let mut keep = self.roots.last().map_or(self.base, |root| root.high.max(self.base));
    if keep >= self.cells.len() {
      return;
    }
    // values ascend, so one pass reaches the fixpoint
    for &(value, thunk) in self.pins.range((keep, 0)..) {
      if thunk < keep && value >= keep {
        keep = value + 1;
      }
    }
    if keep < self.cells.len() {
      self.cells.truncate(keep);
      self.unpin_from(keep);
    }
  }

  // Removes and returns the pins whose value is at or above `mark`.
  fn unpin_from(&mut self, mark: TermPtr) -> Vec<(TermPtr, TermPtr)> {
    let dropped: Vec<_> = self.pins.range((mark, 0)..).copied().collect();
    for pin in &dropped {
      self.pins.remove(pin);
    }
    dropped
  }

  /// Starts a compactable region at the current end of the arena. Only the
  /// outermost evaluation gets one; the answer says whether this call did.
  pub(crate) fn open_region(&mut self) -> bool {
    if self.holds != 1 || self.region.is_some() {
      return false;
    }
    let floor = self.cells.len();
    self.region = Some(Region {
      floor,
      next: floor + COMPACT_MIN,
    });
    true
  }

  pub(crate) fn close_region(&mut self, opened: bool) {
    if opened {
      self.region = None;
    }
  }

  #[inline(always)]
  pub(crate) fn wants_compact(&self) -> bool {
    self.holds == 1 && matches!(self.region, Some(region) if self.cells.len() >= region.next)
  }

  /// Drops every cell of the open region that is unreachable from `live`,
  /// the roots, or a pinned thunk below the floor. Survivors keep their
  /// order, so cells still only point at older cells, and each handle in
  /// `live` is rewritten to its cell's new place.
  pub(crate) fn compact(&mut self, live: &mut [&mut TermPtr]) {
    let Some(region) = self.region else { return };
    let floor = region.floor;
    let len = self.cells.len();

    let mut marked = vec![false; len - floor];
    let mut todo: Vec<TermPtr> = live.iter().map(|handle| **handle).collect();
    todo.extend(self.roots.iter().map(|root| root.term));
    todo.extend(
      self
        .pins
        .range((floor, 0)..)
        .filter(|&&(_, thunk)| thunk < floor)
        .map(|&(value, _)| value),
    );
    while let Some(term) = todo.pop() {
      if term < floor || marked[term - floor] {
        continue;
      }
      marked[term - floor] = true;
      match self.cells[term] {
        Term::Lambda(bod) => todo.push(bod),
        Term::Call(a, b) | Term::Proc(a, b) | Term::Wrap(a, b) | Term::Memoize(a, b) => {
          todo.push(a);
          todo.push(b);
        }
        Term::Var(_) | Term::Input(..) | Term::Output => (),
      }
    }

    let mut forward = vec![0; len - floor];
    let mut end = floor;
    for (slot, &reached) in marked.iter().enumerate() {
      if reached {
        forward[slot] = end;
        end += 1;
      }
    }
    let relocate = |term: TermPtr| if term < floor { term } else { forward[term - floor] };
    for (slot, &reached) in marked.iter().enumerate() {
      if reached {
        self.cells[forward[slot]] = self.cells[floor + slot].map(&relocate);
      }
    }
    self.cells.truncate(end);

    for (value, thunk) in self.unpin_from(floor) {
      if thunk < floor {
        self.cells[thunk] = self.cells[thunk].map(&relocate);
        self.pins.insert((relocate(value), thunk));
      } else if marked[thunk - floor] {
        self.pins.insert((relocate(value), relocate(thunk)));
      }
    }

    let mut high = 0;
    for root in self.roots.iter_mut() {
      root.term = relocate(root.term);
      high = high.max(root.term + 1);
      root.high = high;
    }
    for handle in live.iter_mut() {
      **handle = relocate(**handle);
    }

    self.region = Some(Region {
      floor,
      next: end + (end - floor).max(COMPACT_MIN),
    });
    self.compactions += 1;
    if self.trace {
      eprintln!("[compact] kept {} of {} cells", end - floor, len - floor);
    }
  }

  /// Times an evaluation has compacted its region this session.
  pub fn compactions(&self) -> usize {
    self.compactions
  }

  /// Number of live cells, permanent ones included.
  pub fn cells(&self) -> usize {
    self.cells.len()
  }

  pub fn output(&self) -> TermPtr {
    self.output
  }
  pub fn f(&self) -> TermPtr {
    self.f
  }
  pub fn t(&self) -> TermPtr {
    self.t
  }
  pub(crate) fn nonempty_test(&self) -> TermPtr {
    self.nonempty_test
  }
  /// Body of the canonical `true`, used to recognise which branch a Scott
  /// boolean selected.
  pub(crate) fn t_body(&self) -> TermPtr {
    match self.cells[self.t] {
      Term::Lambda(bod) => bod,
      _ => unreachable!(),
    }
  }
  pub(crate) fn f_body(&self) -> TermPtr {
    match self.cells[self.f] {
      Term::Lambda(bod) => bod,
      _ => unreachable!(),
    }
  }

  pub fn open_input(&mut self, reader: Box<dyn Read>, mode: BitMode) -> StreamPtr {
    self.streams.open(reader, mode)
  }

  /// Bytes consumed so far from an input stream.
  pub fn bytes_read(&self, stream: StreamPtr) -> usize {
    self.streams.bytes_read(stream)
  }

  pub fn set_output(&mut self, writer: Box<dyn Write>, mode: BitMode) {
    self.sink = BitSink::with_writer(writer, mode);
  }

  pub(crate) fn emit(&mut self, bit: bool) -> BlcResult<()> {
    if self.trace {
      eprintln!("[output] {}", if bit { 1 } else { 0 });
    }
    self.sink.write_bit(bit)
  }

  /// Bits captured from `OUTPUT` applications when no writer is set.
  pub fn take_output(&mut self) -> Vec<bool> {
    self.sink.take()
  }

  pub fn flush_output(&mut self) -> BlcResult<()> {
    self.sink.flush()
  }
}

impl Default for Store {
  fn default() -> Self {
    Store::new()
  }
}

impl Index<TermPtr> for Store {
  type Output = Term;

  #[inline(always)]
  fn index(&self, term: TermPtr) -> &Term {
    &self.cells[term]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::term::*;

  #[test]
  fn push_returns_its_argument() {
    let mut store = Store::new();
    let v = tvar(3, &mut store);
    assert_eq!(store.push(v), v);
    assert_eq!(store.depth(), 1);
    store.pop(1);
    assert_eq!(store.depth(), 0);
  }

  #[test]
  #[should_panic(expected = "pop of 2 roots")]
  fn popping_unprotected_roots_panics() {
    let mut store = Store::new();
    let v = tvar(0, &mut store);
    store.push(v);
    store.pop(2);
  }

  #[test]
  fn unrooted_cells_are_reclaimed_on_next_allocation() {
    let mut store = Store::new();
    let base = store.cells();
    let s = &mut store;
    let v0 = tvar(0, s);
    let l = tlam(v0, s);
    s.push(l);
    let v1 = tvar(1, s);
    let _garbage = tlam(v1, s);
    assert_eq!(s.cells(), base + 4);
    s.pop(1);
    let fresh = tvar(7, s);
    // everything after the last root went away before `fresh` was placed
    assert_eq!(fresh, base);
    assert_eq!(s.cells(), base + 1);
  }

  #[test]
  fn rooted_cells_survive() {
    let mut store = Store::new();
    let base = store.cells();
    let s = &mut store;
    let v0 = tvar(0, s);
    let l = tlam(v0, s);
    s.push(l);
    let v1 = tvar(1, s);
    let other = tlam(v1, s);
    s.push(other);
    s.pop(1);
    tvar(2, s);
    assert_eq!(s[l], Term::Lambda(v0));
    assert_eq!(s[v0], Term::Var(0));
    assert_eq!(s.cells(), base + 3);
    s.pop(1);
  }

  #[test]
  fn permanent_cells_outlive_every_pop() {
    let mut store = Store::new();
    let (f, t, out) = (store.f(), store.t(), store.output());
    let v = tvar(0, &mut store);
    store.push(v);
    store.pop(1);
    tvar(1, &mut store);
    assert!(is_false_(f, &store));
    assert!(!is_false_(t, &store));
    assert_eq!(store[out], Term::Output);
  }

  #[test]
  fn updated_thunks_pin_their_values() {
    let mut store = Store::new();
    let s = &mut store;
    let f = s.f();
    let thunk = twrap(f, f, s);
    s.push(thunk);
    let v0 = tvar(0, s);
    let value = tproc(v0, s);
    s.update(thunk, value);
    tvar(5, s);
    assert_eq!(s[thunk], Term::Memoize(value, thunk));
    assert!(matches!(s[value], Term::Proc(..)));
    assert_eq!(s[v0], Term::Var(0));
    s.pop(1);
    // with the thunk gone the pin no longer holds anything
    let fresh = tvar(6, s);
    assert_eq!(fresh, thunk);
  }

  #[test]
  fn held_regions_suspend_reclamation() {
    let mut store = Store::new();
    let base = store.cells();
    let cells = store.held(&[], |s| {
      let v0 = tvar(0, s);
      tlam(v0, s);
      tvar(1, s);
      s.cells()
    });
    assert_eq!(cells, base + 3);
    assert_eq!(store.depth(), 0);
  }

  #[test]
  fn chained_pins_extend_the_watermark() {
    let mut store = Store::new();
    let s = &mut store;
    let f = s.f();
    let outer = twrap(f, f, s);
    s.push(outer);
    let (inner, near, far) = s.held(&[], |s| {
      let inner = twrap(f, f, s);
      let near = tvar(0, s);
      let far = tvar(1, s);
      s.update(inner, far);
      s.update(outer, near);
      (inner, near, far)
    });
    // `outer` keeps `near`, which lies past `inner`, which keeps `far`
    let fresh = tvar(2, s);
    assert_eq!(fresh, far + 1);
    assert_eq!(s[outer], Term::Memoize(near, outer));
    assert_eq!(s[inner], Term::Memoize(far, inner));
    s.pop(1);
  }

  #[test]
  fn settled_pins_survive_many_reclamations() {
    let mut store = Store::new();
    let s = &mut store;
    let f = s.f();
    let mut thunks = Vec::new();
    for n in 0..1000 {
      let thunk = twrap(f, f, s);
      s.push(thunk);
      let value = s.held(&[], |s| {
        let value = tvar(n, s);
        s.update(thunk, value);
        value
      });
      s.push(value);
      thunks.push((thunk, value));
      // garbage above the newest root
      tvar(0, s);
    }
    for &(thunk, value) in &thunks {
      assert_eq!(s[thunk], Term::Memoize(value, thunk));
    }
    s.pop_to(0);
    assert_eq!(tvar(0, s), s.base);
  }

  #[test]
  fn compaction_keeps_reachable_cells_in_order() {
    let mut store = Store::new();
    let s = &mut store;
    let f = s.f();
    let thunk = twrap(f, f, s);
    s.push(thunk);
    s.held(&[], |s| {
      let opened = s.open_region();
      assert!(opened);
      let floor = s.cells();
      tvar(9, s);
      let v0 = tvar(0, s);
      tvar(8, s);
      let mut lam = tlam(v0, s);
      let value = tproc(v0, s);
      s.update(thunk, value);
      tvar(7, s);
      s.compact(&mut [&mut lam]);

      assert_eq!(s.cells(), floor + 3);
      assert_eq!(s[floor], Term::Var(0));
      assert_eq!(lam, floor + 1);
      assert_eq!(s[lam], Term::Lambda(floor));
      assert_eq!(s[thunk], Term::Memoize(floor + 2, thunk));
      assert_eq!(s[floor + 2], Term::Proc(floor, f));
      assert_eq!(s.compactions(), 1);
      s.close_region(opened);
    });
    s.pop(1);
  }

  #[test]
  fn nested_holds_do_not_compact() {
    let mut store = Store::new();
    store.held(&[], |s| {
      s.held(&[], |s| {
        assert!(!s.open_region());
        for n in 0..COMPACT_MIN {
          tvar(n, s);
        }
        assert!(!s.wants_compact());
      });
    });
    assert_eq!(store.compactions(), 0);
  }
}
