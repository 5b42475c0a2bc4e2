use crate::error::BlcResult;
use crate::lazy::eval_closed;
use crate::store::Store;
use crate::term::{tapp, tbool, tfalse, tfirst, tpair, tsecond, Term, TermPtr};

// Applies `term` to two arguments and reports which canonical branch the
// closure it reduces to came from, if either.
fn select(store: &mut Store, term: TermPtr, a: TermPtr, b: TermPtr) -> BlcResult<Option<bool>> {
  let mark = store.depth();
  store.push(term);
  let sel = tapp(term, a, store);
  let choice = tapp(sel, b, store);
  store.push(choice);
  let val = eval_closed(store, choice);
  store.pop_to(mark);
  let val = val?;
  Ok(match store[val] {
    Term::Proc(bod, _) if bod == store.t_body() => Some(true),
    Term::Proc(bod, _) if bod == store.f_body() => Some(false),
    _ => None,
  })
}

/// Reads a Scott boolean. Anything that is neither `true` nor `false` is a
/// fault.
pub fn decode_bool(store: &mut Store, term: TermPtr) -> BlcResult<bool> {
  let (t, f) = (store.t(), store.f());
  match select(store, term, t, f)? {
    Some(bit) => Ok(bit),
    None => panic!("fault: term {} is not a boolean", term),
  }
}

/// Whether `term` behaves as `false`, which is also the empty list.
pub fn is_false(store: &mut Store, term: TermPtr) -> BlcResult<bool> {
  let (choice, t) = (store.nonempty_test(), store.t());
  Ok(select(store, term, choice, t)? == Some(true))
}

/// Splits a list into unevaluated head and tail terms, or `None` when it is
/// empty. The list is evaluated once.
pub fn uncons(store: &mut Store, list: TermPtr) -> BlcResult<Option<(TermPtr, TermPtr)>> {
  let mark = store.depth();
  store.push(list);
  let val = eval_closed(store, list);
  let val = match val {
    Ok(val) => store.push(val),
    Err(e) => {
      store.pop_to(mark);
      return Err(e);
    }
  };
  let empty = is_false(store, val);
  let result = match empty {
    Ok(true) => Ok(None),
    Ok(false) => {
      let head = tfirst(val, store);
      store.push(head);
      let tail = tsecond(val, store);
      Ok(Some((head, tail)))
    }
    Err(e) => Err(e),
  };
  store.pop_to(mark);
  result
}

/// Forces a whole list of bits. Elements other than `false` read as 1.
pub fn list_to_bits(store: &mut Store, list: TermPtr) -> BlcResult<Vec<bool>> {
  let mark = store.depth();
  let mut bits = Vec::new();
  let mut cursor = store.push(list);
  let result = loop {
    let (head, tail) = match uncons(store, cursor) {
      Ok(Some(cell)) => cell,
      Ok(None) => break Ok(bits),
      Err(e) => break Err(e),
    };
    store.push(head);
    store.push(tail);
    match is_false(store, head) {
      Ok(zero) => bits.push(!zero),
      Err(e) => break Err(e),
    }
    store.pop_to(mark);
    cursor = store.push(tail);
  };
  store.pop_to(mark);
  result
}

/// Builds a list of canonical booleans.
pub fn bits_to_list(bits: &[bool], store: &mut Store) -> TermPtr {
  let mark = store.depth();
  let mut list = tfalse(store);
  for &bit in bits.iter().rev() {
    let b = tbool(bit, store);
    list = tpair(b, list, store);
    store.pop_to(mark);
    store.push(list);
  }
  store.pop_to(mark);
  list
}

/// Bits of a string of `0`/`1` digits; other characters are ignored.
pub fn str_to_bits(text: &str) -> Vec<bool> {
  text
    .chars()
    .filter_map(|c| match c {
      '0' => Some(false),
      '1' => Some(true),
      _ => None,
    })
    .collect()
}

pub fn bits_to_string(bits: &[bool]) -> String {
  bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stream::BitMode;
  use crate::term::*;
  use std::io::Cursor;

  #[test]
  fn booleans() {
    let mut store = Store::new();
    let (t, f) = (store.t(), store.f());
    assert!(decode_bool(&mut store, t).unwrap());
    assert!(!decode_bool(&mut store, f).unwrap());
    assert!(is_false(&mut store, f).unwrap());
    assert!(!is_false(&mut store, t).unwrap());
  }

  #[test]
  #[should_panic(expected = "is not a boolean")]
  fn non_booleans_fault() {
    let mut store = Store::new();
    let s = &mut store;
    let v0 = tvar(0, s);
    let id = tlam(v0, s);
    s.push(id);
    let _ = decode_bool(s, id);
  }

  #[test]
  fn lists_round_trip() {
    let mut store = Store::new();
    let s = &mut store;
    let bits = str_to_bits("1101");
    assert_eq!(bits, vec![true, true, false, true]);
    let list = bits_to_list(&bits, s);
    s.push(list);
    assert_eq!(list_to_bits(s, list).unwrap(), bits);
    assert_eq!(bits_to_string(&bits), "1101");
    s.pop(1);
    let empty = bits_to_list(&[], s);
    assert!(list_to_bits(s, empty).unwrap().is_empty());
  }

  #[test]
  fn uncons_splits_without_forcing_elements() {
    let mut store = Store::new();
    let s = &mut store;
    let f = tfalse(s);
    // the head is a free variable and would fault if forced
    let bad = tvar(9, s);
    let list = tpair(bad, f, s);
    s.push(list);
    let (head, tail) = uncons(s, list).unwrap().unwrap();
    s.push(head);
    assert_eq!(uncons(s, tail).unwrap(), None);
    s.pop(2);
  }

  #[test]
  fn input_streams_read_as_lists() {
    let mut store = Store::new();
    let s = &mut store;
    let stream = s.open_input(Box::new(Cursor::new(b"A".to_vec())), BitMode::Binary);
    let input = tinput(stream, s);
    s.push(input);
    let bits = list_to_bits(s, input).unwrap();
    assert_eq!(bits_to_string(&bits), "01000001");
    assert_eq!(s.bytes_read(stream), 1);
    s.pop(1);
  }

  #[test]
  fn text_input_reads_digits() {
    let mut store = Store::new();
    let s = &mut store;
    let stream = s.open_input(Box::new(Cursor::new(b"1 0\n1".to_vec())), BitMode::Text);
    let input = tinput(stream, s);
    s.push(input);
    let bits = list_to_bits(s, input).unwrap();
    assert_eq!(bits_to_string(&bits), "101");
    s.pop(1);
  }
}
