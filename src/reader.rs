use crate::error::{BlcResult, DecodeError, Error, Token};
use crate::scott::{is_false, uncons};
use crate::store::Store;
use crate::term::{tapp, tlam, tvar, Term, TermPtr};

enum Frame {
  // waiting for the body of an abstraction
  Lambda,
  // waiting for the function of a call
  Fun,
  // waiting for the operand of a call to this function
  Arg(TermPtr),
}

struct Bits {
  cursor: TermPtr,
  offset: usize,
}

impl Bits {
  fn next(&mut self, store: &mut Store) -> BlcResult<Option<bool>> {
    match uncons(store, self.cursor)? {
      None => Ok(None),
      Some((head, tail)) => {
        store.push(head);
        store.push(tail);
        let zero = is_false(store, head);
        store.pop(2);
        self.cursor = tail;
        self.offset += 1;
        Ok(Some(!zero?))
      }
    }
  }

  fn expect(&mut self, store: &mut Store, token: Token) -> BlcResult<bool> {
    match self.next(store)? {
      Some(bit) => Ok(bit),
      None => Err(Error::from(DecodeError {
        token,
        offset: self.offset,
      })),
    }
  }
}

/// Decodes one term from the front of a bit list, returning it with the
/// rest of the list. `Ok(None)` means the list ended cleanly before the
/// term started. Bits are forced one at a time, so `bits` may be an INPUT
/// position still waiting on its stream.
pub fn read_expression(store: &mut Store, bits: TermPtr) -> BlcResult<Option<(TermPtr, TermPtr)>> {
  store.held(&[bits], |store| {
    let mut bits = Bits { cursor: bits, offset: 0 };
    let mut frames: Vec<Frame> = Vec::new();
    loop {
      let token = match frames.last() {
        None => None,
        Some(Frame::Lambda) => Some(Token::Lambda),
        Some(_) => Some(Token::Call),
      };
      let first = match (bits.next(store)?, token) {
        (Some(bit), _) => bit,
        (None, None) => return Ok(None),
        (None, Some(token)) => {
          return Err(Error::from(DecodeError {
            token,
            offset: bits.offset,
          }))
        }
      };
      if !first {
        if bits.expect(store, Token::Prefix)? {
          frames.push(Frame::Fun);
        } else {
          frames.push(Frame::Lambda);
        }
        continue;
      }
      let mut idx = 0;
      while bits.expect(store, Token::Variable)? {
        idx += 1;
      }
      let mut term = tvar(idx, store);
      loop {
        match frames.pop() {
          None => return Ok(Some((term, bits.cursor))),
          Some(Frame::Lambda) => term = tlam(term, store),
          Some(Frame::Fun) => {
            frames.push(Frame::Arg(term));
            break;
          }
          Some(Frame::Arg(fun)) => term = tapp(fun, term, store),
        }
      }
    }
  })
}

/// Encodes a term back to its bit string. Only the three syntactic kinds
/// have an encoding.
pub fn write_expression(store: &Store, term: TermPtr) -> BlcResult<Vec<bool>> {
  let mut bits = Vec::new();
  let mut todo = vec![term];
  while let Some(term) = todo.pop() {
    match store[term] {
      Term::Var(idx) => {
        bits.extend(std::iter::repeat(true).take(idx + 1));
        bits.push(false);
      }
      Term::Lambda(bod) => {
        bits.extend([false, false]);
        todo.push(bod);
      }
      Term::Call(fun, arg) => {
        bits.extend([false, true]);
        todo.push(arg);
        todo.push(fun);
      }
      other => return Err(Error::Unencodable(other.kind().name())),
    }
  }
  Ok(bits)
}
