use std::io::{self, Read, Write};

use crate::error::{BlcResult, Error};
use crate::store::Store;
use crate::term::{tbool, tfalse, tinput, tpair, TermPtr};

pub type StreamPtr = usize;

/// How bytes map to bits on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitMode {
  /// Eight bits per byte, most significant first.
  Binary,
  /// One bit per ASCII `0`/`1`; any other byte is skipped.
  Text,
}

pub struct InputStream {
  reader: Box<dyn Read>,
  mode: BitMode,
  bytes_read: usize,
}

/// Manages the byte sources INPUT positions read from.
pub struct StreamTable {
  streams: Vec<InputStream>,
}

impl StreamTable {
  pub fn new() -> Self {
    StreamTable { streams: Vec::new() }
  }

  pub fn open(&mut self, reader: Box<dyn Read>, mode: BitMode) -> StreamPtr {
    self.streams.push(InputStream {
      reader,
      mode,
      bytes_read: 0,
    });
    self.streams.len() - 1
  }

  pub fn bytes_read(&self, id: StreamPtr) -> usize {
    self.streams[id].bytes_read
  }

  fn read_byte(&mut self, id: StreamPtr) -> BlcResult<Option<u8>> {
    let stream = &mut self.streams[id];
    let mut buf = [0u8; 1];
    loop {
      match stream.reader.read(&mut buf) {
        Ok(0) => return Ok(None),
        Ok(_) => {
          stream.bytes_read += 1;
          return Ok(Some(buf[0]));
        }
        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(Error::from(e)),
      }
    }
  }

  /// Reads the next chunk of bits, or `None` at end of file. Never reads
  /// more than the one byte the chunk comes from (text mode skips bytes
  /// that are not digits, one read at a time).
  pub fn read_bits(&mut self, id: StreamPtr) -> BlcResult<Option<Vec<bool>>> {
    match self.streams[id].mode {
      BitMode::Binary => Ok(self.read_byte(id)?.map(|byte| (0..8).map(|i| (byte >> (7 - i)) & 1 == 1).collect())),
      BitMode::Text => loop {
        match self.read_byte(id)? {
          None => return Ok(None),
          Some(b'0') => return Ok(Some(vec![false])),
          Some(b'1') => return Ok(Some(vec![true])),
          Some(_) => continue,
        }
      },
    }
  }
}

impl Default for StreamTable {
  fn default() -> Self {
    StreamTable::new()
  }
}

/// Produces the Scott list for one forced INPUT position: the bits of the
/// next byte followed by a fresh position, or `false` at end of file.
pub fn read_input(stream: StreamPtr, store: &mut Store) -> BlcResult<TermPtr> {
  let bits = store.streams.read_bits(stream)?;
  match bits {
    None => {
      if store.trace {
        eprintln!("[input] stream {} at end of file", stream);
      }
      Ok(tfalse(store))
    }
    Some(bits) => {
      if store.trace {
        let text: String = bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect();
        eprintln!("[input] stream {} read {}", stream, text);
      }
      let mut list = tinput(stream, store);
      for &bit in bits.iter().rev() {
        let b = tbool(bit, store);
        list = tpair(b, list, store);
      }
      Ok(list)
    }
  }
}

/// Collects the bits programs emit through the OUTPUT sentinel.
pub struct BitSink {
  writer: Option<Box<dyn Write>>,
  mode: BitMode,
  byte_buf: u8,
  bit_pos: u8,
  captured: Vec<bool>,
}

impl BitSink {
  pub fn new(mode: BitMode) -> Self {
    BitSink {
      writer: None,
      mode,
      byte_buf: 0,
      bit_pos: 0,
      captured: Vec::new(),
    }
  }

  pub fn with_writer(writer: Box<dyn Write>, mode: BitMode) -> Self {
    BitSink {
      writer: Some(writer),
      ..BitSink::new(mode)
    }
  }

  pub fn write_bit(&mut self, bit: bool) -> BlcResult<()> {
    let Some(writer) = self.writer.as_mut() else {
      self.captured.push(bit);
      return Ok(());
    };
    match self.mode {
      BitMode::Text => {
        writer.write_all(if bit { b"1" } else { b"0" })?;
        writer.flush()?;
      }
      BitMode::Binary => {
        if bit {
          self.byte_buf |= 1 << (7 - self.bit_pos);
        }
        self.bit_pos += 1;
        if self.bit_pos == 8 {
          writer.write_all(&[self.byte_buf])?;
          writer.flush()?;
          self.byte_buf = 0;
          self.bit_pos = 0;
        }
      }
    }
    Ok(())
  }

  /// Writes out a partial byte, zero padded.
  pub fn flush(&mut self) -> BlcResult<()> {
    if let Some(writer) = self.writer.as_mut() {
      if self.bit_pos > 0 {
        writer.write_all(&[self.byte_buf])?;
        self.byte_buf = 0;
        self.bit_pos = 0;
      }
      writer.flush()?;
    }
    Ok(())
  }

  pub fn take(&mut self) -> Vec<bool> {
    std::mem::take(&mut self.captured)
  }
}
