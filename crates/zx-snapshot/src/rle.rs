//! Run-length coding used for `.z80` memory pages.
//!
//! A run is written as `ED ED nn vv` ("byte `vv` repeated `nn` times"). Only runs of at least five
//! equal bytes are folded, except runs of `ED` itself, which are folded from two bytes up. The byte
//! directly after a lone `ED` is always written literally, so `ED` followed by six zeros encodes as
//! `ED 00 ED ED 05 00`.

use crate::error::{Result, SnapshotError};
use crate::format::{RLE_ESCAPE, RLE_TERMINATOR};

const MIN_RUN: usize = 5;
const MIN_ESCAPE_RUN: usize = 2;
const MAX_RUN: usize = u8::MAX as usize;

/// Decodes `src` into `dst` and returns the number of bytes produced.
///
/// Output is capped at `max_output` (`None` or `Some(0)` leave only `dst.len()` as the cap) and a
/// run that would cross the cap is cut short. A compressed stream stops at the first
/// `00 ED ED 00` window. Malformed input never fails; decoding just ends early.
pub fn decode(src: &[u8], compressed: bool, dst: &mut [u8], max_output: Option<usize>) -> usize {
    let mut decoder = Decoder::new(dst, compressed, max_output);
    decoder.feed(src);
    decoder.finish()
}

/// Incremental form of [`decode`] for payloads that arrive in pieces.
///
/// Feeding a payload in any split produces the same output as one [`decode`] call over the whole
/// payload. At most three input bytes are held back between calls.
pub struct Decoder<'a> {
    dst: &'a mut [u8],
    limit: usize,
    len: usize,
    compressed: bool,
    window: [u8; 4],
    pending: usize,
    terminated: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(dst: &'a mut [u8], compressed: bool, max_output: Option<usize>) -> Self {
        let limit = match max_output {
            Some(max) if max > 0 => max.min(dst.len()),
            _ => dst.len(),
        };
        Self {
            dst,
            limit,
            len: 0,
            compressed,
            window: [0; 4],
            pending: 0,
            terminated: false,
        }
    }

    /// Whether further input can no longer change the output.
    pub fn is_done(&self) -> bool {
        self.terminated || self.len >= self.limit
    }

    pub fn feed(&mut self, input: &[u8]) {
        if !self.compressed {
            let n = input.len().min(self.limit - self.len);
            self.dst[self.len..self.len + n].copy_from_slice(&input[..n]);
            self.len += n;
            return;
        }

        for &byte in input {
            if self.is_done() {
                return;
            }
            self.window[self.pending] = byte;
            self.pending += 1;
            if self.pending == self.window.len() {
                self.step();
            }
        }
    }

    /// Flushes held-back bytes as literals and returns the decoded length.
    pub fn finish(mut self) -> usize {
        if !self.terminated {
            let tail = self.pending.min(self.limit - self.len);
            self.dst[self.len..self.len + tail].copy_from_slice(&self.window[..tail]);
            self.len += tail;
        }
        self.len
    }

    // Called with a full window and room for at least one more output byte.
    fn step(&mut self) {
        let window = self.window;
        if window == RLE_TERMINATOR {
            self.terminated = true;
            self.pending = 0;
            return;
        }
        if window[0] == RLE_ESCAPE && window[1] == RLE_ESCAPE {
            let count = (window[2] as usize).min(self.limit - self.len);
            self.dst[self.len..self.len + count].fill(window[3]);
            self.len += count;
            self.pending = 0;
            return;
        }

        self.dst[self.len] = window[0];
        self.len += 1;
        self.window.copy_within(1.., 0);
        self.pending = self.window.len() - 1;
    }
}

/// Encodes `src` into `dst` and returns the encoded length.
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut out = Output { dst, len: 0 };
    let mut pos = 0usize;
    while pos < src.len() {
        let value = src[pos];
        let run = src[pos..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&b| b == value)
            .count();

        let min_run = if value == RLE_ESCAPE {
            MIN_ESCAPE_RUN
        } else {
            MIN_RUN
        };
        if run >= min_run {
            out.push(&[RLE_ESCAPE, RLE_ESCAPE, run as u8, value])?;
            pos += run;
            continue;
        }

        out.push(&[value])?;
        pos += 1;
        if value == RLE_ESCAPE {
            // A lone escape byte: the next byte must not start a run.
            if let Some(&next) = src.get(pos) {
                out.push(&[next])?;
                pos += 1;
            }
        }
    }
    Ok(out.len)
}

struct Output<'a> {
    dst: &'a mut [u8],
    len: usize,
}

impl Output<'_> {
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.len + bytes.len();
        let capacity = self.dst.len();
        let slot = self
            .dst
            .get_mut(self.len..end)
            .ok_or(SnapshotError::EncodeOverflow { capacity })?;
        slot.copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}
