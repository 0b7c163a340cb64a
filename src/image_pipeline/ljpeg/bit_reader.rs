//! MSB-first bit reader for entropy-coded sensor data.

use super::error::LjpegError;

/// Bit reader over an in-memory stream.
///
/// In stuffed mode (lossless JPEG) a `0xFF 0x00` pair yields one `0xFF`
/// byte and any other byte after `0xFF` is a marker: reading stops there
/// and the reader is padded with zeros. Without stuffing every byte is data
/// and refills copy whole bytes with no per-byte checks.
///
/// Zero padding is also appended past the end of the input so refills never
/// fail; consuming a padded bit is reported as [`LjpegError::UnexpectedEof`].
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buf: u64,
    vbits: u32,
    padded: u32,
    stuffed: bool,
    marker: Option<u8>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], stuffed: bool) -> Self {
        Self {
            data,
            pos: 0,
            buf: 0,
            vbits: 0,
            padded: 0,
            stuffed,
            marker: None,
        }
    }

    /// Byte offset of the next byte not yet pulled into the bit buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Marker byte that stopped the reader, if any.
    pub fn marker(&self) -> Option<u8> {
        self.marker
    }

    fn refill(&mut self) {
        if !self.stuffed && self.marker.is_none() {
            let take = ((64 - self.vbits) / 8) as usize;
            if let Some(bytes) = self.data.get(self.pos..self.pos + take) {
                for &byte in bytes {
                    self.buf = (self.buf << 8) | byte as u64;
                }
                self.pos += take;
                self.vbits += 8 * take as u32;
                return;
            }
        }
        while self.vbits <= 56 {
            let byte = self.next_byte();
            self.buf = (self.buf << 8) | byte as u64;
            self.vbits += 8;
        }
    }

    #[inline]
    fn next_byte(&mut self) -> u8 {
        if self.marker.is_some() || self.pos >= self.data.len() {
            self.padded += 8;
            return 0;
        }
        let byte = self.data[self.pos];
        if self.stuffed && byte == 0xFF {
            match self.data.get(self.pos + 1) {
                Some(0) => {
                    self.pos += 2;
                    return 0xFF;
                }
                Some(&marker) => {
                    // leave pos on the 0xFF so the marker can be consumed later
                    self.marker = Some(marker);
                    self.padded += 8;
                    return 0;
                }
                None => {}
            }
        }
        self.pos += 1;
        byte
    }

    #[inline(always)]
    fn check_overrun(&self) -> Result<(), LjpegError> {
        if self.vbits < self.padded {
            Err(LjpegError::UnexpectedEof)
        } else {
            Ok(())
        }
    }

    /// Reads `nbits` (0..=16) bits.
    #[inline(always)]
    pub fn get_bits(&mut self, nbits: u32) -> Result<u32, LjpegError> {
        debug_assert!(nbits <= 16);
        if nbits == 0 {
            return Ok(0);
        }
        if self.vbits < nbits {
            self.refill();
        }
        self.vbits -= nbits;
        self.check_overrun()?;
        Ok(((self.buf >> self.vbits) & ((1u64 << nbits) - 1)) as u32)
    }

    #[inline(always)]
    pub fn get_bit(&mut self) -> Result<usize, LjpegError> {
        if self.vbits == 0 {
            self.refill();
        }
        self.vbits -= 1;
        self.check_overrun()?;
        Ok(((self.buf >> self.vbits) & 1) as usize)
    }

    /// Drops buffered bits and starts over at the current byte position.
    pub fn reset(&mut self) {
        self.buf = 0;
        self.vbits = 0;
        self.padded = 0;
    }

    /// Byte-aligns and consumes an `RSTn` marker.
    ///
    /// Fails if whole unread bytes remain before the marker or the next
    /// marker is not a restart marker. Without stuffing, stray bytes ahead of
    /// the marker are reported as a missing marker.
    pub fn restart(&mut self) -> Result<(), LjpegError> {
        let unread = self.vbits.saturating_sub(self.padded);
        if !self.stuffed {
            // without stuffing the refill reads through the marker; hand the
            // whole buffered bytes back so `pos` lands on it again
            self.pos -= (unread / 8) as usize;
        } else if unread >= 8 {
            return Err(LjpegError::MissingRestart(format!(
                "{} unread bits before the marker",
                unread
            )));
        }
        self.reset();
        let marker = match self.marker.take() {
            Some(marker) => marker,
            None => match self.data.get(self.pos..self.pos + 2) {
                Some(&[0xFF, marker]) => marker,
                Some(&[a, b]) => {
                    return Err(LjpegError::MissingRestart(format!(
                        "found bytes 0x{a:02x} 0x{b:02x}"
                    )));
                }
                _ => return Err(LjpegError::MissingRestart("end of stream".into())),
            },
        };
        if !(0xD0..=0xD7).contains(&marker) {
            return Err(LjpegError::MissingRestart(format!("found marker 0xff{marker:02x}")));
        }
        self.pos += 2;
        Ok(())
    }
}
