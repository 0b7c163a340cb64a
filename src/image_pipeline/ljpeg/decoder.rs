//! Lossless JPEG (SOF3) header parsing and row reconstruction.

use tracing::debug;

use super::bit_reader::BitReader;
use super::error::LjpegError;
use super::huffman::{HuffmanTable, MAX_DIFF_BITS};
use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};

const SOI: u16 = 0xFFD8;
const SOF3: u16 = 0xFFC3;
const DHT: u16 = 0xFFC4;
const DRI: u16 = 0xFFDD;
const SOS: u16 = 0xFFDA;

/// Frame parameters from SOF3, DRI and SOS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LjpegHeader {
    /// Sample precision in bits.
    pub bits: u8,
    pub high: usize,
    pub wide: usize,
    /// Interleaved components per MCU, 1 to 4.
    pub clrs: usize,
    /// Restart interval in MCUs.
    pub restart: Option<usize>,
    /// Selection value from SOS; only 1 (predict from the left) is decoded.
    pub predictor: u8,
}

impl LjpegHeader {
    /// Samples per decoded row.
    pub fn row_len(&self) -> usize {
        self.wide * self.clrs
    }
}

struct ParsedStream {
    header: LjpegHeader,
    tables: [Option<HuffmanTable>; 4],
    selectors: [usize; 4],
    scan_start: usize,
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// Parses up to SOS. `size` receives the frame's `(wide, high)` as soon as
/// SOF3 is read so later failures can report it.
fn parse_stream(data: &[u8], size: &mut (usize, usize)) -> std::result::Result<ParsedStream, LjpegError> {
    if read_u16(data, 0) != Some(SOI) {
        return Err(LjpegError::MissingSoi);
    }
    let mut pos = 2;
    let mut frame: Option<(u8, usize, usize, Vec<u8>)> = None;
    let mut tables: [Option<HuffmanTable>; 4] = Default::default();
    let mut restart = None;

    loop {
        let tag = read_u16(data, pos).ok_or(LjpegError::Truncated(0))?;
        if tag <= 0xFF00 {
            return Err(LjpegError::NotAMarker(tag));
        }
        let len = read_u16(data, pos + 2).ok_or(LjpegError::Truncated(tag))? as usize;
        if len < 2 {
            return Err(LjpegError::Truncated(tag));
        }
        let seg = data.get(pos + 4..pos + 2 + len).ok_or(LjpegError::Truncated(tag))?;
        pos += 2 + len;

        match tag {
            SOF3 => {
                if seg.len() < 6 {
                    return Err(LjpegError::Truncated(tag));
                }
                let bits = seg[0];
                let high = u16::from_be_bytes([seg[1], seg[2]]) as usize;
                let wide = u16::from_be_bytes([seg[3], seg[4]]) as usize;
                let clrs = seg[5] as usize;
                if !(2..=MAX_DIFF_BITS).contains(&bits) {
                    return Err(LjpegError::BadFrame(format!("precision {bits}")));
                }
                if !(1..=4).contains(&clrs) {
                    return Err(LjpegError::BadFrame(format!("{clrs} components")));
                }
                if high == 0 || wide == 0 {
                    return Err(LjpegError::BadFrame(format!("size {wide}x{high}")));
                }
                let ids = (0..clrs)
                    .map(|c| seg.get(6 + 3 * c).copied().unwrap_or(c as u8))
                    .collect();
                *size = (wide, high);
                frame = Some((bits, high, wide, ids));
            }
            0xFFC0..=0xFFCF if tag != DHT && tag != 0xFFC8 && tag != 0xFFCC => {
                return Err(LjpegError::Unsupported(format!("frame type 0x{tag:04x}")));
            }
            DHT => {
                let mut p = 0;
                while p < seg.len() {
                    let class = seg[p] >> 4;
                    let id = (seg[p] & 15) as usize;
                    if class != 0 || id >= 4 {
                        return Err(LjpegError::BadTable {
                            table: id,
                            detail: format!("class {class} index {id}"),
                        });
                    }
                    let counts: &[u8; 16] = seg
                        .get(p + 1..p + 17)
                        .and_then(|c| c.try_into().ok())
                        .ok_or(LjpegError::Truncated(tag))?;
                    let total: usize = counts.iter().map(|&n| n as usize).sum();
                    let symbols = seg.get(p + 17..p + 17 + total).ok_or(LjpegError::Truncated(tag))?;
                    tables[id] = Some(HuffmanTable::from_dht(id, counts, symbols)?);
                    p += 17 + total;
                }
            }
            DRI => {
                let interval = read_u16(seg, 0).ok_or(LjpegError::Truncated(tag))? as usize;
                restart = (interval > 0).then_some(interval);
            }
            SOS => {
                let (bits, high, wide, ids) = frame.ok_or_else(|| LjpegError::BadFrame("SOS before SOF3".into()))?;
                let ns = *seg.first().ok_or(LjpegError::Truncated(tag))? as usize;
                if ns != ids.len() {
                    return Err(LjpegError::Unsupported(format!(
                        "scan with {ns} of {} components",
                        ids.len()
                    )));
                }
                let mut selectors = [0usize; 4];
                for i in 0..ns {
                    let id = *seg.get(1 + 2 * i).ok_or(LjpegError::Truncated(tag))?;
                    let td = (*seg.get(2 + 2 * i).ok_or(LjpegError::Truncated(tag))? >> 4) as usize;
                    let channel = ids.iter().position(|&c| c == id).unwrap_or(i);
                    if td >= 4 {
                        return Err(LjpegError::MissingTable(td));
                    }
                    selectors[channel] = td;
                }
                let predictor = *seg.get(1 + 2 * ns).ok_or(LjpegError::Truncated(tag))?;
                if predictor != 1 {
                    return Err(LjpegError::Unsupported(format!("predictor {predictor}")));
                }
                for &sel in &selectors[..ns] {
                    if tables[sel].is_none() {
                        return Err(LjpegError::MissingTable(sel));
                    }
                }
                if let Some(interval) = restart {
                    if interval % wide != 0 {
                        return Err(LjpegError::Unsupported(format!(
                            "restart interval {interval} not aligned to {wide}-pixel rows"
                        )));
                    }
                }
                let header = LjpegHeader {
                    bits,
                    high,
                    wide,
                    clrs: ns,
                    restart,
                    predictor,
                };
                return Ok(ParsedStream {
                    header,
                    tables,
                    selectors,
                    scan_start: pos,
                });
            }
            _ => {}
        }
    }
}

/// Decodes one difference: a Huffman-coded length, then that many bits.
#[inline]
fn decode_diff(reader: &mut BitReader<'_>, table: &HuffmanTable, bits: u8) -> std::result::Result<i32, LjpegError> {
    let len = table.decode(reader)?;
    match len {
        0 => Ok(0),
        16 if bits == 16 => Ok(-32768),
        len if len > bits => Err(LjpegError::LengthOverflow { len, bits }),
        len => {
            let len = len as u32;
            let diff = reader.get_bits(len)? as i32;
            if diff & (1 << (len - 1)) == 0 {
                Ok(diff - ((1 << len) - 1))
            } else {
                Ok(diff)
            }
        }
    }
}

/// Row-at-a-time lossless JPEG decoder.
///
/// Owns the per-channel tables, the vertical predictors and the bitstream
/// cursor for one frame; dropped once the last row is read.
pub struct LjpegDecoder<'a> {
    header: LjpegHeader,
    tables: [Option<HuffmanTable>; 4],
    selectors: [usize; 4],
    vpred: [i32; 4],
    reader: BitReader<'a>,
    row: Vec<u16>,
    next_row: usize,
}

impl<'a> LjpegDecoder<'a> {
    /// Parses markers up to SOS; `data` must start at the SOI marker.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Self::with_byte_stuffing(data, true)
    }

    /// Like [`LjpegDecoder::new`], for streams whose entropy-coded data
    /// may or may not escape `0xFF` bytes with a following `0x00`.
    pub fn with_byte_stuffing(data: &'a [u8], stuffed: bool) -> Result<Self> {
        let mut size = (0, 0);
        let parsed = parse_stream(data, &mut size).map_err(|e| to_conversion_error(e, size.0, size.1))?;
        let header = parsed.header;
        debug!(
            "Lossless JPEG frame: {}x{}x{} at {} bits, restart {:?}, stuffed {}",
            header.wide, header.high, header.clrs, header.bits, header.restart, stuffed
        );
        let row = try_alloc(header.row_len(), "ljpeg", "row buffer", header.wide, header.high)?;
        let reader = BitReader::new(data.get(parsed.scan_start..).unwrap_or(&[]), stuffed);
        Ok(Self {
            vpred: [1 << (header.bits - 1); 4],
            tables: parsed.tables,
            selectors: parsed.selectors,
            header,
            reader,
            row,
            next_row: 0,
        })
    }

    pub fn header(&self) -> &LjpegHeader {
        &self.header
    }

    pub fn rows_remaining(&self) -> usize {
        self.header.high - self.next_row
    }

    /// Decodes the next row of `wide * clrs` interleaved samples.
    pub fn decode_row(&mut self) -> Result<&[u16]> {
        let (wide, high) = (self.header.wide, self.header.high);
        self.decode_row_inner().map_err(|e| to_conversion_error(e, wide, high))?;
        Ok(&self.row)
    }

    fn decode_row_inner(&mut self) -> std::result::Result<(), LjpegError> {
        let LjpegHeader { bits, wide, clrs, high, restart, .. } = self.header;
        let jrow = self.next_row;
        if jrow >= high {
            return Err(LjpegError::RowsExhausted(high));
        }
        if let Some(interval) = restart {
            if (jrow * wide) % interval == 0 {
                self.vpred = [1 << (bits - 1); 4];
                if jrow > 0 {
                    self.reader.restart()?;
                }
            }
        }

        let lookup = |sel: usize| self.tables[sel].as_ref().ok_or(LjpegError::MissingTable(sel));
        let mut tables = [lookup(self.selectors[0])?; 4];
        for c in 1..clrs {
            tables[c] = lookup(self.selectors[c])?;
        }
        let reader = &mut self.reader;
        let row = &mut self.row;
        let vpred = &mut self.vpred;
        for col in 0..wide {
            for c in 0..clrs {
                let diff = decode_diff(reader, tables[c], bits)?;
                let idx = col * clrs + c;
                let value = if col > 0 {
                    row[idx - clrs] as i32 + diff
                } else {
                    vpred[c] = (vpred[c] + diff) & 0xFFFF;
                    vpred[c]
                };
                row[idx] = value as u16;
            }
        }
        self.next_row += 1;
        Ok(())
    }
}

fn to_conversion_error(err: LjpegError, width: usize, height: usize) -> ConversionError {
    match err {
        LjpegError::Unsupported(detail) => ConversionError::UnsupportedFormat(detail),
        other => ConversionError::MalformedBitstream {
            stage: "ljpeg",
            width,
            height,
            detail: other.to_string(),
        },
    }
}
