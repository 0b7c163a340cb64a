use super::bit_reader::BitReader;
use super::error::LjpegError;
use super::huffman::HuffmanTable;
use super::{LjpegDecoder, LosslessJpegReader, Slices};
use crate::image_pipeline::common::error::ConversionError;
use crate::image_pipeline::raw::{CfaPattern, RawImageReader, RawMetadata, SensorLayout};

/// One code of length 2, three of length 3, then one for each length 4..=16.
const COUNTS: [u8; 16] = [0, 1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
const SYMBOLS: [u8; 17] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    nbits: u32,
    stuffed: bool,
}

impl BitWriter {
    fn new() -> Self {
        Self::with_stuffing(true)
    }

    fn with_stuffing(stuffed: bool) -> Self {
        Self { out: Vec::new(), acc: 0, nbits: 0, stuffed }
    }

    fn put(&mut self, value: u32, len: u32) {
        for i in (0..len).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.nbits += 1;
            if self.nbits == 8 {
                let byte = self.acc as u8;
                self.out.push(byte);
                if byte == 0xFF && self.stuffed {
                    self.out.push(0x00);
                }
                self.acc = 0;
                self.nbits = 0;
            }
        }
    }

    /// Pads the last partial byte with one bits.
    fn flush(&mut self) {
        while self.nbits != 0 {
            self.put(1, 1);
        }
    }
}

fn canonical_codes() -> [(u32, u32); 17] {
    let mut codes = [(0, 0); 17];
    let mut code = 0u32;
    let mut k = 0;
    for (i, &count) in COUNTS.iter().enumerate() {
        for _ in 0..count {
            codes[SYMBOLS[k] as usize] = (code, i as u32 + 1);
            code += 1;
            k += 1;
        }
        code <<= 1;
    }
    codes
}

fn put_diff(w: &mut BitWriter, codes: &[(u32, u32); 17], diff: i32, bits: u8) {
    if diff == 0 {
        let (code, len) = codes[0];
        w.put(code, len);
        return;
    }
    if bits == 16 && diff == -32768 {
        let (code, len) = codes[16];
        w.put(code, len);
        return;
    }
    let len = 32 - diff.unsigned_abs().leading_zeros();
    let (code, code_len) = codes[len as usize];
    w.put(code, code_len);
    let value = if diff > 0 { diff } else { diff + (1 << len) - 1 };
    w.put(value as u32, len);
}

struct Frame {
    bits: u8,
    wide: usize,
    high: usize,
    clrs: usize,
    restart: Option<usize>,
    predictor: u8,
    stuffed: bool,
}

impl Frame {
    fn new(bits: u8, wide: usize, high: usize, clrs: usize) -> Self {
        Self { bits, wide, high, clrs, restart: None, predictor: 1, stuffed: true }
    }

    fn headers(&self, sof: u16) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(&sof.to_be_bytes());
        out.extend_from_slice(&((8 + 3 * self.clrs) as u16).to_be_bytes());
        out.push(self.bits);
        out.extend_from_slice(&(self.high as u16).to_be_bytes());
        out.extend_from_slice(&(self.wide as u16).to_be_bytes());
        out.push(self.clrs as u8);
        for c in 0..self.clrs {
            out.extend_from_slice(&[c as u8 + 1, 0x11, 0]);
        }

        out.extend_from_slice(&[0xFF, 0xC4, 0x00, 36, 0x00]);
        out.extend_from_slice(&COUNTS);
        out.extend_from_slice(&SYMBOLS);

        if let Some(interval) = self.restart {
            out.extend_from_slice(&[0xFF, 0xDD, 0x00, 0x04]);
            out.extend_from_slice(&(interval as u16).to_be_bytes());
        }

        out.extend_from_slice(&[0xFF, 0xDA]);
        out.extend_from_slice(&((6 + 2 * self.clrs) as u16).to_be_bytes());
        out.push(self.clrs as u8);
        for c in 0..self.clrs {
            out.extend_from_slice(&[c as u8 + 1, 0x00]);
        }
        out.extend_from_slice(&[self.predictor, 0, 0]);
        out
    }

    /// Encodes already computed differences, `wide * clrs` per row.
    fn encode_diffs(&self, diffs: &[i32]) -> Vec<u8> {
        let codes = canonical_codes();
        let mut out = self.headers(0xFFC3);
        let mut w = BitWriter::with_stuffing(self.stuffed);
        let row_len = self.wide * self.clrs;
        let mut rst = 0u8;
        for (row, chunk) in diffs.chunks(row_len).enumerate() {
            if let Some(interval) = self.restart {
                if row > 0 && (row * self.wide) % interval == 0 {
                    w.flush();
                    w.out.extend_from_slice(&[0xFF, 0xD0 + (rst % 8)]);
                    rst += 1;
                }
            }
            for &diff in chunk {
                put_diff(&mut w, &codes, diff, self.bits);
            }
        }
        w.flush();
        out.extend_from_slice(&w.out);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn encode(&self, samples: &[u16]) -> Vec<u8> {
        let row_len = self.wide * self.clrs;
        let mut vpred = [1i32 << (self.bits - 1); 4];
        let mut diffs = Vec::with_capacity(samples.len());
        for row in 0..self.high {
            if let Some(interval) = self.restart {
                if (row * self.wide) % interval == 0 {
                    vpred = [1 << (self.bits - 1); 4];
                }
            }
            for idx in 0..row_len {
                let (col, c) = (idx / self.clrs, idx % self.clrs);
                let sample = samples[row * row_len + idx] as i32;
                let pred = if col > 0 {
                    samples[row * row_len + idx - self.clrs] as i32
                } else {
                    let pred = vpred[c];
                    vpred[c] = sample;
                    pred
                };
                let mut diff = sample - pred;
                if diff > 32767 {
                    diff -= 65536;
                } else if diff < -32768 {
                    diff += 65536;
                }
                diffs.push(diff);
            }
        }
        self.encode_diffs(&diffs)
    }
}

fn decode_all(data: &[u8]) -> Vec<u16> {
    decode_all_with(data, true)
}

fn decode_all_with(data: &[u8], stuffed: bool) -> Vec<u16> {
    let mut decoder = LjpegDecoder::with_byte_stuffing(data, stuffed).unwrap();
    let mut out = Vec::new();
    while decoder.rows_remaining() > 0 {
        out.extend_from_slice(decoder.decode_row().unwrap());
    }
    out
}

fn gradient(len: usize, max: u16) -> Vec<u16> {
    (0..len).map(|i| ((i * 37 + (i / 5) * 11) % (max as usize + 1)) as u16).collect()
}

#[test]
fn test_bit_reader_plain_bytes() {
    let data = [0xFF, 0x00, 0xAB];
    let mut reader = BitReader::new(&data, false);
    assert_eq!(reader.get_bits(8).unwrap(), 0xFF);
    assert_eq!(reader.get_bits(8).unwrap(), 0x00);
    assert_eq!(reader.get_bits(4).unwrap(), 0xA);
    assert_eq!(reader.get_bits(4).unwrap(), 0xB);
    assert!(matches!(reader.get_bits(1), Err(LjpegError::UnexpectedEof)));
}

#[test]
fn test_bit_reader_unstuffs_ff00() {
    let data = [0xFF, 0x00, 0x12];
    let mut reader = BitReader::new(&data, true);
    assert_eq!(reader.get_bits(12).unwrap(), 0xFF1);
    assert_eq!(reader.get_bits(4).unwrap(), 0x2);
    assert!(reader.get_bit().is_err());
}

#[test]
fn test_bit_reader_stops_at_marker() {
    let data = [0xAB, 0xFF, 0xD9, 0x77];
    let mut reader = BitReader::new(&data, true);
    assert_eq!(reader.get_bits(8).unwrap(), 0xAB);
    assert!(matches!(reader.get_bits(1), Err(LjpegError::UnexpectedEof)));
    assert_eq!(reader.marker(), Some(0xD9));
}

#[test]
fn test_bit_reader_restart_marker() {
    let data = [0b1010_0000, 0xFF, 0xD0, 0x55];
    let mut reader = BitReader::new(&data, true);
    assert_eq!(reader.get_bits(3).unwrap(), 0b101);
    reader.restart().unwrap();
    assert_eq!(reader.get_bits(8).unwrap(), 0x55);
}

#[test]
fn test_bit_reader_restart_with_unread_data() {
    let data = [0xA0, 0x12, 0x34, 0xFF, 0xD0];
    let mut reader = BitReader::new(&data, true);
    reader.get_bits(3).unwrap();
    assert!(matches!(reader.restart(), Err(LjpegError::MissingRestart(_))));
}

#[test]
fn test_bit_reader_unstuffed_restart_rewinds_prefetched_bytes() {
    // the fast refill pulls the marker and the next byte into the buffer
    let data = [0b1010_0000, 0xFF, 0xD0, 0x55, 0xFF, 0x00, 0x12, 0x34, 0x56];
    let mut reader = BitReader::new(&data, false);
    assert_eq!(reader.get_bits(3).unwrap(), 0b101);
    reader.restart().unwrap();
    assert_eq!(reader.get_bits(8).unwrap(), 0x55);
    assert_eq!(reader.get_bits(16).unwrap(), 0xFF00);
}

#[test]
fn test_huffman_decodes_canonical_codes() {
    let table = HuffmanTable::from_dht(0, &COUNTS, &SYMBOLS).unwrap();
    let codes = canonical_codes();
    let mut w = BitWriter::new();
    for &(code, len) in &codes {
        w.put(code, len);
    }
    w.flush();
    let mut reader = BitReader::new(&w.out, true);
    for symbol in 0..=16u8 {
        assert_eq!(table.decode(&mut reader).unwrap(), symbol);
    }
}

#[test]
fn test_huffman_rejects_oversubscribed_lengths() {
    let mut counts = [0u8; 16];
    counts[0] = 3;
    let result = HuffmanTable::from_dht(1, &counts, &[0, 1, 2]);
    assert!(matches!(result, Err(LjpegError::BadTable { table: 1, .. })));
}

#[test]
fn test_huffman_rejects_symbol_above_16() {
    let mut counts = [0u8; 16];
    counts[1] = 2;
    let result = HuffmanTable::from_dht(0, &counts, &[3, 17]);
    assert!(matches!(result, Err(LjpegError::BadTable { .. })));
}

#[test]
fn test_huffman_missing_branch_is_invalid_code() {
    // a single code "0": the "1" branch leads nowhere
    let mut counts = [0u8; 16];
    counts[0] = 1;
    let table = HuffmanTable::from_dht(0, &counts, &[5]).unwrap();
    let data = [0x80];
    let mut reader = BitReader::new(&data, true);
    assert!(matches!(table.decode(&mut reader), Err(LjpegError::InvalidCode)));
}

#[test]
fn test_header_fields() {
    let frame = Frame::new(12, 6, 3, 2);
    let data = frame.encode(&gradient(36, 4095));
    let decoder = LjpegDecoder::new(&data).unwrap();
    let header = decoder.header();
    assert_eq!(header.bits, 12);
    assert_eq!(header.wide, 6);
    assert_eq!(header.high, 3);
    assert_eq!(header.clrs, 2);
    assert_eq!(header.row_len(), 12);
    assert_eq!(header.restart, None);
    assert_eq!(header.predictor, 1);
}

#[test]
fn test_round_trip_single_channel() {
    let frame = Frame::new(12, 7, 5, 1);
    let samples = gradient(35, 4095);
    assert_eq!(decode_all(&frame.encode(&samples)), samples);
}

#[test]
fn test_round_trip_interleaved_channels() {
    for clrs in 2..=4 {
        let frame = Frame::new(14, 5, 4, clrs);
        let samples = gradient(5 * 4 * clrs, 16383);
        assert_eq!(decode_all(&frame.encode(&samples)), samples, "clrs = {clrs}");
    }
}

#[test]
fn test_round_trip_with_restart_intervals() {
    let mut frame = Frame::new(12, 4, 6, 2);
    frame.restart = Some(8);
    let samples = gradient(4 * 6 * 2, 4095);
    let data = frame.encode(&samples);
    assert!(data.windows(2).any(|w| w == [0xFF, 0xD0]));
    assert!(data.windows(2).any(|w| w == [0xFF, 0xD1]));
    assert_eq!(decode_all(&data), samples);
}

#[test]
fn test_every_difference_length() {
    let mut diffs = Vec::new();
    for len in 1..=15 {
        diffs.push(1 << (len - 1));
        diffs.push(-((1 << len) - 1));
    }
    diffs.push(-32768);
    diffs.push(0);
    let frame = Frame::new(16, diffs.len(), 1, 1);
    let decoded = decode_all(&frame.encode_diffs(&diffs));

    let mut expected = Vec::new();
    let mut value = 1i32 << 15;
    for &diff in &diffs {
        value = (value + diff) & 0xFFFF;
        expected.push(value as u16);
    }
    assert_eq!(decoded, expected);
}

#[test]
fn test_first_column_predicts_from_row_above() {
    let frame = Frame::new(8, 2, 3, 1);
    // first-column diffs of 5 accumulate down the rows
    let data = frame.encode_diffs(&[5, 0, 5, 1, 5, 2]);
    assert_eq!(decode_all(&data), vec![133, 133, 138, 139, 143, 145]);
}

#[test]
fn test_length_beyond_precision_is_malformed() {
    let frame = Frame::new(8, 2, 1, 1);
    let data = frame.encode_diffs(&[300, 0]);
    let mut decoder = LjpegDecoder::new(&data).unwrap();
    assert!(matches!(
        decoder.decode_row(),
        Err(ConversionError::MalformedBitstream { stage: "ljpeg", width: 2, height: 1, .. })
    ));
}

#[test]
fn test_truncated_scan_is_malformed() {
    let frame = Frame::new(12, 16, 4, 1);
    let data = frame.encode(&gradient(64, 4095));
    let cut = frame.headers(0xFFC3).len() + 4;
    let mut decoder = LjpegDecoder::new(&data[..cut]).unwrap();
    let result = (0..4).try_for_each(|_| decoder.decode_row().map(|_| ()));
    assert!(matches!(result, Err(ConversionError::MalformedBitstream { .. })));
}

#[test]
fn test_reading_past_last_row_fails() {
    let frame = Frame::new(10, 3, 1, 1);
    let data = frame.encode(&[1, 2, 3]);
    let mut decoder = LjpegDecoder::new(&data).unwrap();
    decoder.decode_row().unwrap();
    assert_eq!(decoder.rows_remaining(), 0);
    assert!(decoder.decode_row().is_err());
}

#[test]
fn test_missing_soi() {
    let frame = Frame::new(12, 2, 2, 1);
    let data = frame.encode(&[1, 2, 3, 4]);
    assert!(matches!(
        LjpegDecoder::new(&data[2..]),
        Err(ConversionError::MalformedBitstream { .. })
    ));
}

#[test]
fn test_baseline_frame_is_unsupported() {
    let frame = Frame::new(8, 2, 2, 1);
    let mut data = frame.headers(0xFFC0);
    data.extend_from_slice(&[0xFF, 0xD9]);
    assert!(matches!(LjpegDecoder::new(&data), Err(ConversionError::UnsupportedFormat(_))));
}

#[test]
fn test_other_predictors_are_unsupported() {
    let mut frame = Frame::new(12, 2, 2, 1);
    frame.predictor = 6;
    let data = frame.encode(&[1, 2, 3, 4]);
    assert!(matches!(LjpegDecoder::new(&data), Err(ConversionError::UnsupportedFormat(_))));
}

#[test]
fn test_reader_fills_mosaic() {
    let frame = Frame::new(12, 4, 2, 1);
    let samples: Vec<u16> = (10..18).collect();
    let reader = LosslessJpegReader::new(CfaPattern::RGGB, RawMetadata::default());
    let raw = reader.read_raw(&frame.encode(&samples)).unwrap();
    let image = &raw.image;
    assert_eq!((image.width, image.height), (4, 2));
    assert_eq!(image.pixel(0, 0), &[10, 0, 0, 0]);
    assert_eq!(image.pixel(0, 1), &[0, 11, 0, 0]);
    assert_eq!(image.pixel(1, 0), &[0, 14, 0, 0]);
    assert_eq!(image.pixel(1, 1), &[0, 0, 15, 0]);
}

#[test]
fn test_reader_two_component_rows_fill_wide_readout() {
    // 2 components x 2 columns per JPEG row make one 4-sample sensor row
    let frame = Frame::new(12, 2, 2, 2);
    let samples: Vec<u16> = (1..=8).collect();
    let reader = LosslessJpegReader::new(CfaPattern::MONOCHROME, RawMetadata::default());
    let reader = LosslessJpegReader { colors: 1, ..reader };
    let raw = reader.read_raw(&frame.encode(&samples)).unwrap();
    assert_eq!((raw.image.width, raw.image.height), (4, 2));
    let natives: Vec<u16> = (0..2)
        .flat_map(|r| (0..4).map(move |c| (r, c)))
        .map(|(r, c)| raw.image.native(r, c))
        .collect();
    assert_eq!(natives, samples);
}

#[test]
fn test_reader_slices() {
    let frame = Frame::new(12, 8, 1, 1);
    let samples: Vec<u16> = (1..=8).collect();
    let mut reader = LosslessJpegReader::new(CfaPattern::MONOCHROME, RawMetadata::default());
    reader.colors = 1;
    reader.layout = Some(SensorLayout::full(4, 2));
    reader.slices = Some(Slices { count: 1, width: 2, last_width: 2 });
    let raw = reader.read_raw(&frame.encode(&samples)).unwrap();
    let rows: Vec<Vec<u16>> = (0..2)
        .map(|r| (0..4).map(|c| raw.image.native(r, c)).collect())
        .collect();
    assert_eq!(rows, vec![vec![1, 2, 5, 6], vec![3, 4, 7, 8]]);
}

#[test]
fn test_reader_curve_and_margin_black() {
    let frame = Frame::new(10, 6, 2, 1);
    // visible 4 columns, 2 masked columns of value 8 on the right
    let samples: Vec<u16> = vec![100, 101, 102, 103, 8, 8, 104, 105, 106, 107, 8, 8];
    let mut reader = LosslessJpegReader::new(CfaPattern::MONOCHROME, RawMetadata::default());
    reader.colors = 1;
    reader.curve = Some((0..1024).map(|v| v * 2).collect());
    reader.black_from_margin = true;
    reader.layout = Some(SensorLayout {
        raw_width: 6,
        raw_height: 2,
        top_margin: 0,
        left_margin: 0,
        width: 4,
        height: 2,
    });
    let raw = reader.read_raw(&frame.encode(&samples)).unwrap();
    assert_eq!(raw.metadata.black, 16);
    assert_eq!(raw.image.native(0, 0), 200);
    assert_eq!(raw.image.native(1, 3), 214);
}

#[test]
fn test_unstuffed_stream_keeps_literal_ff_bytes() {
    // 32767 codes as fifteen one bits after its length code
    let diffs: Vec<i32> = (0..16).map(|i| if i % 2 == 0 { 32767 } else { -32767 }).collect();
    let mut frame = Frame::new(16, 8, 2, 1);
    let stuffed = frame.encode_diffs(&diffs);
    frame.stuffed = false;
    let plain = frame.encode_diffs(&diffs);

    assert!(plain.len() < stuffed.len());
    let scan = &plain[frame.headers(0xFFC3).len()..plain.len() - 2];
    assert!(scan.contains(&0xFF));
    assert_eq!(decode_all_with(&plain, false), decode_all(&stuffed));
}

#[test]
fn test_unstuffed_stream_with_restart_intervals() {
    let mut frame = Frame::new(16, 4, 6, 1);
    frame.restart = Some(4);
    frame.stuffed = false;
    let samples = gradient(24, 65535);
    assert_eq!(decode_all_with(&frame.encode(&samples), false), samples);
}

#[test]
fn test_reader_without_byte_stuffing() {
    let mut frame = Frame::new(12, 4, 2, 1);
    frame.stuffed = false;
    let samples: Vec<u16> = (10..18).collect();
    let mut reader = LosslessJpegReader::new(CfaPattern::RGGB, RawMetadata::default());
    reader.byte_stuffing = false;
    let raw = reader.read_raw(&frame.encode(&samples)).unwrap();
    assert_eq!(raw.image.native(1, 3), 17);
}

#[test]
fn test_scan_header_errors_report_frame_size() {
    let frame = Frame::new(12, 6, 3, 1);
    let mut data = frame.headers(0xFFC3);
    // point the only component at table 1, which was never defined
    let sos = data.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
    data[sos + 6] = 0x10;
    data.extend_from_slice(&[0x00, 0xFF, 0xD9]);
    assert!(matches!(
        LjpegDecoder::new(&data),
        Err(ConversionError::MalformedBitstream { stage: "ljpeg", width: 6, height: 3, .. })
    ));
}

#[test]
fn test_errors_before_the_frame_header_have_no_size() {
    let frame = Frame::new(12, 6, 3, 1);
    // DHT ahead of SOF3 with a table class the decoder rejects
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC4, 0x00, 0x03, 0x10];
    data.extend_from_slice(&frame.headers(0xFFC3)[2..]);
    assert!(matches!(
        LjpegDecoder::new(&data),
        Err(ConversionError::MalformedBitstream { width: 0, height: 0, .. })
    ));
}
