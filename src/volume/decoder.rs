//! Raw product data decoder.
//!
//! A raw product file is a sequence of 6144-byte physical records. Records
//! #1 and #2 carry the product and ingest headers; every later record
//! starts with a 12-byte raw_prod_bhdr and carries the compressed ray
//! stream. Rays may span record boundaries, so the decompressor consumes
//! 16-bit tokens from a reader that strips record headers transparently
//! and never depends on physical positions.

use std::io::Read;

use log::warn;

use crate::bits::bin2_to_radians;
use crate::error::{Result, SigmetError};
use crate::tm::Ymds;
use crate::volume::headers::{IngestHdr, ProdHdr, INGEST_HDR_SIZE, PROD_HDR_SIZE};
use crate::volume::{DecoderConfig, Ray, RayHdr, SweepHdr, Volume, VolumeHdr};

/// Physical record size.
pub const RECORD_SIZE: usize = 6144;

/// Size of the raw_prod_bhdr at the start of each data record.
pub const RAW_PROD_BHDR_SIZE: usize = 12;

/// Wire size of a ray header inside a decompressed ray chunk.
pub const RAY_HDR_WIRE_SIZE: usize = 12;

/// Wire size of a sweep header at the start of each sweep.
pub const SWEEP_HDR_WIRE_SIZE: usize = 20;

/// End-of-ray token.
const TOK_END_RAY: u16 = 0x0000;
/// End-of-sweep token.
const TOK_END_SWEEP: u16 = 0x8000;

/// Read exactly one physical record. Returns false on a clean end of file
/// at a record boundary; a partial record is a truncated stream.
fn read_record<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(SigmetError::TruncatedStream(format!(
                    "record ends after {} of {} bytes",
                    filled, RECORD_SIZE
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Token reader over the data records of a raw product file. Loading a
/// record consumes its raw_prod_bhdr; reads never cross a token across a
/// record boundary because the payload length is even.
struct RecordStream<R: Read> {
    src: R,
    record: Vec<u8>,
    pos: usize,
    loaded: bool,
    /// 1-based sweep number from the last raw_prod_bhdr
    sweep_num: i16,
}

impl<R: Read> RecordStream<R> {
    fn new(src: R) -> Self {
        Self {
            src,
            record: vec![0u8; RECORD_SIZE],
            pos: RECORD_SIZE,
            loaded: false,
            sweep_num: 0,
        }
    }

    /// Load the next data record and consume its raw_prod_bhdr. False on a
    /// clean end of file.
    fn load_next(&mut self) -> Result<bool> {
        if !read_record(&mut self.src, &mut self.record)? {
            self.loaded = false;
            return Ok(false);
        }
        // raw_prod_bhdr: record number, sweep number, offset of first ray
        // header, ray number, flags.
        self.sweep_num = crate::bits::le_i16(&self.record, 2)?;
        self.pos = RAW_PROD_BHDR_SIZE;
        self.loaded = true;
        Ok(true)
    }

    /// Drop the remainder of the current record so the next read starts a
    /// fresh one.
    fn finish_record(&mut self) {
        self.loaded = false;
        self.pos = RECORD_SIZE;
    }

    fn exhausted(&self) -> bool {
        !self.loaded || self.pos + 2 > RECORD_SIZE
    }

    /// Next 16-bit little-endian word, crossing into the next record as
    /// needed. End of file here is a truncated stream.
    fn word(&mut self, expect_sweep: i16) -> Result<u16> {
        if self.exhausted() {
            if !self.load_next()? {
                return Err(SigmetError::TruncatedStream(
                    "ray stream ends inside a sweep".to_string(),
                ));
            }
            if self.sweep_num != expect_sweep {
                warn!(
                    "record claims sweep {} while decoding sweep {}",
                    self.sweep_num, expect_sweep
                );
            }
        }
        let w = crate::bits::le_u16(&self.record, self.pos)?;
        self.pos += 2;
        Ok(w)
    }

    /// Read `n` payload bytes (n even) into a fresh buffer.
    fn bytes(&mut self, n: usize, expect_sweep: i16) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let w = self.word(expect_sweep)?;
            out.extend_from_slice(&w.to_le_bytes());
        }
        Ok(out)
    }
}

/// Outcome of decoding one ray chunk.
enum Chunk {
    /// Bytes materialized before the end-of-ray token (capped at the
    /// expected size). Zero means the ray is absent.
    Data(usize),
    /// The sweep ended where a ray chunk was expected.
    EndOfSweep,
}

/// Decompress one ray chunk of `expected` bytes into `scratch`, which must
/// be at least that long and comes back zero-filled past the produced
/// bytes. Every chunk is terminated by an end-of-ray token; a run or
/// literal that would overflow the expected size truncates to it.
fn read_chunk<R: Read>(
    stream: &mut RecordStream<R>,
    expected: usize,
    scratch: &mut [u8],
    expect_sweep: i16,
) -> Result<Chunk> {
    scratch[..expected].fill(0);
    let mut produced = 0usize;
    let mut first = true;
    loop {
        let tok = stream.word(expect_sweep)?;
        if tok == TOK_END_RAY {
            return Ok(Chunk::Data(produced));
        }
        if tok == TOK_END_SWEEP {
            if first {
                return Ok(Chunk::EndOfSweep);
            }
            return Err(SigmetError::MalformedHeader(
                "end-of-sweep token inside a ray".to_string(),
            ));
        }
        first = false;
        if tok & 0x8000 != 0 {
            // Run of zero words; the scratch area is already zeroed.
            let run_bytes = 2 * (tok & 0x7fff) as usize;
            produced = (produced + run_bytes).min(expected);
        } else {
            // Literal copy of tok data words.
            for _ in 0..tok {
                let w = stream.word(expect_sweep)?;
                if produced + 2 <= expected {
                    scratch[produced..produced + 2].copy_from_slice(&w.to_le_bytes());
                    produced += 2;
                } else {
                    // Overflowing words are consumed and dropped.
                    produced = expected;
                }
            }
        }
    }
}

/// Decode the sweep header at the start of a sweep's first record.
/// Returns None when the stream marks no more sweeps.
fn read_sweep_header<R: Read>(
    stream: &mut RecordStream<R>,
    expect_sweep: i16,
) -> Result<Option<(SweepHdr, i16)>> {
    let start_az = stream.word(expect_sweep)?;
    if start_az == TOK_END_RAY {
        return Ok(None);
    }
    let _start_el = stream.word(expect_sweep)?;
    let tm_bytes = stream.bytes(crate::tm::YMDS_WIRE_SIZE, expect_sweep)?;
    let tm = Ymds::decode(&tm_bytes, 0)?;
    let angle = bin2_to_radians(stream.word(expect_sweep)?);
    let declared_rays = stream.word(expect_sweep)? as i16;
    Ok(Some((SweepHdr { tm, angle }, declared_rays)))
}

/// Decode the ray header at the front of a decompressed chunk.
fn decode_ray_hdr(buf: &[u8]) -> Result<RayHdr> {
    let num_bins = crate::bits::le_i16(buf, 8)?;
    if num_bins < 0 {
        return Err(SigmetError::MalformedHeader(format!(
            "ray claims {} bins",
            num_bins
        )));
    }
    Ok(RayHdr {
        az0: bin2_to_radians(crate::bits::le_u16(buf, 0)?) as f32,
        tilt0: bin2_to_radians(crate::bits::le_u16(buf, 2)?) as f32,
        az1: bin2_to_radians(crate::bits::le_u16(buf, 4)?) as f32,
        tilt1: bin2_to_radians(crate::bits::le_u16(buf, 6)?) as f32,
        num_bins: num_bins as i32,
        tm: crate::bits::le_u16(buf, 10)? as u32,
    })
}

/// Read the two header records and resolve data types.
pub fn read_volume_headers<R: Read>(src: &mut R, cfg: &DecoderConfig) -> Result<VolumeHdr> {
    let mut record = vec![0u8; RECORD_SIZE];
    if !read_record(src, &mut record)? {
        return Err(SigmetError::TruncatedStream(
            "file ends before the product header".to_string(),
        ));
    }
    let prod_hdr = ProdHdr::decode(&record[..PROD_HDR_SIZE])?;
    if !read_record(src, &mut record)? {
        return Err(SigmetError::TruncatedStream(
            "file ends before the ingest header".to_string(),
        ));
    }
    let ingest_hdr = IngestHdr::decode(&record[..INGEST_HDR_SIZE])?;
    let mut hdr = VolumeHdr {
        prod_hdr,
        ingest_hdr,
        types: Vec::new(),
    };
    hdr.resolve_types(cfg.strict)?;
    hdr.validate()?;
    Ok(hdr)
}

/// Decode a complete volume: headers, sweep headers, ray grid, and the
/// shared sample buffer.
pub fn read_volume<R: Read>(mut src: R, cfg: &DecoderConfig) -> Result<Volume> {
    let hdr = read_volume_headers(&mut src, cfg)?;
    let num_sweeps = hdr.num_sweeps();
    let num_rays = hdr.num_rays();
    let num_types = hdr.num_types();
    let ray_hdr_size = hdr.ray_hdr_size();

    // Every set mask bit owns a chunk slot in the ray stream, including
    // bits with no registered descriptor. Unknown slots are consumed and
    // dropped so the known slots stay framed.
    let mut slots: Vec<Option<&'static crate::types::DataType>> = Vec::new();
    for (w, word) in hdr.ingest_hdr.task_cfg.dsp.curr_data_mask.words().iter().enumerate() {
        for b in 0..32u32 {
            if word & (1 << b) != 0 {
                slots.push(crate::types::get_by_bit((w as u32) * 32 + b));
            }
        }
    }

    // Expected decompressed chunk size per slot; unknown slots get a
    // worst-case cap, their chunks are self-delimited anyway.
    let mut expected = Vec::with_capacity(slots.len());
    let mut chunk_max = 0usize;
    for slot in &slots {
        let e = match slot {
            Some(t) => ray_hdr_size + t.max_ray_data_size(&hdr)?,
            None => ray_hdr_size + 2 * hdr.num_bins_out(),
        };
        chunk_max = chunk_max.max(e);
        expected.push(e);
    }

    let buf_size = hdr.sample_buffer_size()?;
    let mut data = vec![0u8; buf_size];
    let mut cursor = 0usize;
    let mut rays = vec![Ray::default(); num_sweeps * num_rays * num_types];
    let mut sweep_hdrs = vec![SweepHdr::default(); num_sweeps];
    let mut scratch = vec![0u8; chunk_max];

    let mut stream = RecordStream::new(src);
    let mut sweeps_read = 0usize;
    'sweeps: for s in 0..num_sweeps {
        let expect_sweep = (s + 1) as i16;
        stream.finish_record();
        if !stream.load_next()? {
            break;
        }
        if stream.sweep_num != expect_sweep {
            warn!(
                "sweep {} starts in a record claiming sweep {}",
                expect_sweep, stream.sweep_num
            );
        }
        let (swp_hdr, declared_rays) = match read_sweep_header(&mut stream, expect_sweep)? {
            Some(v) => v,
            None => break,
        };
        if declared_rays as usize > num_rays {
            warn!(
                "sweep {} declares {} rays, volume allows {}",
                expect_sweep, declared_rays, num_rays
            );
        }
        sweep_hdrs[s] = swp_hdr;
        sweeps_read = s + 1;
        for r in 0..num_rays {
            let mut t = 0usize;
            for (slot_idx, slot) in slots.iter().enumerate() {
                let exp = expected[slot_idx];
                let produced = match read_chunk(&mut stream, exp, &mut scratch, expect_sweep)? {
                    Chunk::Data(p) => p,
                    Chunk::EndOfSweep => continue 'sweeps,
                };
                let ty = match slot {
                    Some(ty) => {
                        t += 1;
                        *ty
                    }
                    // Unregistered slot; its chunk has been consumed.
                    None => continue,
                };
                let t = t - 1;
                if produced == 0 {
                    continue;
                }
                let ray_hdr = decode_ray_hdr(&scratch[..ray_hdr_size])?;
                let bins = ray_hdr.num_bins as usize;
                if bins > hdr.num_bins_out() {
                    return Err(SigmetError::MalformedHeader(format!(
                        "ray claims {} bins, volume allows {}",
                        bins,
                        hdr.num_bins_out()
                    )));
                }
                let len = ty.ray_data_size(bins, &hdr)?;
                if cursor + len > data.len() {
                    return Err(SigmetError::MalformedHeader(format!(
                        "ray data at {} overruns the {} byte sample buffer",
                        cursor,
                        data.len()
                    )));
                }
                data[cursor..cursor + len].copy_from_slice(&scratch[ray_hdr_size..ray_hdr_size + len]);
                rays[(s * num_rays + r) * num_types + t] = Ray {
                    hdr: ray_hdr,
                    data: Some((cursor, len)),
                };
                cursor += len;
            }
        }
        // A fully populated sweep still carries its end marker.
        let tok = stream.word(expect_sweep)?;
        if tok != TOK_END_SWEEP {
            return Err(SigmetError::MalformedHeader(format!(
                "expected end-of-sweep token, got {:#06x}",
                tok
            )));
        }
    }
    if sweeps_read == 0 {
        return Err(SigmetError::MalformedHeader(
            "volume has no sweep data".to_string(),
        ));
    }
    Ok(Volume::from_parts(hdr, sweep_hdrs, sweeps_read, rays, data))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testgen::{default_tm, two_sweep_dbz_volume, xhdr_volume, VolumeBuilder};

    #[test]
    fn test_decode_simple_volume() {
        let bytes = two_sweep_dbz_volume();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert_eq!(vol.num_sweeps(), 2);
        assert_eq!(vol.num_rays(), 4);
        assert_eq!(vol.num_types(), 1);
        assert_eq!(vol.sweeps_read, 2);
        assert_eq!(vol.sample_buffer_len(), 2 * 4 * 1 * 3);
        for s in 0..2 {
            for r in 0..4 {
                let ray = vol.ray(s, r, 0).unwrap();
                assert_eq!(ray.hdr.num_bins, 3);
                let base = (r + s) as u8;
                let dat = vol.ray_data(s, r, 0).unwrap().unwrap();
                assert_eq!(dat, &[10 + base, 20 + base, 30 + base]);
            }
        }
    }

    #[test]
    fn test_decode_angles_in_range() {
        let bytes = two_sweep_dbz_volume();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        for s in 0..2 {
            for r in 0..4 {
                let h = vol.ray(s, r, 0).unwrap().hdr;
                for a in [h.az0, h.tilt0, h.az1, h.tilt1] {
                    assert!(a.is_finite());
                    assert!((0.0..std::f64::consts::TAU as f32).contains(&a));
                }
            }
        }
    }

    #[test]
    fn test_decode_zero_run_compression() {
        // Ray body arrives as literal + zero run + literal; decompressed
        // length and content must match.
        let mut b = VolumeBuilder::new(1 << 2, 1, 1, 8);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        let hdr_payload = VolumeBuilder::ray_payload(9000, 9100, 8, 0, &[0xaa, 0xbb]);
        b.literal(&hdr_payload);
        b.zero_run(2);
        b.literal(&[0xcc, 0xdd]);
        b.end_ray();
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        let dat = vol.ray_data(0, 0, 0).unwrap().unwrap();
        assert_eq!(dat, &[0xaa, 0xbb, 0, 0, 0, 0, 0xcc, 0xdd]);
    }

    #[test]
    fn test_decode_early_end_zero_pads() {
        // End-of-ray right after the header: all bins read back as zero.
        let mut b = VolumeBuilder::new(1 << 2, 1, 1, 4);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        let payload = VolumeBuilder::ray_payload(9000, 9100, 4, 0, &[]);
        b.ray_chunk(&payload);
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        let dat = vol.ray_data(0, 0, 0).unwrap().unwrap();
        assert_eq!(dat, &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_absent_ray() {
        let mut b = VolumeBuilder::new(1 << 2, 1, 2, 3);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 2);
        b.absent_ray();
        let payload = VolumeBuilder::ray_payload(9000, 9100, 3, 0, &[1, 2, 3]);
        b.ray_chunk(&payload);
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert!(vol.ray_data(0, 0, 0).unwrap().is_none());
        assert_eq!(vol.ray_data(0, 1, 0).unwrap().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_decode_early_end_of_sweep() {
        // Sweep marker after the first of two rays: the rest is absent.
        let mut b = VolumeBuilder::new(1 << 2, 1, 2, 3);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 2);
        let payload = VolumeBuilder::ray_payload(9000, 9100, 3, 0, &[1, 2, 3]);
        b.ray_chunk(&payload);
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert!(vol.ray_data(0, 0, 0).unwrap().is_some());
        assert!(vol.ray_data(0, 1, 0).unwrap().is_none());
        assert_eq!(vol.sweeps_read, 1);
    }

    #[test]
    fn test_decode_truncated_file() {
        let bytes = two_sweep_dbz_volume();
        let cut = &bytes[..10000];
        let err = read_volume(cut, &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, SigmetError::TruncatedStream(_)), "{:?}", err);
    }

    #[test]
    fn test_decode_literal_past_end_of_file() {
        let mut b = VolumeBuilder::new(1 << 2, 1, 1, 4);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        // Literal token demanding more words than the stream provides.
        b.word(0x7fff);
        let bytes = b.build();
        let err = read_volume(&bytes[..], &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, SigmetError::TruncatedStream(_)), "{:?}", err);
    }

    #[test]
    fn test_decode_run_overflow_truncates() {
        // A zero run larger than the expected chunk still yields a ray.
        let mut b = VolumeBuilder::new(1 << 2, 1, 1, 4);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        let payload = VolumeBuilder::ray_payload(9000, 9100, 4, 0, &[]);
        b.literal(&payload);
        b.zero_run(0x1000);
        b.end_ray();
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert_eq!(vol.ray_data(0, 0, 0).unwrap().unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_no_sweeps_fails() {
        let b = VolumeBuilder::new(1 << 2, 1, 1, 4);
        let bytes = b.build();
        let err = read_volume(&bytes[..], &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, SigmetError::MalformedHeader(_)), "{:?}", err);
    }

    #[test]
    fn test_decode_zero_marker_ends_sweeps() {
        // A record whose first sweep-header word is zero means no more
        // sweeps; only one of the two declared sweeps exists.
        let mut b = VolumeBuilder::new(1 << 2, 2, 1, 3);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        let payload = VolumeBuilder::ray_payload(9000, 9100, 3, 0, &[1, 2, 3]);
        b.ray_chunk(&payload);
        b.end_sweep();
        b.begin_sweep_record(2);
        b.word(0);
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert_eq!(vol.sweeps_read, 1);
        assert!(vol.ray_data(1, 0, 0).unwrap().is_none());
    }

    #[test]
    fn test_decode_xhdr_volume() {
        // Extended header type at slot 0; ray times come from its
        // millisecond word, not the ray header offset.
        let bytes = xhdr_volume();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert_eq!(vol.num_types(), 2);
        assert!(vol.headers.types[0].is_ext_header());
        let sweep_tm = vol.sweep_hdrs[0].tm.to_seconds();
        let t0 = vol.ray_time(0, 0).unwrap();
        assert!((t0 - (sweep_tm + 1.5)).abs() < 1e-6);
        let t1 = vol.ray_time(0, 1).unwrap();
        assert!((t1 - (sweep_tm + 1.501)).abs() < 1e-6);
    }

    #[test]
    fn test_decode_ray_spanning_records() {
        // A ray big enough to cross a record boundary decodes intact.
        let bins = 4000i16;
        let mut b = VolumeBuilder::new(1 << 2, 1, 2, bins);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 2);
        for r in 0..2u8 {
            let stor: Vec<u8> = (0..bins as usize).map(|i| (i as u8).wrapping_add(r)).collect();
            let payload = VolumeBuilder::ray_payload(9000, 9100, bins, 0, &stor);
            b.ray_chunk(&payload);
        }
        b.end_sweep();
        let bytes = b.build();
        assert!(bytes.len() > 3 * RECORD_SIZE);
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        for r in 0..2u8 {
            let dat = vol.ray_data(0, r as usize, 0).unwrap().unwrap();
            assert_eq!(dat.len(), bins as usize);
            assert_eq!(dat[0], r);
            assert_eq!(dat[100], 100u8.wrapping_add(r));
        }
    }

    #[test]
    fn test_decode_bin_count_over_limit_fails() {
        let mut b = VolumeBuilder::new(1 << 2, 1, 1, 4);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 1);
        // Claims 40 bins in a 4-bin volume.
        let payload = VolumeBuilder::ray_payload(9000, 9100, 40, 0, &[]);
        b.ray_chunk(&payload);
        b.end_sweep();
        let bytes = b.build();
        let err = read_volume(&bytes[..], &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, SigmetError::MalformedHeader(_)), "{:?}", err);
    }

    #[test]
    fn test_unknown_mask_bit_slot_skipped() {
        // Bit 6 has no descriptor. Its chunks still occupy the stream and
        // must be consumed without disturbing the known slot.
        let mut b = VolumeBuilder::new((1 << 2) | (1 << 6), 1, 2, 4);
        b.begin_sweep_record(1);
        b.sweep_header(9000, default_tm(), 1000, 2);
        for r in 0..2u8 {
            let dbz = VolumeBuilder::ray_payload(9000, 9100, 4, 0, &[r + 1, r + 2, r + 3, r + 4]);
            b.ray_chunk(&dbz);
            let unknown = VolumeBuilder::ray_payload(9000, 9100, 4, 0, &[0xde, 0xad, 0xbe, 0xef]);
            b.ray_chunk(&unknown);
        }
        b.end_sweep();
        let bytes = b.build();
        let vol = read_volume(&bytes[..], &DecoderConfig::default()).unwrap();
        assert_eq!(vol.num_types(), 1);
        for r in 0..2u8 {
            let dat = vol.ray_data(0, r as usize, 0).unwrap().unwrap();
            assert_eq!(dat, &[r + 1, r + 2, r + 3, r + 4]);
        }
        // Fatal in strict mode.
        let err = read_volume(&bytes[..], &DecoderConfig::default().with_strict(true)).unwrap_err();
        assert!(matches!(err, SigmetError::UnknownDataType(6)), "{:?}", err);
    }
}
