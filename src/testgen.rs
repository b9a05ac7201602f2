//! Synthetic raw product streams for the test suites.

use crate::tm::Ymds;
use crate::volume::decoder::{RAW_PROD_BHDR_SIZE, RAY_HDR_WIRE_SIZE, RECORD_SIZE};
use crate::volume::headers::{ScanMode, StructHdr, INGEST_HDR_SIZE, PROD_HDR_SIZE};
use crate::volume::VolumeHdr;

const TOK_END_RAY: u16 = 0x0000;
const TOK_END_SWEEP: u16 = 0x8000;

/// Builds a raw product byte stream record by record: headers, sweeps,
/// compressed ray chunks. Every 6144-byte data record starts with a
/// raw_prod_bhdr; word writes insert continuation headers at record
/// boundaries the same way the ingest side does.
pub struct VolumeBuilder {
    hdr: VolumeHdr,
    records: Vec<u8>,
    record_num: i16,
    cur_sweep: i16,
}

impl VolumeBuilder {
    pub fn new(mask_word_0: u32, sweeps: i16, rays: u16, bins: i16) -> Self {
        let mut hdr = VolumeHdr::default();
        hdr.prod_hdr.struct_hdr = StructHdr {
            id: 27,
            format: 8,
            sz: PROD_HDR_SIZE as i32,
            flags: 0,
        };
        hdr.prod_hdr.end.prf = 1000;
        hdr.prod_hdr.end.wave_len = 1070;
        hdr.prod_hdr.end.num_bins_out = bins as i32;
        hdr.ingest_hdr.struct_hdr = StructHdr {
            id: 28,
            format: 8,
            sz: INGEST_HDR_SIZE as i32,
            flags: 0,
        };
        hdr.ingest_hdr.ingest_cfg.num_rays = rays;
        hdr.ingest_hdr.ingest_cfg.ray_hdr_sz = RAY_HDR_WIRE_SIZE as i16;
        hdr.ingest_hdr.ingest_cfg.ext_ray_hdr_sz = 4;
        hdr.ingest_hdr.ingest_cfg.vol_start_tm = default_tm();
        hdr.ingest_hdr.task_cfg.dsp.curr_data_mask.mask_word_0 = mask_word_0;
        hdr.ingest_hdr.task_cfg.dsp.prf = 1000;
        hdr.ingest_hdr.task_cfg.rng.num_bins_out = bins;
        hdr.ingest_hdr.task_cfg.scan.scan_mode = ScanMode::PpiContinuous;
        hdr.ingest_hdr.task_cfg.scan.num_sweeps = sweeps;
        Self {
            hdr,
            records: Vec::new(),
            record_num: 2,
            cur_sweep: 0,
        }
    }

    pub fn hdr_mut(&mut self) -> &mut VolumeHdr {
        &mut self.hdr
    }

    fn pad_current_record(&mut self) {
        let end = self.records.len().div_ceil(RECORD_SIZE) * RECORD_SIZE;
        self.records.resize(end, 0);
    }

    /// Open a fresh data record with its raw_prod_bhdr when the cursor
    /// sits on a record boundary.
    fn ensure_record(&mut self) {
        if self.records.len() % RECORD_SIZE != 0 {
            return;
        }
        self.record_num += 1;
        self.records.extend_from_slice(&self.record_num.to_le_bytes());
        self.records.extend_from_slice(&self.cur_sweep.to_le_bytes());
        self.records.extend_from_slice(&(RAW_PROD_BHDR_SIZE as i16).to_le_bytes());
        self.records.extend_from_slice(&0i16.to_le_bytes());
        self.records.extend_from_slice(&0u16.to_le_bytes());
        self.records.extend_from_slice(&0u16.to_le_bytes());
    }

    /// Close the current record; the next sweep starts on a fresh one.
    pub fn begin_sweep_record(&mut self, sweep_1based: i16) {
        self.pad_current_record();
        self.cur_sweep = sweep_1based;
    }

    /// One payload word, spilling into a continuation record as needed.
    pub fn word(&mut self, w: u16) {
        self.ensure_record();
        self.records.extend_from_slice(&w.to_le_bytes());
    }

    fn words(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(2) {
            let hi = chunk.get(1).copied().unwrap_or(0);
            self.word(u16::from_le_bytes([chunk[0], hi]));
        }
    }

    pub fn sweep_header(&mut self, start_az: u16, tm: Ymds, angle: u16, rays: i16) {
        self.word(start_az);
        self.word(0);
        let mut t = Vec::new();
        tm.encode_into(&mut t);
        self.words(&t);
        self.word(angle);
        self.word(rays as u16);
    }

    /// A literal-copy token followed by its payload, padded to a word.
    pub fn literal(&mut self, payload: &[u8]) {
        let words = payload.len().div_ceil(2) as u16;
        assert!(words < 0x8000);
        if words > 0 {
            self.word(words);
            self.words(payload);
        }
    }

    /// A run of `words` zero words.
    pub fn zero_run(&mut self, words: u16) {
        assert!(words > 0 && words < 0x8000);
        self.word(0x8000 | words);
    }

    pub fn end_ray(&mut self) {
        self.word(TOK_END_RAY);
    }

    /// One ray chunk compressed as a single literal plus the end-of-ray
    /// token.
    pub fn ray_chunk(&mut self, payload: &[u8]) {
        self.literal(payload);
        self.end_ray();
    }

    pub fn absent_ray(&mut self) {
        self.end_ray();
    }

    pub fn end_sweep(&mut self) {
        self.word(TOK_END_SWEEP);
    }

    /// A ray payload: header plus storage bytes.
    pub fn ray_payload(az0: u16, az1: u16, num_bins: i16, tm: u16, stor: &[u8]) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&az0.to_le_bytes());
        p.extend_from_slice(&0u16.to_le_bytes());
        p.extend_from_slice(&az1.to_le_bytes());
        p.extend_from_slice(&0u16.to_le_bytes());
        p.extend_from_slice(&num_bins.to_le_bytes());
        p.extend_from_slice(&tm.to_le_bytes());
        p.extend_from_slice(stor);
        p
    }

    pub fn build(mut self) -> Vec<u8> {
        self.pad_current_record();
        let mut out = Vec::new();
        let mut rec = Vec::new();
        self.hdr.prod_hdr.encode_into(&mut rec);
        rec.resize(RECORD_SIZE, 0);
        out.extend_from_slice(&rec);
        rec.clear();
        self.hdr.ingest_hdr.encode_into(&mut rec);
        rec.resize(RECORD_SIZE, 0);
        out.extend_from_slice(&rec);
        out.extend_from_slice(&self.records);
        out
    }
}

pub fn default_tm() -> Ymds {
    Ymds {
        sec: 3600,
        year: 2021,
        month: 6,
        day: 15,
        ..Default::default()
    }
}

/// Two sweeps, four rays, one 8-bit DB_DBZ type, three bins per ray.
/// Storage value for sweep s, ray r, bin b is 10*(b+1) + r + s.
pub fn two_sweep_dbz_volume() -> Vec<u8> {
    let mut b = VolumeBuilder::new(1 << 2, 2, 4, 3);
    for s in 0..2i16 {
        b.begin_sweep_record(s + 1);
        b.sweep_header(9000, default_tm(), 1000 * (s + 1) as u16, 4);
        for r in 0..4u8 {
            let base = r + s as u8;
            let stor = [10 + base, 20 + base, 30 + base];
            let payload =
                VolumeBuilder::ray_payload(9000 + r as u16, 9100 + r as u16, 3, r as u16, &stor);
            b.ray_chunk(&payload);
        }
        b.end_sweep();
    }
    b.build()
}

/// One sweep, two rays, extended headers plus DB_DBZ. Ray r's extended
/// header carries 1500 + r milliseconds.
pub fn xhdr_volume() -> Vec<u8> {
    let mut b = VolumeBuilder::new(0b101, 1, 2, 3);
    b.begin_sweep_record(1);
    b.sweep_header(9000, default_tm(), 1000, 2);
    for r in 0..2i32 {
        let xp = VolumeBuilder::ray_payload(9000, 9100, 1, 0, &(1500 + r).to_le_bytes());
        b.ray_chunk(&xp);
        let dp = VolumeBuilder::ray_payload(9000, 9100, 3, 7, &[1, 2, 3]);
        b.ray_chunk(&dp);
    }
    b.end_sweep();
    b.build()
}
