//! In-memory representation of a Sigmet raw product volume.
//!
//! A `Volume` is constructed once from a byte stream and immutable
//! thereafter. Ray entries hold offsets into one contiguous sample buffer
//! owned by the volume; the buffer and the ray grid are freed together.

use std::io::Read;

use crate::error::{Result, SigmetError};
use crate::tm::{tz_string, Ymds, TZ_STRLEN};
use crate::types::{self, DataType};

pub mod decoder;
pub mod headers;

use self::headers::{IngestHdr, ProdHdr, INGEST_HDR_SIZE, MAX_SWEEPS, PROD_HDR_SIZE};

/// Wire size of the combined volume headers served over the bulk channel.
pub const VOLUME_HDR_WIRE_SIZE: usize = PROD_HDR_SIZE + INGEST_HDR_SIZE;

/// Decoder configuration. Strict mode turns soft anomalies (unknown data
/// mask bits) into hard failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderConfig {
    pub strict: bool,
}

impl DecoderConfig {
    /// Build from the environment: any value in SIGMET_STRICT enables
    /// strict mode.
    pub fn from_env() -> Self {
        Self {
            strict: std::env::var_os("SIGMET_STRICT").is_some(),
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Volume headers: records #1 and #2 plus the data types resolved from the
/// DSP data mask, in mask-bit order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeHdr {
    pub prod_hdr: ProdHdr,
    pub ingest_hdr: IngestHdr,
    pub types: Vec<&'static DataType>,
}

impl VolumeHdr {
    /// Resolve the data-type list from the header mask. Fails when no real
    /// measurement type remains.
    pub fn resolve_types(&mut self, strict: bool) -> Result<()> {
        let mask = &self.ingest_hdr.task_cfg.dsp.curr_data_mask;
        let types = types::types_from_mask(mask, strict)?;
        let real = types.iter().filter(|t| !t.is_ext_header()).count();
        if real == 0 {
            return Err(SigmetError::MalformedHeader(
                "volume data mask names no usable data type".to_string(),
            ));
        }
        self.types = types;
        Ok(())
    }

    pub fn num_sweeps(&self) -> usize {
        self.ingest_hdr.task_cfg.scan.num_sweeps.max(0) as usize
    }

    pub fn num_rays(&self) -> usize {
        self.ingest_hdr.ingest_cfg.num_rays as usize
    }

    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    pub fn num_bins_out(&self) -> usize {
        self.ingest_hdr.task_cfg.rng.num_bins_out.max(0) as usize
    }

    /// Bytes of ray header preceding each ray chunk's storage bytes.
    pub fn ray_hdr_size(&self) -> usize {
        self.ingest_hdr.ingest_cfg.ray_hdr_sz.max(0) as usize
    }

    /// True when the extended ray header pseudo-type is present.
    pub fn xhdr_present(&self) -> bool {
        self.ingest_hdr.task_cfg.dsp.curr_data_mask.mask_word_0 & 1 != 0
    }

    /// Index of a data type within this volume's type list.
    pub fn type_index(&self, t: &'static DataType) -> Option<usize> {
        self.types.iter().position(|u| std::ptr::eq(*u, t))
    }

    /// The first real measurement type, used when a request leaves the
    /// data type blank.
    pub fn default_type_index(&self) -> Option<usize> {
        self.types.iter().position(|t| !t.is_ext_header())
    }

    /// Nyquist velocity in m/s from PRF, wavelength, and the multi-PRF
    /// unfolding ratio. Zero when the volume lacks either.
    pub fn nyquist(&self) -> f64 {
        let prf = if self.ingest_hdr.task_cfg.dsp.prf > 0 {
            self.ingest_hdr.task_cfg.dsp.prf as f64
        } else {
            self.prod_hdr.end.prf as f64
        };
        let wave_m = self.prod_hdr.end.wave_len as f64 * 1e-4;
        if prf <= 0.0 || wave_m <= 0.0 {
            return 0.0;
        }
        wave_m * prf / 4.0 * self.ingest_hdr.task_cfg.dsp.multi_prf_mode.unfolding_factor()
    }

    /// Recorded UTC offset in minutes.
    pub fn tz_offset_min(&self) -> i32 {
        self.ingest_hdr.ingest_cfg.rec_wgmt as i32
    }

    /// The volume's time zone as the fixed-width wire field. Blank means
    /// radar-local.
    pub fn tz_field(&self) -> [u8; TZ_STRLEN] {
        let radar_local = self.ingest_hdr.ingest_cfg.tz.is_empty() && self.tz_offset_min() == 0;
        tz_string(self.tz_offset_min(), radar_local)
    }

    /// Size of the sample buffer able to hold the largest possible decoded
    /// volume: sweeps x rays x the per-type maximum ray sizes.
    pub fn sample_buffer_size(&self) -> Result<usize> {
        let mut per_ray = 0usize;
        for t in &self.types {
            per_ray += t.max_ray_data_size(self)?;
        }
        Ok(self.num_sweeps() * self.num_rays() * per_ray)
    }

    /// Range-check the counts the decoder relies on.
    pub fn validate(&self) -> Result<()> {
        let s = self.num_sweeps();
        if s == 0 || s > MAX_SWEEPS {
            return Err(SigmetError::MalformedHeader(format!(
                "volume claims {} sweeps, limit is {}",
                s, MAX_SWEEPS
            )));
        }
        if self.num_bins_out() == 0 {
            return Err(SigmetError::MalformedHeader(
                "volume claims 0 bins per ray".to_string(),
            ));
        }
        if self.num_rays() == 0 {
            return Err(SigmetError::MalformedHeader(
                "volume claims 0 rays per sweep".to_string(),
            ));
        }
        if self.ray_hdr_size() < decoder::RAY_HDR_WIRE_SIZE {
            return Err(SigmetError::MalformedHeader(format!(
                "ray header size {} below minimum {}",
                self.ray_hdr_size(),
                decoder::RAY_HDR_WIRE_SIZE
            )));
        }
        Ok(())
    }

    /// Serialize both header records for the volume-headers bulk channel.
    /// Byte-for-byte identical between daemon and client built from this
    /// crate.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(VOLUME_HDR_WIRE_SIZE);
        self.prod_hdr.encode_into(&mut out);
        self.ingest_hdr.encode_into(&mut out);
        out
    }

    /// Inverse of `encode`; the type list is re-resolved from the mask.
    pub fn decode(buf: &[u8]) -> Result<VolumeHdr> {
        if buf.len() < VOLUME_HDR_WIRE_SIZE {
            return Err(SigmetError::TruncatedStream(format!(
                "volume headers need {} bytes, have {}",
                VOLUME_HDR_WIRE_SIZE,
                buf.len()
            )));
        }
        let mut hdr = VolumeHdr {
            prod_hdr: ProdHdr::decode(&buf[..PROD_HDR_SIZE])?,
            ingest_hdr: IngestHdr::decode(&buf[PROD_HDR_SIZE..VOLUME_HDR_WIRE_SIZE])?,
            types: Vec::new(),
        };
        hdr.resolve_types(false)?;
        Ok(hdr)
    }
}

/// Sweep header: start time and sweep angle in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepHdr {
    pub tm: Ymds,
    pub angle: f64,
}

/// Ray header with angles converted to radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RayHdr {
    /// Azimuth at start of ray, radians
    pub az0: f32,
    /// Elevation at start of ray, radians
    pub tilt0: f32,
    /// Azimuth at end of ray, radians
    pub az1: f32,
    /// Elevation at end of ray, radians
    pub tilt1: f32,
    /// Number of bins in ray
    pub num_bins: i32,
    /// Time from start of sweep, seconds
    pub tm: u32,
}

/// One data type's header and data for one ray. `data` is an
/// (offset, length) slice of the volume's sample buffer, or None for an
/// absent ray.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ray {
    pub hdr: RayHdr,
    pub data: Option<(usize, usize)>,
}

/// A fully decoded raw product volume.
#[derive(Debug)]
pub struct Volume {
    pub headers: VolumeHdr,
    /// One entry per sweep axis slot; sweeps past `sweeps_read` keep
    /// default headers.
    pub sweep_hdrs: Vec<SweepHdr>,
    /// Number of sweeps actually present in the file.
    pub sweeps_read: usize,
    rays: Vec<Ray>,
    data: Vec<u8>,
}

impl Volume {
    /// Decode a volume from a byte source positioned at the start of the
    /// file. One forward pass.
    pub fn read_from<R: Read>(src: R, cfg: &DecoderConfig) -> Result<Volume> {
        decoder::read_volume(src, cfg)
    }

    pub(crate) fn from_parts(
        headers: VolumeHdr,
        sweep_hdrs: Vec<SweepHdr>,
        sweeps_read: usize,
        rays: Vec<Ray>,
        data: Vec<u8>,
    ) -> Volume {
        Volume {
            headers,
            sweep_hdrs,
            sweeps_read,
            rays,
            data,
        }
    }

    pub fn num_sweeps(&self) -> usize {
        self.headers.num_sweeps()
    }

    pub fn num_rays(&self) -> usize {
        self.headers.num_rays()
    }

    pub fn num_types(&self) -> usize {
        self.headers.num_types()
    }

    pub fn num_bins_out(&self) -> usize {
        self.headers.num_bins_out()
    }

    fn grid_index(&self, s: usize, r: usize, t: usize) -> usize {
        (s * self.num_rays() + r) * self.num_types() + t
    }

    /// Ray entry for sweep `s`, ray `r`, type slot `t`.
    pub fn ray(&self, s: usize, r: usize, t: usize) -> Result<&Ray> {
        if s >= self.num_sweeps() || r >= self.num_rays() || t >= self.num_types() {
            return Err(SigmetError::BadArgument(format!(
                "ray index ({}, {}, {}) outside {}x{}x{} volume",
                s,
                r,
                t,
                self.num_sweeps(),
                self.num_rays(),
                self.num_types()
            )));
        }
        Ok(&self.rays[self.grid_index(s, r, t)])
    }

    /// Storage bytes for one ray, or None when the ray is absent.
    pub fn ray_data(&self, s: usize, r: usize, t: usize) -> Result<Option<&[u8]>> {
        let ray = self.ray(s, r, t)?;
        Ok(ray.data.map(|(off, len)| &self.data[off..off + len]))
    }

    /// Total size of the sample buffer.
    pub fn sample_buffer_len(&self) -> usize {
        self.data.len()
    }

    /// Absolute ray time: sweep start plus the extended-header offset when
    /// available, else the ray header's whole-second offset. NaN when the
    /// sweep was never read.
    pub fn ray_time(&self, s: usize, r: usize) -> Result<f64> {
        if s >= self.sweeps_read {
            return Ok(f64::NAN);
        }
        let sweep_tm = self.sweep_hdrs[s].tm.to_seconds();
        let t_hdr = self.headers.default_type_index().unwrap_or(0);
        let ray = *self.ray(s, r, t_hdr)?;
        if self.headers.xhdr_present() && self.headers.types[0].is_ext_header() {
            if let Some(stor) = self.ray_data(s, r, 0)? {
                let mut v = [0f32; 1];
                self.headers.types[0].storage_to_value(1, &mut v, stor, &self.headers)?;
                return Ok(sweep_tm + v[0] as f64);
            }
        }
        Ok(sweep_tm + ray.hdr.tm as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::headers::{DspDataMask, ScanInfo, ScanMode, TaskScanInfo};

    fn hdr_with(mask_word_0: u32, sweeps: i16, rays: u16, bins: i16) -> VolumeHdr {
        let mut hdr = VolumeHdr::default();
        hdr.ingest_hdr.ingest_cfg.num_rays = rays;
        hdr.ingest_hdr.ingest_cfg.ray_hdr_sz = decoder::RAY_HDR_WIRE_SIZE as i16;
        hdr.ingest_hdr.ingest_cfg.ext_ray_hdr_sz = 4;
        hdr.ingest_hdr.task_cfg.dsp.curr_data_mask = DspDataMask {
            mask_word_0,
            ..Default::default()
        };
        hdr.ingest_hdr.task_cfg.rng.num_bins_out = bins;
        hdr.ingest_hdr.task_cfg.scan = TaskScanInfo {
            scan_mode: ScanMode::PpiContinuous,
            num_sweeps: sweeps,
            resolution: 0,
            scan_info: ScanInfo::default(),
        };
        hdr
    }

    #[test]
    fn test_resolve_types_requires_real_type() {
        // Extended header alone is not a usable volume.
        let mut hdr = hdr_with(0x1, 1, 4, 8);
        assert!(matches!(
            hdr.resolve_types(false),
            Err(SigmetError::MalformedHeader(_))
        ));
        let mut hdr = hdr_with(0x5, 1, 4, 8);
        hdr.resolve_types(false).unwrap();
        assert_eq!(hdr.num_types(), 2);
        assert_eq!(hdr.default_type_index(), Some(1));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut hdr = hdr_with(0x4, 41, 4, 8);
        hdr.resolve_types(false).unwrap();
        assert!(matches!(hdr.validate(), Err(SigmetError::MalformedHeader(_))));

        let mut hdr = hdr_with(0x4, 2, 4, 0);
        hdr.resolve_types(false).unwrap();
        assert!(matches!(hdr.validate(), Err(SigmetError::MalformedHeader(_))));

        let mut hdr = hdr_with(0x4, 2, 4, 8);
        hdr.resolve_types(false).unwrap();
        hdr.validate().unwrap();
    }

    #[test]
    fn test_sample_buffer_size() {
        // 2 sweeps x 4 rays x one 8-bit type x 3 bins.
        let mut hdr = hdr_with(0x4, 2, 4, 3);
        hdr.resolve_types(false).unwrap();
        assert_eq!(hdr.sample_buffer_size().unwrap(), 24);
    }

    #[test]
    fn test_volume_hdr_encode_decode_roundtrip() {
        let mut hdr = hdr_with(0x5, 2, 4, 8);
        hdr.ingest_hdr.ingest_cfg.rec_wgmt = -300;
        hdr.ingest_hdr.ingest_cfg.tz = "EST".to_string();
        hdr.prod_hdr.cfg.task_name = "SURVEIL".to_string();
        hdr.resolve_types(false).unwrap();
        let wire = hdr.encode();
        assert_eq!(wire.len(), VOLUME_HDR_WIRE_SIZE);
        let back = VolumeHdr::decode(&wire).unwrap();
        assert_eq!(back, hdr);
    }

    #[test]
    fn test_tz_field() {
        let mut hdr = hdr_with(0x4, 1, 1, 1);
        hdr.ingest_hdr.ingest_cfg.rec_wgmt = -300;
        hdr.ingest_hdr.ingest_cfg.tz = "EST".to_string();
        assert_eq!(crate::tm::tz_str(&hdr.tz_field()), "UTC-05:00");
        let hdr = hdr_with(0x4, 1, 1, 1);
        assert_eq!(crate::tm::tz_str(&hdr.tz_field()), "");
    }

    #[test]
    fn test_decoder_config_builder() {
        let cfg = DecoderConfig::default().with_strict(true);
        assert!(cfg.strict);
    }
}
