//! Data-type adapter registry.
//!
//! Each IRIS measurement is described by a static descriptor giving its
//! abbreviation, data-mask bit, datum width, print format, and the
//! storage-to-physical conversion. The decoder never branches on a concrete
//! type; it asks the descriptor for sizes and conversions.

use log::warn;

use crate::bits::copy_bits_right_packed;
use crate::error::{Result, SigmetError};
use crate::volume::headers::{DspDataMask, NUM_MASK_WORDS};
use crate::volume::VolumeHdr;

/// Number of defined Sigmet data types, including the extended-header
/// pseudo-type. Grows only when Vaisala adds types.
pub const NUM_DATA_TYPES: usize = 89;

/// Wire length of a data type abbreviation, e.g. "DB_TEMPERATURE16".
pub const DATA_TYPE_LEN: usize = 16;

/// Datum width declaration. The extended-header pseudo-type takes its
/// width from the volume's ingest configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Bits(u32),
    Bytes(u32),
    ExtHeader,
}

/// Storage-to-physical conversion, tagged per type family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// First data word is a millisecond offset from the sweep start.
    ExtHeaderSeconds,
    /// v = (N - sub) * scale + add; storage 0 is no-data.
    Linear8 { sub: f64, scale: f64, add: f64 },
    /// v = (N - sub) * scale + add; storage 0 and 65535 are no-data.
    Linear16 { sub: f64, scale: f64, add: f64 },
    /// v = nyquist * (N - 128) / 127
    Velocity8,
    /// v = nyquist * N / 256
    Width8,
    /// v = sqrt((N - 1) / 253)
    Root8,
    /// Specific differential phase, exponential in storage, scaled by
    /// wavelength.
    Kdp8,
    /// 12-bit mantissa with 4-bit binary exponent, in 1/10000 units.
    RainRate16,
    /// One bit per bin.
    OneBit,
}

/// Correction applied by the "corrected" output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Subtract the calibrated ZDR bias (1/16 dB units).
    ZdrBias,
    /// Subtract the calibrated LDR bias (1/16 dB units).
    LdrBias,
}

/// Descriptor for one Sigmet data type.
#[derive(Debug, PartialEq)]
pub struct DataType {
    abbrv: &'static str,
    /// Canonical bit position in the 5x32-bit data mask
    bit: u32,
    width: Width,
    print_width: usize,
    print_prec: usize,
    conv: Conversion,
    correction: Correction,
}

/// The registry. Order is canonical bit order; the table is sparse with
/// respect to the full 89-slot space, and unknown bits are reported through
/// the UnknownDataType path.
static DATA_TYPES: &[DataType] = &[
    DataType { abbrv: "DB_XHDR", bit: 0, width: Width::ExtHeader, print_width: 10, print_prec: 3, conv: Conversion::ExtHeaderSeconds, correction: Correction::None },
    DataType { abbrv: "DB_DBT", bit: 1, width: Width::Bytes(1), print_width: 7, print_prec: 1, conv: Conversion::Linear8 { sub: 64.0, scale: 0.5, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_DBZ", bit: 2, width: Width::Bytes(1), print_width: 7, print_prec: 1, conv: Conversion::Linear8 { sub: 64.0, scale: 0.5, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_VEL", bit: 3, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Velocity8, correction: Correction::None },
    DataType { abbrv: "DB_WIDTH", bit: 4, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Width8, correction: Correction::None },
    DataType { abbrv: "DB_ZDR", bit: 5, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Linear8 { sub: 128.0, scale: 1.0 / 16.0, add: 0.0 }, correction: Correction::ZdrBias },
    DataType { abbrv: "DB_DBZC", bit: 7, width: Width::Bytes(1), print_width: 7, print_prec: 1, conv: Conversion::Linear8 { sub: 64.0, scale: 0.5, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_DBT2", bit: 8, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_DBZ2", bit: 9, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_VEL2", bit: 10, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_WIDTH2", bit: 11, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 0.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_ZDR2", bit: 12, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::ZdrBias },
    DataType { abbrv: "DB_RAINRATE2", bit: 13, width: Width::Bytes(2), print_width: 9, print_prec: 4, conv: Conversion::RainRate16, correction: Correction::None },
    DataType { abbrv: "DB_KDP", bit: 14, width: Width::Bytes(1), print_width: 8, print_prec: 3, conv: Conversion::Kdp8, correction: Correction::None },
    DataType { abbrv: "DB_KDP2", bit: 15, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_PHIDP", bit: 16, width: Width::Bytes(1), print_width: 7, print_prec: 1, conv: Conversion::Linear8 { sub: 1.0, scale: 180.0 / 254.0, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_VELC", bit: 17, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Velocity8, correction: Correction::None },
    DataType { abbrv: "DB_SQI", bit: 18, width: Width::Bytes(1), print_width: 6, print_prec: 3, conv: Conversion::Root8, correction: Correction::None },
    DataType { abbrv: "DB_RHOHV", bit: 19, width: Width::Bytes(1), print_width: 6, print_prec: 3, conv: Conversion::Root8, correction: Correction::None },
    DataType { abbrv: "DB_RHOHV2", bit: 20, width: Width::Bytes(2), print_width: 8, print_prec: 4, conv: Conversion::Linear16 { sub: 1.0, scale: 1.0 / 65533.0, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_DBZC2", bit: 21, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_VELC2", bit: 22, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_SQI2", bit: 23, width: Width::Bytes(2), print_width: 8, print_prec: 4, conv: Conversion::Linear16 { sub: 1.0, scale: 1.0 / 65533.0, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_PHIDP2", bit: 24, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 1.0, scale: 360.0 / 65534.0, add: 0.0 }, correction: Correction::None },
    DataType { abbrv: "DB_LDRH", bit: 25, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Linear8 { sub: 1.0, scale: 0.2, add: -45.0 }, correction: Correction::LdrBias },
    DataType { abbrv: "DB_LDRH2", bit: 26, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::LdrBias },
    DataType { abbrv: "DB_LDRV", bit: 27, width: Width::Bytes(1), print_width: 7, print_prec: 2, conv: Conversion::Linear8 { sub: 1.0, scale: 0.2, add: -45.0 }, correction: Correction::LdrBias },
    DataType { abbrv: "DB_LDRV2", bit: 28, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::LdrBias },
    DataType { abbrv: "DB_FLAGS", bit: 29, width: Width::Bits(1), print_width: 3, print_prec: 0, conv: Conversion::OneBit, correction: Correction::None },
    DataType { abbrv: "DB_TEMPERATURE16", bit: 55, width: Width::Bytes(2), print_width: 8, print_prec: 2, conv: Conversion::Linear16 { sub: 32768.0, scale: 0.01, add: 0.0 }, correction: Correction::None },
];

/// Look up a descriptor by abbreviation.
pub fn get_by_abbrev(name: &str) -> Option<&'static DataType> {
    DATA_TYPES.iter().find(|t| t.abbrv == name)
}

/// Look up a descriptor by canonical mask bit.
pub fn get_by_bit(bit: u32) -> Option<&'static DataType> {
    DATA_TYPES.iter().find(|t| t.bit == bit)
}

impl DataType {
    pub fn abbrv(&self) -> &'static str {
        self.abbrv
    }

    pub fn bit(&self) -> u32 {
        self.bit
    }

    /// True for the extended-header pseudo-type, which is stored as data
    /// but is not a measurement.
    pub fn is_ext_header(&self) -> bool {
        self.width == Width::ExtHeader
    }

    /// Datum width. Reported in bits for the 1-bit compressed type; the
    /// extended-header width comes from the volume's ingest configuration.
    pub fn width(&self) -> Width {
        self.width
    }

    /// Datum size in bytes for byte-wide types. The 1-bit type has no
    /// per-datum byte size; callers use `ray_data_size` instead.
    pub fn datum_size(&self, hdr: &VolumeHdr) -> Result<usize> {
        match self.width {
            Width::Bytes(n) => Ok(n as usize),
            Width::Bits(_) => Err(SigmetError::MalformedHeader(format!(
                "{} is bit-packed and has no whole-byte datum size",
                self.abbrv
            ))),
            Width::ExtHeader => {
                let sz = hdr.ingest_hdr.ingest_cfg.ext_ray_hdr_sz;
                if sz < 4 {
                    return Err(SigmetError::MalformedHeader(format!(
                        "extended ray header size {} is too small",
                        sz
                    )));
                }
                Ok(sz as usize)
            }
        }
    }

    /// Storage bytes one ray of `n` bins occupies for this type.
    pub fn ray_data_size(&self, n: usize, hdr: &VolumeHdr) -> Result<usize> {
        match self.width {
            Width::Bits(b) => Ok((n * b as usize).div_ceil(8)),
            Width::Bytes(w) => Ok(n * w as usize),
            // One extended header per ray, regardless of bin count.
            Width::ExtHeader => self.datum_size(hdr),
        }
    }

    /// Largest possible storage size of one ray of this type.
    pub fn max_ray_data_size(&self, hdr: &VolumeHdr) -> Result<usize> {
        self.ray_data_size(hdr.num_bins_out(), hdr)
    }

    /// Convert `n` storage values to physical values. Out-of-range storage
    /// maps to NaN.
    pub fn storage_to_value(&self, n: usize, out: &mut [f32], stor: &[u8], hdr: &VolumeHdr) -> Result<()> {
        if out.len() < n {
            return Err(SigmetError::ResourceExhausted(format!(
                "output array of {} for {} values",
                out.len(),
                n
            )));
        }
        if n == 0 {
            return Ok(());
        }
        match self.conv {
            Conversion::ExtHeaderSeconds => {
                let ms = crate::bits::le_i32(stor, 0)?;
                out[0] = ms as f32 / 1000.0;
                for v in out.iter_mut().take(n).skip(1) {
                    *v = f32::NAN;
                }
            }
            Conversion::Linear8 { sub, scale, add } => {
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = *stor.get(i).ok_or_else(|| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 {
                        f32::NAN
                    } else {
                        ((s as f64 - sub) * scale + add) as f32
                    };
                }
            }
            Conversion::Linear16 { sub, scale, add } => {
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = crate::bits::le_u16(stor, 2 * i)
                        .map_err(|_| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 || s == u16::MAX {
                        f32::NAN
                    } else {
                        ((s as f64 - sub) * scale + add) as f32
                    };
                }
            }
            Conversion::Velocity8 => {
                let nyq = hdr.nyquist();
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = *stor.get(i).ok_or_else(|| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 || nyq <= 0.0 {
                        f32::NAN
                    } else {
                        (nyq * (s as f64 - 128.0) / 127.0) as f32
                    };
                }
            }
            Conversion::Width8 => {
                let nyq = hdr.nyquist();
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = *stor.get(i).ok_or_else(|| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 || nyq <= 0.0 {
                        f32::NAN
                    } else {
                        (nyq * s as f64 / 256.0) as f32
                    };
                }
            }
            Conversion::Root8 => {
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = *stor.get(i).ok_or_else(|| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 {
                        f32::NAN
                    } else {
                        ((s as f64 - 1.0) / 253.0).sqrt() as f32
                    };
                }
            }
            Conversion::Kdp8 => {
                let lambda_cm = hdr.prod_hdr.end.wave_len as f64 / 100.0;
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = *stor.get(i).ok_or_else(|| storage_short(self.abbrv, n, i))?;
                    *v = kdp8(s, lambda_cm);
                }
            }
            Conversion::RainRate16 => {
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    let s = crate::bits::le_u16(stor, 2 * i)
                        .map_err(|_| storage_short(self.abbrv, n, i))?;
                    *v = if s == 0 || s == u16::MAX {
                        f32::NAN
                    } else {
                        let e = (s >> 12) as u32;
                        let m = (s & 0x0fff) as u64;
                        if e == 0 {
                            m as f32 / 10000.0
                        } else {
                            (((m + 4096) << (e - 1)) as f64 / 10000.0) as f32
                        }
                    };
                }
            }
            Conversion::OneBit => {
                let mut byte = [0u8; 1];
                for (i, v) in out.iter_mut().take(n).enumerate() {
                    copy_bits_right_packed(stor, i, 1, &mut byte)?;
                    *v = byte[0] as f32;
                }
            }
        }
        Ok(())
    }

    /// Convert with the per-type calibration correction applied.
    pub fn storage_to_corrected(&self, n: usize, out: &mut [f32], stor: &[u8], hdr: &VolumeHdr) -> Result<()> {
        self.storage_to_value(n, out, stor, hdr)?;
        let bias = match self.correction {
            Correction::None => return Ok(()),
            Correction::ZdrBias => hdr.ingest_hdr.task_cfg.calib.zdr_bias as f32 / 16.0,
            Correction::LdrBias => hdr.ingest_hdr.task_cfg.calib.ldr_bias as f32 / 16.0,
        };
        for v in out.iter_mut().take(n) {
            *v -= bias;
        }
        Ok(())
    }

    /// Format one physical value with this type's print format.
    pub fn format_datum(&self, v: f32) -> String {
        if v.is_nan() {
            format!("{:>w$} ", "NaN", w = self.print_width)
        } else {
            format!("{:>w$.p$} ", v, w = self.print_width, p = self.print_prec)
        }
    }
}

fn storage_short(abbrv: &str, n: usize, i: usize) -> SigmetError {
    SigmetError::TruncatedStream(format!("{} storage ends at value {} of {}", abbrv, i, n))
}

fn kdp8(s: u8, lambda_cm: f64) -> f32 {
    if s == 0 || s == 255 || lambda_cm <= 0.0 {
        return f32::NAN;
    }
    match s.cmp(&128) {
        std::cmp::Ordering::Less => {
            (-(600.0f64.powf((127 - s) as f64 / 126.0)) * 0.25 / lambda_cm) as f32
        }
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => {
            (600.0f64.powf((s - 129) as f64 / 125.0) * 0.25 / lambda_cm) as f32
        }
    }
}

/// Enumerate the data mask in ascending bit order and return the
/// descriptors present in the volume. The extended-header pseudo-type, when
/// its bit is set, lands at slot 0. Unknown bits are logged and skipped,
/// or fatal in strict mode.
pub fn types_from_mask(mask: &DspDataMask, strict: bool) -> Result<Vec<&'static DataType>> {
    let mut types = Vec::new();
    let words = mask.words();
    for (w, word) in words.iter().enumerate().take(NUM_MASK_WORDS) {
        for b in 0..32 {
            if word & (1 << b) == 0 {
                continue;
            }
            let bit = (w * 32 + b) as u32;
            match get_by_bit(bit) {
                Some(t) => types.push(t),
                None => {
                    if strict {
                        return Err(SigmetError::UnknownDataType(bit));
                    }
                    warn!("bit {} of the data mask is not a known Sigmet data type, skipping", bit);
                }
            }
        }
    }
    if types.len() > NUM_DATA_TYPES {
        return Err(SigmetError::MalformedHeader(format!(
            "data mask names {} types, limit is {}",
            types.len(),
            NUM_DATA_TYPES
        )));
    }
    Ok(types)
}
