//! Time handling for Sigmet raw headers.
//!
//! Raw product headers store times as year/month/day plus seconds of day
//! ("YMDS"). The millisecond field also carries three flag bits. Volume
//! times are expressed as seconds since the epoch in the zone the volume
//! states; no zone conversion happens on input.

use chrono::{DateTime, Datelike, NaiveDate, Timelike};

use crate::bits::{le_i16, le_i32, le_u16};
use crate::error::{Result, SigmetError};

/// Wire size of a YMDS time.
pub const YMDS_WIRE_SIZE: usize = 12;

/// Byte length of the time-zone string field, e.g. "UTC-11:-59".
pub const TZ_STRLEN: usize = 11;

/// Time as represented in Sigmet raw headers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ymds {
    /// Seconds since midnight
    pub sec: i32,
    /// Milliseconds, 0..=999
    pub msec: u16,
    /// Time is daylight savings
    pub dst: bool,
    /// Time is UTC
    pub utc: bool,
    /// Local time is daylight savings
    pub ldst: bool,
    pub year: i16,
    pub month: i16,
    pub day: i16,
}

impl Ymds {
    /// Decode a YMDS time from `buf` at `off`. The millisecond word keeps
    /// milliseconds in its low 10 bits; bit 10 is the DST flag, bit 11 the
    /// UTC flag, bit 12 the local-DST flag.
    pub fn decode(buf: &[u8], off: usize) -> Result<Ymds> {
        let sec = le_i32(buf, off)?;
        let msec_word = le_u16(buf, off + 4)?;
        Ok(Ymds {
            sec,
            msec: msec_word & 0x03ff,
            dst: msec_word & (1 << 10) != 0,
            utc: msec_word & (1 << 11) != 0,
            ldst: msec_word & (1 << 12) != 0,
            year: le_i16(buf, off + 6)?,
            month: le_i16(buf, off + 8)?,
            day: le_i16(buf, off + 10)?,
        })
    }

    /// Append the wire form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.sec.to_le_bytes());
        let mut msec_word = self.msec & 0x03ff;
        if self.dst {
            msec_word |= 1 << 10;
        }
        if self.utc {
            msec_word |= 1 << 11;
        }
        if self.ldst {
            msec_word |= 1 << 12;
        }
        out.extend_from_slice(&msec_word.to_le_bytes());
        out.extend_from_slice(&self.year.to_le_bytes());
        out.extend_from_slice(&self.month.to_le_bytes());
        out.extend_from_slice(&self.day.to_le_bytes());
    }

    /// Monotonic seconds since the epoch in the stated zone. NaN if the
    /// calendar fields do not name a date.
    pub fn to_seconds(&self) -> f64 {
        let date = match NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32) {
            Some(d) => d,
            None => return f64::NAN,
        };
        let midnight = match date.and_hms_opt(0, 0, 0) {
            Some(t) => t,
            None => return f64::NAN,
        };
        midnight.and_utc().timestamp() as f64 + self.sec as f64 + self.msec as f64 / 1000.0
    }
}

/// Break seconds-since-epoch back into calendar fields for text output.
/// Returns (year, month, day, hour, minute, second-with-fraction).
pub fn break_time(t: f64) -> Option<(i32, u32, u32, u32, u32, f32)> {
    if !t.is_finite() {
        return None;
    }
    let whole = t.floor();
    let frac = t - whole;
    let dt = DateTime::from_timestamp(whole as i64, 0)?;
    Some((
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second() as f32 + frac as f32,
    ))
}

/// Format a UTC offset in minutes as the fixed 11-byte time-zone field,
/// e.g. "UTC-05:00". An offset of zero stated as radar-local yields a
/// blank field.
pub fn tz_string(offset_min: i32, radar_local: bool) -> [u8; TZ_STRLEN] {
    let mut out = [0u8; TZ_STRLEN];
    if radar_local {
        return out;
    }
    let hours = offset_min / 60;
    let mins = offset_min % 60;
    let s = format!("UTC{:+03}:{:02}", hours, mins);
    for (i, b) in s.bytes().take(TZ_STRLEN).enumerate() {
        out[i] = b;
    }
    out
}

/// Recover the printable part of a time-zone field.
pub fn tz_str(field: &[u8; TZ_STRLEN]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(TZ_STRLEN);
    std::str::from_utf8(&field[..end]).unwrap_or("")
}

/// Parse a sweep-index argument: a non-negative integer or "all".
pub fn parse_sweep_arg(s: &str) -> Result<u32> {
    if s == "all" {
        return Ok(u32::MAX);
    }
    s.parse::<u32>()
        .map_err(|_| SigmetError::BadArgument(format!("expected integer or \"all\" for sweep index, got {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(sec: i32, msec_word: u16, y: i16, m: i16, d: i16) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&sec.to_le_bytes());
        v.extend_from_slice(&msec_word.to_le_bytes());
        v.extend_from_slice(&y.to_le_bytes());
        v.extend_from_slice(&m.to_le_bytes());
        v.extend_from_slice(&d.to_le_bytes());
        v
    }

    #[test]
    fn test_decode_flags() {
        let buf = wire(3600, 500 | (1 << 10) | (1 << 11), 2021, 6, 15);
        let t = Ymds::decode(&buf, 0).unwrap();
        assert_eq!(t.sec, 3600);
        assert_eq!(t.msec, 500);
        assert!(t.dst);
        assert!(t.utc);
        assert!(!t.ldst);
        assert_eq!((t.year, t.month, t.day), (2021, 6, 15));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let t = Ymds {
            sec: 86399,
            msec: 999,
            dst: false,
            utc: true,
            ldst: true,
            year: 1999,
            month: 12,
            day: 31,
        };
        let mut buf = Vec::new();
        t.encode_into(&mut buf);
        assert_eq!(buf.len(), YMDS_WIRE_SIZE);
        assert_eq!(Ymds::decode(&buf, 0).unwrap(), t);
    }

    #[test]
    fn test_to_seconds_epoch() {
        let t = Ymds {
            year: 1970,
            month: 1,
            day: 1,
            sec: 61,
            msec: 250,
            ..Default::default()
        };
        assert!((t.to_seconds() - 61.25).abs() < 1e-9);
    }

    #[test]
    fn test_to_seconds_bad_date_is_nan() {
        let t = Ymds {
            year: 2021,
            month: 13,
            day: 40,
            ..Default::default()
        };
        assert!(t.to_seconds().is_nan());
    }

    #[test]
    fn test_break_time_inverts_to_seconds() {
        let t = Ymds {
            year: 2021,
            month: 6,
            day: 15,
            sec: 12 * 3600 + 34 * 60 + 56,
            msec: 500,
            ..Default::default()
        };
        let (y, mo, d, h, mi, s) = break_time(t.to_seconds()).unwrap();
        assert_eq!((y, mo, d, h, mi), (2021, 6, 15, 12, 34));
        assert!((s - 56.5).abs() < 1e-3);
    }

    #[test]
    fn test_break_time_nan() {
        assert!(break_time(f64::NAN).is_none());
    }

    #[test]
    fn test_tz_string_negative() {
        let f = tz_string(-300, false);
        assert_eq!(tz_str(&f), "UTC-05:00");
    }

    #[test]
    fn test_tz_string_positive() {
        let f = tz_string(330, false);
        assert_eq!(tz_str(&f), "UTC+05:30");
    }

    #[test]
    fn test_tz_string_widest_fits() {
        // "UTC-11:-59" is the widest value the field must carry.
        let f = tz_string(-11 * 60 - 59, false);
        assert_eq!(tz_str(&f), "UTC-11:-59");
    }

    #[test]
    fn test_tz_string_radar_local_blank() {
        let f = tz_string(0, true);
        assert_eq!(tz_str(&f), "");
    }

    #[test]
    fn test_parse_sweep_arg() {
        assert_eq!(parse_sweep_arg("3").unwrap(), 3);
        assert_eq!(parse_sweep_arg("all").unwrap(), u32::MAX);
        assert!(parse_sweep_arg("three").is_err());
        assert!(parse_sweep_arg("-1").is_err());
    }
}
