//! Wire messages for daemon requests and responses.
//!
//! A request is one sendmsg carrying 24 bytes of regular data plus two
//! file descriptors as ancillary data: slot 0 the error channel, slot 1
//! the bulk channel. A response is a fixed seven-slot vector sent on the
//! socket before any bulk byte; all slots are present in every response.

use crate::bits::le_u32;
use crate::error::{Result, SigmetError};
use crate::tm::TZ_STRLEN;
use crate::types::DATA_TYPE_LEN;

/// Wire size of a request's regular data.
pub const REQUEST_WIRE_SIZE: usize = 4 + DATA_TYPE_LEN + 4;

/// Wire size of a response: status, three counts, sweep time, time zone,
/// error flag.
pub const RESPONSE_WIRE_SIZE: usize = 4 * 4 + 8 + TZ_STRLEN + 4;

/// Sweep index meaning "all sweeps" where the subcommand supports it.
pub const ALL_SWEEPS: u32 = u32::MAX;

/// Index of the error-channel fd in the request's ancillary data.
pub const ERR_FD_SLOT: usize = 0;
/// Index of the bulk-channel fd in the request's ancillary data.
pub const BULK_FD_SLOT: usize = 1;
/// Number of fds every request carries.
pub const REQUEST_NUM_FDS: usize = 2;

/// Daemon subcommand specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCmd {
    Exit,
    VolumeHeaders,
    SweepHeaders,
    RayHeaders,
    Data,
    Corrected,
}

impl SubCmd {
    pub fn as_u32(self) -> u32 {
        match self {
            SubCmd::Exit => 0,
            SubCmd::VolumeHeaders => 1,
            SubCmd::SweepHeaders => 2,
            SubCmd::RayHeaders => 3,
            SubCmd::Data => 4,
            SubCmd::Corrected => 5,
        }
    }

    pub fn from_u32(v: u32) -> Result<SubCmd> {
        match v {
            0 => Ok(SubCmd::Exit),
            1 => Ok(SubCmd::VolumeHeaders),
            2 => Ok(SubCmd::SweepHeaders),
            3 => Ok(SubCmd::RayHeaders),
            4 => Ok(SubCmd::Data),
            5 => Ok(SubCmd::Corrected),
            _ => Err(SigmetError::Protocol(format!("unsupported subcommand {}", v))),
        }
    }
}

/// Daemon status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error,
    Okay,
}

impl Status {
    fn as_u32(self) -> u32 {
        match self {
            Status::Error => 0,
            Status::Okay => 1,
        }
    }

    fn from_u32(v: u32) -> Result<Status> {
        match v {
            0 => Ok(Status::Error),
            1 => Ok(Status::Okay),
            _ => Err(SigmetError::Protocol(format!("unknown status {}", v))),
        }
    }
}

/// Client-to-daemon request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub sub_cmd: SubCmd,
    /// Data type abbreviation; empty means the volume's default type.
    pub abbrv: String,
    /// Sweep index; ALL_SWEEPS where the subcommand supports it.
    pub sweep: u32,
}

impl Request {
    pub fn new(sub_cmd: SubCmd) -> Self {
        Self {
            sub_cmd,
            abbrv: String::new(),
            sweep: 0,
        }
    }

    pub fn with_data_type(mut self, abbrv: &str) -> Self {
        self.abbrv = abbrv.to_string();
        self
    }

    pub fn with_sweep(mut self, sweep: u32) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn all_sweeps(&self) -> bool {
        self.sweep == ALL_SWEEPS
    }

    pub fn encode(&self) -> [u8; REQUEST_WIRE_SIZE] {
        let mut out = [0u8; REQUEST_WIRE_SIZE];
        out[..4].copy_from_slice(&self.sub_cmd.as_u32().to_le_bytes());
        let name = self.abbrv.as_bytes();
        let n = name.len().min(DATA_TYPE_LEN);
        out[4..4 + n].copy_from_slice(&name[..n]);
        out[4 + DATA_TYPE_LEN..].copy_from_slice(&self.sweep.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Request> {
        if buf.len() != REQUEST_WIRE_SIZE {
            return Err(SigmetError::Protocol(format!(
                "request is {} bytes, expected {}",
                buf.len(),
                REQUEST_WIRE_SIZE
            )));
        }
        let sub_cmd = SubCmd::from_u32(le_u32(buf, 0)?)?;
        let name = &buf[4..4 + DATA_TYPE_LEN];
        let end = name.iter().position(|&b| b == 0).unwrap_or(DATA_TYPE_LEN);
        let abbrv = std::str::from_utf8(&name[..end])
            .map_err(|_| SigmetError::Protocol("data type abbreviation is not UTF-8".to_string()))?
            .to_string();
        let sweep = le_u32(buf, 4 + DATA_TYPE_LEN)?;
        Ok(Request { sub_cmd, abbrv, sweep })
    }
}

/// Daemon-to-client response. Unused slots are zero; all slots are present
/// in all responses so a client can always parse the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub num_sweeps: u32,
    pub num_rays: u32,
    pub num_bins_in_sweep: u32,
    /// Seconds since epoch of the relevant sweep's start
    pub sweep_time: f64,
    pub tz: [u8; TZ_STRLEN],
    pub err_flag: u32,
}

impl Response {
    pub fn okay(tz: [u8; TZ_STRLEN]) -> Self {
        Self {
            status: Status::Okay,
            num_sweeps: 0,
            num_rays: 0,
            num_bins_in_sweep: 0,
            sweep_time: 0.0,
            tz,
            err_flag: 0,
        }
    }

    pub fn error(tz: [u8; TZ_STRLEN]) -> Self {
        Self {
            status: Status::Error,
            ..Self::okay(tz)
        }
    }

    pub fn with_counts(mut self, num_sweeps: u32, num_rays: u32, num_bins_in_sweep: u32) -> Self {
        self.num_sweeps = num_sweeps;
        self.num_rays = num_rays;
        self.num_bins_in_sweep = num_bins_in_sweep;
        self
    }

    pub fn with_sweep_time(mut self, t: f64) -> Self {
        self.sweep_time = t;
        self
    }

    pub fn is_okay(&self) -> bool {
        self.status == Status::Okay
    }

    pub fn encode(&self) -> [u8; RESPONSE_WIRE_SIZE] {
        let mut out = [0u8; RESPONSE_WIRE_SIZE];
        out[0..4].copy_from_slice(&self.status.as_u32().to_le_bytes());
        out[4..8].copy_from_slice(&self.num_sweeps.to_le_bytes());
        out[8..12].copy_from_slice(&self.num_rays.to_le_bytes());
        out[12..16].copy_from_slice(&self.num_bins_in_sweep.to_le_bytes());
        out[16..24].copy_from_slice(&self.sweep_time.to_le_bytes());
        out[24..24 + TZ_STRLEN].copy_from_slice(&self.tz);
        out[24 + TZ_STRLEN..].copy_from_slice(&self.err_flag.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Response> {
        if buf.len() != RESPONSE_WIRE_SIZE {
            return Err(SigmetError::Protocol(format!(
                "response is {} bytes, expected {}",
                buf.len(),
                RESPONSE_WIRE_SIZE
            )));
        }
        let mut tz = [0u8; TZ_STRLEN];
        tz.copy_from_slice(&buf[24..24 + TZ_STRLEN]);
        let mut t = [0u8; 8];
        t.copy_from_slice(&buf[16..24]);
        Ok(Response {
            status: Status::from_u32(le_u32(buf, 0)?)?,
            num_sweeps: le_u32(buf, 4)?,
            num_rays: le_u32(buf, 8)?,
            num_bins_in_sweep: le_u32(buf, 12)?,
            sweep_time: f64::from_le_bytes(t),
            tz,
            err_flag: le_u32(buf, 24 + TZ_STRLEN)?,
        })
    }
}

/// Wire size of a wide ray header record on the bulk channel.
pub const WIDE_RAY_HDR_WIRE_SIZE: usize = 32;

/// Ray header augmented with an absolute time: sweep time plus the
/// extended-header offset when available, else the ray header offset;
/// NaN when unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WideRayHdr {
    pub az0: f32,
    pub tilt0: f32,
    pub az1: f32,
    pub tilt1: f32,
    pub num_bins: i32,
    pub tm: u32,
    pub time: f64,
}

impl WideRayHdr {
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.az0.to_le_bytes());
        out.extend_from_slice(&self.tilt0.to_le_bytes());
        out.extend_from_slice(&self.az1.to_le_bytes());
        out.extend_from_slice(&self.tilt1.to_le_bytes());
        out.extend_from_slice(&self.num_bins.to_le_bytes());
        out.extend_from_slice(&self.tm.to_le_bytes());
        out.extend_from_slice(&self.time.to_le_bytes());
    }

    pub fn decode(buf: &[u8], off: usize) -> Result<WideRayHdr> {
        if buf.len() < off + WIDE_RAY_HDR_WIRE_SIZE {
            return Err(SigmetError::TruncatedStream(format!(
                "wide ray header at {} past end ({})",
                off,
                buf.len()
            )));
        }
        let f32_at = |o: usize| -> f32 {
            let mut b = [0u8; 4];
            b.copy_from_slice(&buf[off + o..off + o + 4]);
            f32::from_le_bytes(b)
        };
        let mut t = [0u8; 8];
        t.copy_from_slice(&buf[off + 24..off + 32]);
        Ok(WideRayHdr {
            az0: f32_at(0),
            tilt0: f32_at(4),
            az1: f32_at(8),
            tilt1: f32_at(12),
            num_bins: le_u32(buf, off + 16)? as i32,
            tm: le_u32(buf, off + 20)?,
            time: f64::from_le_bytes(t),
        })
    }
}

/// Wire size of a sweep header record on the bulk channel.
pub const SWEEP_HDR_WIRE_SIZE: usize = crate::tm::YMDS_WIRE_SIZE + 8;

/// Encode a sweep header for the bulk channel: YMDS time plus the sweep
/// angle in radians.
pub fn encode_sweep_hdr(h: &crate::volume::SweepHdr, out: &mut Vec<u8>) {
    h.tm.encode_into(out);
    out.extend_from_slice(&h.angle.to_le_bytes());
}

/// Decode one bulk-channel sweep header record.
pub fn decode_sweep_hdr(buf: &[u8], off: usize) -> Result<crate::volume::SweepHdr> {
    if buf.len() < off + SWEEP_HDR_WIRE_SIZE {
        return Err(SigmetError::TruncatedStream(format!(
            "sweep header at {} past end ({})",
            off,
            buf.len()
        )));
    }
    let tm = crate::tm::Ymds::decode(buf, off)?;
    let mut a = [0u8; 8];
    a.copy_from_slice(&buf[off + crate::tm::YMDS_WIRE_SIZE..off + SWEEP_HDR_WIRE_SIZE]);
    Ok(crate::volume::SweepHdr {
        tm,
        angle: f64::from_le_bytes(a),
    })
}

/// Encode physical values little-endian for the bulk channel.
pub fn f32_slice_to_bytes(vals: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vals.len() * 4);
    for v in vals {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode a bulk stream of little-endian f32 values.
pub fn bytes_to_f32_vec(buf: &[u8]) -> Result<Vec<f32>> {
    if buf.len() % 4 != 0 {
        return Err(SigmetError::Protocol(format!(
            "float stream of {} bytes is not a multiple of 4",
            buf.len()
        )));
    }
    let mut out = Vec::with_capacity(buf.len() / 4);
    for chunk in buf.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tm::tz_string;

    #[test]
    fn test_request_roundtrip() {
        let req = Request::new(SubCmd::Data)
            .with_data_type("DB_DBZ")
            .with_sweep(3);
        let wire = req.encode();
        assert_eq!(wire.len(), REQUEST_WIRE_SIZE);
        assert_eq!(Request::decode(&wire).unwrap(), req);
    }

    #[test]
    fn test_request_empty_type_is_default() {
        let req = Request::new(SubCmd::RayHeaders).with_sweep(ALL_SWEEPS);
        let back = Request::decode(&req.encode()).unwrap();
        assert_eq!(back.abbrv, "");
        assert!(back.all_sweeps());
    }

    #[test]
    fn test_request_long_abbrev_truncated() {
        let req = Request::new(SubCmd::Data).with_data_type("DB_TEMPERATURE16XX");
        let back = Request::decode(&req.encode()).unwrap();
        assert_eq!(back.abbrv, "DB_TEMPERATURE16");
    }

    #[test]
    fn test_request_bad_size() {
        assert!(matches!(
            Request::decode(&[0u8; 10]),
            Err(SigmetError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_bad_subcommand() {
        let mut wire = Request::new(SubCmd::Exit).encode();
        wire[0] = 99;
        assert!(matches!(
            Request::decode(&wire),
            Err(SigmetError::Protocol(_))
        ));
    }

    #[test]
    fn test_response_roundtrip() {
        let resp = Response::okay(tz_string(-300, false))
            .with_counts(2, 360, 2880)
            .with_sweep_time(1623758400.5);
        let wire = resp.encode();
        assert_eq!(wire.len(), RESPONSE_WIRE_SIZE);
        assert_eq!(Response::decode(&wire).unwrap(), resp);
    }

    #[test]
    fn test_response_error_has_all_slots() {
        // Even an error reply carries every slot so clients can always
        // parse it.
        let resp = Response::error(tz_string(0, true));
        let wire = resp.encode();
        assert_eq!(wire.len(), RESPONSE_WIRE_SIZE);
        let back = Response::decode(&wire).unwrap();
        assert!(!back.is_okay());
        assert_eq!(back.num_sweeps, 0);
        assert_eq!(back.num_rays, 0);
    }

    #[test]
    fn test_subcmd_all_values_roundtrip() {
        for cmd in [
            SubCmd::Exit,
            SubCmd::VolumeHeaders,
            SubCmd::SweepHeaders,
            SubCmd::RayHeaders,
            SubCmd::Data,
            SubCmd::Corrected,
        ] {
            assert_eq!(SubCmd::from_u32(cmd.as_u32()).unwrap(), cmd);
        }
        assert!(SubCmd::from_u32(42).is_err());
    }

    #[test]
    fn test_wide_ray_hdr_roundtrip() {
        let h = WideRayHdr {
            az0: 1.0,
            tilt0: 0.1,
            az1: 1.1,
            tilt1: 0.1,
            num_bins: 512,
            tm: 7,
            time: 1623758400.25,
        };
        let mut buf = Vec::new();
        h.encode_into(&mut buf);
        assert_eq!(buf.len(), WIDE_RAY_HDR_WIRE_SIZE);
        assert_eq!(WideRayHdr::decode(&buf, 0).unwrap(), h);
    }

    #[test]
    fn test_wide_ray_hdr_nan_time() {
        let h = WideRayHdr {
            az0: 0.0,
            tilt0: 0.0,
            az1: 0.0,
            tilt1: 0.0,
            num_bins: 0,
            tm: 0,
            time: f64::NAN,
        };
        let mut buf = Vec::new();
        h.encode_into(&mut buf);
        assert!(WideRayHdr::decode(&buf, 0).unwrap().time.is_nan());
    }

    #[test]
    fn test_sweep_hdr_record_roundtrip() {
        let h = crate::volume::SweepHdr {
            tm: crate::tm::Ymds {
                sec: 3600,
                year: 2021,
                month: 6,
                day: 15,
                ..Default::default()
            },
            angle: 0.5,
        };
        let mut buf = Vec::new();
        encode_sweep_hdr(&h, &mut buf);
        assert_eq!(buf.len(), SWEEP_HDR_WIRE_SIZE);
        assert_eq!(decode_sweep_hdr(&buf, 0).unwrap(), h);
    }

    #[test]
    fn test_f32_stream_roundtrip() {
        let vals = [1.5f32, -2.25, 0.0];
        let bytes = f32_slice_to_bytes(&vals);
        assert_eq!(bytes_to_f32_vec(&bytes).unwrap(), vals);
        assert!(bytes_to_f32_vec(&bytes[..5]).is_err());
    }
}
