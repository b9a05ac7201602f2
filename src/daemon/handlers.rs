//! Per-subcommand artifact production.
//!
//! Each handler builds the seven-slot response and the bytes destined for
//! the client's bulk channel. Failures come back as an error response plus
//! the human-readable text for the error channel.

use crate::ipc::messages::{encode_sweep_hdr, f32_slice_to_bytes, Request, Response, SubCmd, WideRayHdr};
use crate::types;
use crate::volume::Volume;

/// Outcome of serving one request.
pub enum Served {
    /// Send the response on the socket, then the bulk bytes on the bulk
    /// channel.
    Artifact { resp: Response, bulk: Vec<u8> },
    /// Send the response, then shut the daemon down.
    ExitRequested { resp: Response },
}

/// Route one validated request against the volume. The error arm carries
/// the response and the text for the error channel.
pub fn serve(vol: &Volume, req: &Request) -> Result<Served, (Response, String)> {
    match req.sub_cmd {
        SubCmd::Exit => Ok(Served::ExitRequested {
            resp: Response::okay(vol.headers.tz_field()),
        }),
        SubCmd::VolumeHeaders => volume_headers(vol),
        SubCmd::SweepHeaders => sweep_headers(vol),
        SubCmd::RayHeaders => ray_headers(vol, req),
        SubCmd::Data => sweep_data(vol, req, false),
        SubCmd::Corrected => sweep_data(vol, req, true),
    }
}

fn fail(vol: &Volume, msg: String) -> (Response, String) {
    (Response::error(vol.headers.tz_field()), msg)
}

/// Resolve the requested data type to a slot in the volume's type list.
/// An empty abbreviation selects the volume's default type.
fn resolve_type(vol: &Volume, abbrv: &str) -> Result<usize, String> {
    if abbrv.is_empty() {
        return vol
            .headers
            .default_type_index()
            .ok_or_else(|| "volume has no usable data type".to_string());
    }
    let ty = types::get_by_abbrev(abbrv)
        .ok_or_else(|| format!("{} is not a Sigmet data type.", abbrv))?;
    vol.headers
        .type_index(ty)
        .ok_or_else(|| format!("{} data type is not in volume.", abbrv))
}

fn first_sweep_time(vol: &Volume) -> f64 {
    if vol.sweeps_read > 0 {
        vol.sweep_hdrs[0].tm.to_seconds()
    } else {
        f64::NAN
    }
}

fn volume_headers(vol: &Volume) -> Result<Served, (Response, String)> {
    let resp = Response::okay(vol.headers.tz_field())
        .with_counts(vol.num_sweeps() as u32, vol.num_rays() as u32, 0)
        .with_sweep_time(first_sweep_time(vol));
    Ok(Served::Artifact {
        resp,
        bulk: vol.headers.encode(),
    })
}

fn sweep_headers(vol: &Volume) -> Result<Served, (Response, String)> {
    let mut bulk = Vec::new();
    for h in &vol.sweep_hdrs {
        encode_sweep_hdr(h, &mut bulk);
    }
    let resp = Response::okay(vol.headers.tz_field())
        .with_counts(vol.num_sweeps() as u32, vol.num_rays() as u32, 0)
        .with_sweep_time(first_sweep_time(vol));
    Ok(Served::Artifact { resp, bulk })
}

fn ray_headers(vol: &Volume, req: &Request) -> Result<Served, (Response, String)> {
    let y = resolve_type(vol, &req.abbrv).map_err(|m| fail(vol, m))?;
    let (s0, s1) = if req.all_sweeps() {
        (0, vol.num_sweeps())
    } else {
        let s = req.sweep as usize;
        if s >= vol.num_sweeps() {
            return Err(fail(
                vol,
                format!(
                    "sweep index {} out of range. Volume has {} sweeps.",
                    req.sweep,
                    vol.num_sweeps()
                ),
            ));
        }
        (s, s + 1)
    };
    let mut bulk = Vec::with_capacity((s1 - s0) * vol.num_rays() * 32);
    for s in s0..s1 {
        for r in 0..vol.num_rays() {
            let ray = vol.ray(s, r, y).map_err(|e| fail(vol, e.to_string()))?;
            let time = vol.ray_time(s, r).map_err(|e| fail(vol, e.to_string()))?;
            let w = WideRayHdr {
                az0: ray.hdr.az0,
                tilt0: ray.hdr.tilt0,
                az1: ray.hdr.az1,
                tilt1: ray.hdr.tilt1,
                num_bins: ray.hdr.num_bins,
                tm: ray.hdr.tm,
                time,
            };
            w.encode_into(&mut bulk);
        }
    }
    let reported_sweeps = (s1 - s0) as u32;
    let sweep_time = if s0 < vol.sweeps_read {
        vol.sweep_hdrs[s0].tm.to_seconds()
    } else {
        f64::NAN
    };
    let resp = Response::okay(vol.headers.tz_field())
        .with_counts(reported_sweeps, vol.num_rays() as u32, 0)
        .with_sweep_time(sweep_time);
    Ok(Served::Artifact { resp, bulk })
}

fn sweep_data(vol: &Volume, req: &Request, corrected: bool) -> Result<Served, (Response, String)> {
    let y = resolve_type(vol, &req.abbrv).map_err(|m| fail(vol, m))?;
    let ty = vol.headers.types[y];
    if req.all_sweeps() {
        return Err(fail(
            vol,
            "expected integer sweep index for data request".to_string(),
        ));
    }
    let s = req.sweep as usize;
    if s >= vol.num_sweeps() {
        return Err(fail(
            vol,
            format!(
                "sweep index {} out of range. Volume has {} sweeps.",
                req.sweep,
                vol.num_sweeps()
            ),
        ));
    }
    let mut vals: Vec<f32> = Vec::new();
    for r in 0..vol.num_rays() {
        let ray = *vol.ray(s, r, y).map_err(|e| fail(vol, e.to_string()))?;
        let bins = ray.hdr.num_bins as usize;
        if bins == 0 {
            continue;
        }
        let start = vals.len();
        vals.resize(start + bins, 0.0);
        match vol.ray_data(s, r, y).map_err(|e| fail(vol, e.to_string()))? {
            Some(stor) => {
                let out = &mut vals[start..start + bins];
                let res = if corrected {
                    ty.storage_to_corrected(bins, out, stor, &vol.headers)
                } else {
                    ty.storage_to_value(bins, out, stor, &vol.headers)
                };
                res.map_err(|e| fail(vol, e.to_string()))?;
            }
            // Absent rays contribute zero values.
            None => {}
        }
    }
    let sweep_time = if s < vol.sweeps_read {
        vol.sweep_hdrs[s].tm.to_seconds()
    } else {
        f64::NAN
    };
    let resp = Response::okay(vol.headers.tz_field())
        .with_counts(1, vol.num_rays() as u32, vals.len() as u32)
        .with_sweep_time(sweep_time);
    Ok(Served::Artifact {
        resp,
        bulk: f32_slice_to_bytes(&vals),
    })
}
