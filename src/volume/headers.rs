//! Raw product header structures.
//!
//! Member sequence imitates the sequence of data in the file, per the IRIS
//! Programmer's Manual, so each struct decodes with a forward cursor and
//! then skips to its declared size. Nothing is converted on input: angles
//! stay binary angles, offsets stay in file units.

use crate::bits;
use crate::error::{Result, SigmetError};
use crate::tm::Ymds;

/// Maximum number of sweeps in a volume.
pub const MAX_SWEEPS: usize = 40;

/// Number of 32-bit words in the DSP data mask.
pub const NUM_MASK_WORDS: usize = 5;

pub const STRUCT_HDR_SIZE: usize = 12;
pub const PROD_CFG_SIZE: usize = 320;
pub const PROD_END_SIZE: usize = 308;
pub const PROD_HDR_SIZE: usize = STRUCT_HDR_SIZE + PROD_CFG_SIZE + PROD_END_SIZE;
pub const INGEST_CFG_SIZE: usize = 480;
pub const TASK_SCHED_SIZE: usize = 120;
pub const TASK_DSP_SIZE: usize = 320;
pub const TASK_CALIB_SIZE: usize = 320;
pub const TASK_RNG_SIZE: usize = 160;
pub const TASK_SCAN_SIZE: usize = 320;
pub const TASK_MISC_SIZE: usize = 320;
pub const TASK_END_SIZE: usize = 320;
/// Declared size of the task configuration; the tail past the last
/// sub-configuration is reserved.
pub const TASK_CFG_SIZE: usize = 2612;
pub const INGEST_HDR_SIZE: usize = STRUCT_HDR_SIZE + INGEST_CFG_SIZE + TASK_CFG_SIZE;

/// Forward cursor over a header record.
pub(crate) struct Cur<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cur<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let b = self.buf.get(self.pos..self.pos + n).ok_or_else(|| {
            SigmetError::TruncatedStream(format!(
                "header field of {} bytes at offset {} past end ({})",
                n,
                self.pos,
                self.buf.len()
            ))
        })?;
        self.pos += n;
        Ok(b)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        bits::le_i16(b, 0)
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        bits::le_u16(b, 0)
    }

    pub fn i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        bits::le_i32(b, 0)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        bits::le_u32(b, 0)
    }

    pub fn ymds(&mut self) -> Result<Ymds> {
        let b = self.take(crate::tm::YMDS_WIRE_SIZE)?;
        Ymds::decode(b, 0)
    }

    /// Fixed-width string field, trailing NULs and spaces trimmed.
    pub fn string(&mut self, n: usize) -> Result<String> {
        let b = self.take(n)?;
        let s = String::from_utf8_lossy(b);
        Ok(s.trim_end_matches(['\0', ' ']).to_string())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n)?;
        Ok(())
    }

    /// Child cursor over the next `n` bytes; the parent advances by `n`
    /// whether or not the child reads everything.
    pub fn sub(&mut self, n: usize) -> Result<Cur<'a>> {
        Ok(Cur::new(self.take(n)?))
    }
}

/// Write a fixed-width string field.
pub(crate) fn put_str(out: &mut Vec<u8>, s: &str, n: usize) {
    let bytes = s.as_bytes();
    for i in 0..n {
        out.push(*bytes.get(i).unwrap_or(&0));
    }
}

/// Pad the encoding of a struct out to its declared size.
pub(crate) fn pad_to(out: &mut Vec<u8>, start: usize, size: usize) {
    debug_assert!(out.len() <= start + size, "struct encoding overran declared size");
    out.resize(start + size, 0);
}

/// Generic structure header preceding each major header block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StructHdr {
    pub id: i16,
    pub format: i16,
    pub sz: i32,
    pub flags: i16,
}

impl StructHdr {
    pub(crate) fn decode(cur: &mut Cur) -> Result<StructHdr> {
        let mut c = cur.sub(STRUCT_HDR_SIZE)?;
        Ok(StructHdr {
            id: c.i16()?,
            format: c.i16()?,
            sz: c.i32()?,
            flags: c.i16()?,
        })
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.format.to_le_bytes());
        out.extend_from_slice(&self.sz.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        pad_to(out, start, STRUCT_HDR_SIZE);
    }
}

/// Product-specific info for a raw product: the data mask and the
/// extended-header type code.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProdSpecificInfo {
    pub data_type_mask: u32,
    pub rng_last_bin: i32,
    pub format_conv_flag: u32,
    pub flag: u32,
    pub sweep_num: i32,
    pub xhdr_type: u32,
    pub data_type_mask1: u32,
    pub data_type_mask2: u32,
    pub data_type_mask3: u32,
    pub data_type_mask4: u32,
    pub playback_vsn: u32,
}

const PROD_SPECIFIC_INFO_SIZE: usize = 44;

impl ProdSpecificInfo {
    fn decode(cur: &mut Cur) -> Result<ProdSpecificInfo> {
        let mut c = cur.sub(PROD_SPECIFIC_INFO_SIZE)?;
        Ok(ProdSpecificInfo {
            data_type_mask: c.u32()?,
            rng_last_bin: c.i32()?,
            format_conv_flag: c.u32()?,
            flag: c.u32()?,
            sweep_num: c.i32()?,
            xhdr_type: c.u32()?,
            data_type_mask1: c.u32()?,
            data_type_mask2: c.u32()?,
            data_type_mask3: c.u32()?,
            data_type_mask4: c.u32()?,
            playback_vsn: c.u32()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for w in [
            self.data_type_mask,
            self.rng_last_bin as u32,
            self.format_conv_flag,
            self.flag,
            self.sweep_num as u32,
            self.xhdr_type,
            self.data_type_mask1,
            self.data_type_mask2,
            self.data_type_mask3,
            self.data_type_mask4,
            self.playback_vsn,
        ] {
            out.extend_from_slice(&w.to_le_bytes());
        }
        pad_to(out, start, PROD_SPECIFIC_INFO_SIZE);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScaleDef {
    pub flags: u32,
    pub istart: i32,
    pub istep: i32,
    pub icolcnt: i16,
    pub iset_and_scale: u16,
    pub ilevel_seams: [u16; 16],
}

impl Default for ColorScaleDef {
    fn default() -> Self {
        Self {
            flags: 0,
            istart: 0,
            istep: 0,
            icolcnt: 0,
            iset_and_scale: 0,
            ilevel_seams: [0; 16],
        }
    }
}

const COLOR_SCALE_DEF_SIZE: usize = 48;

impl ColorScaleDef {
    fn decode(cur: &mut Cur) -> Result<ColorScaleDef> {
        let mut c = cur.sub(COLOR_SCALE_DEF_SIZE)?;
        let flags = c.u32()?;
        let istart = c.i32()?;
        let istep = c.i32()?;
        let icolcnt = c.i16()?;
        let iset_and_scale = c.u16()?;
        let mut ilevel_seams = [0u16; 16];
        for seam in ilevel_seams.iter_mut() {
            *seam = c.u16()?;
        }
        Ok(ColorScaleDef {
            flags,
            istart,
            istep,
            icolcnt,
            iset_and_scale,
            ilevel_seams,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.istart.to_le_bytes());
        out.extend_from_slice(&self.istep.to_le_bytes());
        out.extend_from_slice(&self.icolcnt.to_le_bytes());
        out.extend_from_slice(&self.iset_and_scale.to_le_bytes());
        for seam in &self.ilevel_seams {
            out.extend_from_slice(&seam.to_le_bytes());
        }
        pad_to(out, start, COLOR_SCALE_DEF_SIZE);
    }
}

/// Product configuration, record #1 after the structure header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProdCfg {
    pub struct_hdr: StructHdr,
    pub ptype: u16,
    pub scheduling: u16,
    pub skip: i32,
    pub gen_tm: Ymds,
    pub ingest_sweep_tm: Ymds,
    pub ingest_file_tm: Ymds,
    pub cfg_file: String,
    pub task_name: String,
    pub flag: u16,
    pub x_scale: i32,
    pub y_scale: i32,
    pub z_scale: i32,
    pub x_size: i32,
    pub y_size: i32,
    pub z_size: i32,
    pub x_loc: i32,
    pub y_loc: i32,
    pub z_loc: i32,
    pub max_rng: i32,
    pub data_type: u16,
    pub proj: String,
    pub inp_data_type: u16,
    pub proj_type: u8,
    pub rad_smoother: i16,
    pub num_runs: i16,
    pub zr_const: i32,
    pub zr_exp: i32,
    pub x_smooth: i16,
    pub y_smooth: i16,
    pub prod_specific_info: ProdSpecificInfo,
    pub suffixes: String,
    pub color_scale_def: ColorScaleDef,
}

/// Length of the task name field.
pub const TASK_NAME_LEN: usize = 12;

impl ProdCfg {
    fn decode(cur: &mut Cur) -> Result<ProdCfg> {
        let mut c = cur.sub(PROD_CFG_SIZE)?;
        Ok(ProdCfg {
            struct_hdr: StructHdr::decode(&mut c)?,
            ptype: c.u16()?,
            scheduling: c.u16()?,
            skip: c.i32()?,
            gen_tm: c.ymds()?,
            ingest_sweep_tm: c.ymds()?,
            ingest_file_tm: c.ymds()?,
            cfg_file: c.string(12)?,
            task_name: c.string(TASK_NAME_LEN)?,
            flag: c.u16()?,
            x_scale: c.i32()?,
            y_scale: c.i32()?,
            z_scale: c.i32()?,
            x_size: c.i32()?,
            y_size: c.i32()?,
            z_size: c.i32()?,
            x_loc: c.i32()?,
            y_loc: c.i32()?,
            z_loc: c.i32()?,
            max_rng: c.i32()?,
            data_type: c.u16()?,
            proj: c.string(12)?,
            inp_data_type: c.u16()?,
            proj_type: c.u8()?,
            rad_smoother: c.i16()?,
            num_runs: c.i16()?,
            zr_const: c.i32()?,
            zr_exp: c.i32()?,
            x_smooth: c.i16()?,
            y_smooth: c.i16()?,
            prod_specific_info: ProdSpecificInfo::decode(&mut c)?,
            suffixes: c.string(16)?,
            color_scale_def: ColorScaleDef::decode(&mut c)?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.struct_hdr.encode_into(out);
        out.extend_from_slice(&self.ptype.to_le_bytes());
        out.extend_from_slice(&self.scheduling.to_le_bytes());
        out.extend_from_slice(&self.skip.to_le_bytes());
        self.gen_tm.encode_into(out);
        self.ingest_sweep_tm.encode_into(out);
        self.ingest_file_tm.encode_into(out);
        put_str(out, &self.cfg_file, 12);
        put_str(out, &self.task_name, TASK_NAME_LEN);
        out.extend_from_slice(&self.flag.to_le_bytes());
        for v in [
            self.x_scale, self.y_scale, self.z_scale, self.x_size, self.y_size, self.z_size,
            self.x_loc, self.y_loc, self.z_loc, self.max_rng,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.data_type.to_le_bytes());
        put_str(out, &self.proj, 12);
        out.extend_from_slice(&self.inp_data_type.to_le_bytes());
        out.push(self.proj_type);
        out.extend_from_slice(&self.rad_smoother.to_le_bytes());
        out.extend_from_slice(&self.num_runs.to_le_bytes());
        out.extend_from_slice(&self.zr_const.to_le_bytes());
        out.extend_from_slice(&self.zr_exp.to_le_bytes());
        out.extend_from_slice(&self.x_smooth.to_le_bytes());
        out.extend_from_slice(&self.y_smooth.to_le_bytes());
        self.prod_specific_info.encode_into(out);
        put_str(out, &self.suffixes, 16);
        self.color_scale_def.encode_into(out);
        pad_to(out, start, PROD_CFG_SIZE);
    }
}

/// Product end block: site identification, radar parameters, calibration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProdEnd {
    pub site_name_prod: String,
    pub iris_prod_vsn: String,
    pub iris_ing_vsn: String,
    pub local_wgmt: i16,
    pub hw_name: String,
    pub site_name_ing: String,
    pub rec_wgmt: i16,
    pub center_lat: u32,
    pub center_lon: u32,
    pub ground_elev: i16,
    pub radar_ht: i16,
    pub prf: i32,
    pub pulse_w: i32,
    pub proc_type: u16,
    pub trgr_rate_scheme: u16,
    pub num_samples: i16,
    pub clutter_filter: String,
    pub lin_filter: u16,
    /// Wavelength in 1/100 of a centimeter
    pub wave_len: i32,
    pub trunc_ht: i32,
    pub rng_first_bin: i32,
    pub rng_last_bin: i32,
    pub num_bins_out: i32,
    pub flag: u16,
    pub polzn: u16,
    pub h_pol_io_cal: i16,
    pub h_pol_cal_noise: i16,
    pub h_pol_radar_const: i16,
    pub recv_bandw: u16,
    pub h_pol_noise: i16,
    pub v_pol_noise: i16,
    pub ldr_offset: i16,
    pub zdr_offset: i16,
    pub tz: String,
}

/// Length of site name fields.
pub const SITE_NAME_LEN: usize = 16;

impl ProdEnd {
    fn decode(cur: &mut Cur) -> Result<ProdEnd> {
        let mut c = cur.sub(PROD_END_SIZE)?;
        Ok(ProdEnd {
            site_name_prod: c.string(SITE_NAME_LEN)?,
            iris_prod_vsn: c.string(8)?,
            iris_ing_vsn: c.string(8)?,
            local_wgmt: c.i16()?,
            hw_name: c.string(SITE_NAME_LEN)?,
            site_name_ing: c.string(SITE_NAME_LEN)?,
            rec_wgmt: c.i16()?,
            center_lat: c.u32()?,
            center_lon: c.u32()?,
            ground_elev: c.i16()?,
            radar_ht: c.i16()?,
            prf: c.i32()?,
            pulse_w: c.i32()?,
            proc_type: c.u16()?,
            trgr_rate_scheme: c.u16()?,
            num_samples: c.i16()?,
            clutter_filter: c.string(12)?,
            lin_filter: c.u16()?,
            wave_len: c.i32()?,
            trunc_ht: c.i32()?,
            rng_first_bin: c.i32()?,
            rng_last_bin: c.i32()?,
            num_bins_out: c.i32()?,
            flag: c.u16()?,
            polzn: c.u16()?,
            h_pol_io_cal: c.i16()?,
            h_pol_cal_noise: c.i16()?,
            h_pol_radar_const: c.i16()?,
            recv_bandw: c.u16()?,
            h_pol_noise: c.i16()?,
            v_pol_noise: c.i16()?,
            ldr_offset: c.i16()?,
            zdr_offset: c.i16()?,
            tz: c.string(8)?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        put_str(out, &self.site_name_prod, SITE_NAME_LEN);
        put_str(out, &self.iris_prod_vsn, 8);
        put_str(out, &self.iris_ing_vsn, 8);
        out.extend_from_slice(&self.local_wgmt.to_le_bytes());
        put_str(out, &self.hw_name, SITE_NAME_LEN);
        put_str(out, &self.site_name_ing, SITE_NAME_LEN);
        out.extend_from_slice(&self.rec_wgmt.to_le_bytes());
        out.extend_from_slice(&self.center_lat.to_le_bytes());
        out.extend_from_slice(&self.center_lon.to_le_bytes());
        out.extend_from_slice(&self.ground_elev.to_le_bytes());
        out.extend_from_slice(&self.radar_ht.to_le_bytes());
        out.extend_from_slice(&self.prf.to_le_bytes());
        out.extend_from_slice(&self.pulse_w.to_le_bytes());
        out.extend_from_slice(&self.proc_type.to_le_bytes());
        out.extend_from_slice(&self.trgr_rate_scheme.to_le_bytes());
        out.extend_from_slice(&self.num_samples.to_le_bytes());
        put_str(out, &self.clutter_filter, 12);
        out.extend_from_slice(&self.lin_filter.to_le_bytes());
        out.extend_from_slice(&self.wave_len.to_le_bytes());
        out.extend_from_slice(&self.trunc_ht.to_le_bytes());
        out.extend_from_slice(&self.rng_first_bin.to_le_bytes());
        out.extend_from_slice(&self.rng_last_bin.to_le_bytes());
        out.extend_from_slice(&self.num_bins_out.to_le_bytes());
        out.extend_from_slice(&self.flag.to_le_bytes());
        out.extend_from_slice(&self.polzn.to_le_bytes());
        out.extend_from_slice(&self.h_pol_io_cal.to_le_bytes());
        out.extend_from_slice(&self.h_pol_cal_noise.to_le_bytes());
        out.extend_from_slice(&self.h_pol_radar_const.to_le_bytes());
        out.extend_from_slice(&self.recv_bandw.to_le_bytes());
        out.extend_from_slice(&self.h_pol_noise.to_le_bytes());
        out.extend_from_slice(&self.v_pol_noise.to_le_bytes());
        out.extend_from_slice(&self.ldr_offset.to_le_bytes());
        out.extend_from_slice(&self.zdr_offset.to_le_bytes());
        put_str(out, &self.tz, 8);
        pad_to(out, start, PROD_END_SIZE);
    }
}

/// Record #1 of a raw product file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProdHdr {
    pub struct_hdr: StructHdr,
    pub cfg: ProdCfg,
    pub end: ProdEnd,
}

impl ProdHdr {
    pub fn decode(buf: &[u8]) -> Result<ProdHdr> {
        let mut c = Cur::new(buf);
        Ok(ProdHdr {
            struct_hdr: StructHdr::decode(&mut c)?,
            cfg: ProdCfg::decode(&mut c)?,
            end: ProdEnd::decode(&mut c)?,
        })
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.struct_hdr.encode_into(out);
        self.cfg.encode_into(out);
        self.end.encode_into(out);
        pad_to(out, start, PROD_HDR_SIZE);
    }
}

/// Ingest configuration: file bookkeeping, ray geometry, site, time zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestCfg {
    pub file_name: String,
    pub num_assoc_files: i16,
    pub num_sweeps_done: i16,
    pub size_files: i32,
    pub vol_start_tm: Ymds,
    pub ray_hdr_sz: i16,
    pub ext_ray_hdr_sz: i16,
    pub task_cfg_tbl_num: i16,
    pub playback_vsn: i16,
    pub iris_vsn: String,
    pub hw_site_name: String,
    pub local_wgmt: i16,
    pub su_site_name: String,
    pub rec_wgmt: i16,
    pub lat: u32,
    pub lon: u32,
    pub ground_elev: i16,
    pub radar_ht: i16,
    pub resolution: u16,
    pub index_first_ray: u16,
    pub num_rays: u16,
    pub num_bytes_g_param: i16,
    pub altitude: i32,
    pub velocity: [i32; 3],
    pub offset_inu: [i32; 3],
    pub fault: u32,
    pub melt_level: i16,
    pub tz: String,
    pub flags: u32,
    pub cfg_name: String,
}

impl IngestCfg {
    fn decode(cur: &mut Cur) -> Result<IngestCfg> {
        let mut c = cur.sub(INGEST_CFG_SIZE)?;
        Ok(IngestCfg {
            file_name: c.string(80)?,
            num_assoc_files: c.i16()?,
            num_sweeps_done: c.i16()?,
            size_files: c.i32()?,
            vol_start_tm: c.ymds()?,
            ray_hdr_sz: c.i16()?,
            ext_ray_hdr_sz: c.i16()?,
            task_cfg_tbl_num: c.i16()?,
            playback_vsn: c.i16()?,
            iris_vsn: c.string(8)?,
            hw_site_name: c.string(SITE_NAME_LEN)?,
            local_wgmt: c.i16()?,
            su_site_name: c.string(SITE_NAME_LEN)?,
            rec_wgmt: c.i16()?,
            lat: c.u32()?,
            lon: c.u32()?,
            ground_elev: c.i16()?,
            radar_ht: c.i16()?,
            resolution: c.u16()?,
            index_first_ray: c.u16()?,
            num_rays: c.u16()?,
            num_bytes_g_param: c.i16()?,
            altitude: c.i32()?,
            velocity: [c.i32()?, c.i32()?, c.i32()?],
            offset_inu: [c.i32()?, c.i32()?, c.i32()?],
            fault: c.u32()?,
            melt_level: c.i16()?,
            tz: c.string(8)?,
            flags: c.u32()?,
            cfg_name: c.string(16)?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        put_str(out, &self.file_name, 80);
        out.extend_from_slice(&self.num_assoc_files.to_le_bytes());
        out.extend_from_slice(&self.num_sweeps_done.to_le_bytes());
        out.extend_from_slice(&self.size_files.to_le_bytes());
        self.vol_start_tm.encode_into(out);
        out.extend_from_slice(&self.ray_hdr_sz.to_le_bytes());
        out.extend_from_slice(&self.ext_ray_hdr_sz.to_le_bytes());
        out.extend_from_slice(&self.task_cfg_tbl_num.to_le_bytes());
        out.extend_from_slice(&self.playback_vsn.to_le_bytes());
        put_str(out, &self.iris_vsn, 8);
        put_str(out, &self.hw_site_name, SITE_NAME_LEN);
        out.extend_from_slice(&self.local_wgmt.to_le_bytes());
        put_str(out, &self.su_site_name, SITE_NAME_LEN);
        out.extend_from_slice(&self.rec_wgmt.to_le_bytes());
        out.extend_from_slice(&self.lat.to_le_bytes());
        out.extend_from_slice(&self.lon.to_le_bytes());
        out.extend_from_slice(&self.ground_elev.to_le_bytes());
        out.extend_from_slice(&self.radar_ht.to_le_bytes());
        out.extend_from_slice(&self.resolution.to_le_bytes());
        out.extend_from_slice(&self.index_first_ray.to_le_bytes());
        out.extend_from_slice(&self.num_rays.to_le_bytes());
        out.extend_from_slice(&self.num_bytes_g_param.to_le_bytes());
        out.extend_from_slice(&self.altitude.to_le_bytes());
        for v in self.velocity.iter().chain(self.offset_inu.iter()) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.fault.to_le_bytes());
        out.extend_from_slice(&self.melt_level.to_le_bytes());
        put_str(out, &self.tz, 8);
        out.extend_from_slice(&self.flags.to_le_bytes());
        put_str(out, &self.cfg_name, 16);
        pad_to(out, start, INGEST_CFG_SIZE);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskSchedInfo {
    pub start_tm: i32,
    pub stop_tm: i32,
    pub skip: i32,
    pub tm_last_run: i32,
    pub tm_used_last_run: i32,
    pub rel_day_last_run: i32,
    pub flag: u16,
}

impl TaskSchedInfo {
    fn decode(cur: &mut Cur) -> Result<TaskSchedInfo> {
        let mut c = cur.sub(TASK_SCHED_SIZE)?;
        Ok(TaskSchedInfo {
            start_tm: c.i32()?,
            stop_tm: c.i32()?,
            skip: c.i32()?,
            tm_last_run: c.i32()?,
            tm_used_last_run: c.i32()?,
            rel_day_last_run: c.i32()?,
            flag: c.u16()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for v in [
            self.start_tm,
            self.stop_tm,
            self.skip,
            self.tm_last_run,
            self.tm_used_last_run,
            self.rel_day_last_run,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.flag.to_le_bytes());
        pad_to(out, start, TASK_SCHED_SIZE);
    }
}

/// 5x32-bit bitmap of the data types present in the volume, plus the
/// extended-header type code.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DspDataMask {
    pub mask_word_0: u32,
    pub ext_hdr_type: u32,
    pub mask_word_1: u32,
    pub mask_word_2: u32,
    pub mask_word_3: u32,
    pub mask_word_4: u32,
}

const DSP_DATA_MASK_SIZE: usize = 24;

impl DspDataMask {
    fn decode(cur: &mut Cur) -> Result<DspDataMask> {
        let mut c = cur.sub(DSP_DATA_MASK_SIZE)?;
        Ok(DspDataMask {
            mask_word_0: c.u32()?,
            ext_hdr_type: c.u32()?,
            mask_word_1: c.u32()?,
            mask_word_2: c.u32()?,
            mask_word_3: c.u32()?,
            mask_word_4: c.u32()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for w in [
            self.mask_word_0,
            self.ext_hdr_type,
            self.mask_word_1,
            self.mask_word_2,
            self.mask_word_3,
            self.mask_word_4,
        ] {
            out.extend_from_slice(&w.to_le_bytes());
        }
        pad_to(out, start, DSP_DATA_MASK_SIZE);
    }

    /// Mask words in canonical order.
    pub fn words(&self) -> [u32; NUM_MASK_WORDS] {
        [
            self.mask_word_0,
            self.mask_word_1,
            self.mask_word_2,
            self.mask_word_3,
            self.mask_word_4,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskDspModeBatch {
    pub lo_prf: u16,
    pub lo_prf_frac: u16,
    pub lo_prf_sample: i16,
    pub lo_prf_avg: i16,
    pub dz_unfold_thresh: i16,
    pub vr_unfold_thresh: i16,
    pub sw_unfold_thresh: i16,
}

const TASK_DSP_MODE_BATCH_SIZE: usize = 14;

impl TaskDspModeBatch {
    fn decode(cur: &mut Cur) -> Result<TaskDspModeBatch> {
        let mut c = cur.sub(TASK_DSP_MODE_BATCH_SIZE)?;
        Ok(TaskDspModeBatch {
            lo_prf: c.u16()?,
            lo_prf_frac: c.u16()?,
            lo_prf_sample: c.i16()?,
            lo_prf_avg: c.i16()?,
            dz_unfold_thresh: c.i16()?,
            vr_unfold_thresh: c.i16()?,
            sw_unfold_thresh: c.i16()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.lo_prf.to_le_bytes());
        out.extend_from_slice(&self.lo_prf_frac.to_le_bytes());
        out.extend_from_slice(&self.lo_prf_sample.to_le_bytes());
        out.extend_from_slice(&self.lo_prf_avg.to_le_bytes());
        out.extend_from_slice(&self.dz_unfold_thresh.to_le_bytes());
        out.extend_from_slice(&self.vr_unfold_thresh.to_le_bytes());
        out.extend_from_slice(&self.sw_unfold_thresh.to_le_bytes());
        pad_to(out, start, TASK_DSP_MODE_BATCH_SIZE);
    }
}

/// Multi PRF mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultiPrfMode {
    #[default]
    OneOne,
    TwoThree,
    ThreeFour,
    FourFive,
}

impl MultiPrfMode {
    fn from_u16(v: u16) -> MultiPrfMode {
        match v {
            1 => MultiPrfMode::TwoThree,
            2 => MultiPrfMode::ThreeFour,
            3 => MultiPrfMode::FourFive,
            _ => MultiPrfMode::OneOne,
        }
    }

    fn as_u16(self) -> u16 {
        match self {
            MultiPrfMode::OneOne => 0,
            MultiPrfMode::TwoThree => 1,
            MultiPrfMode::ThreeFour => 2,
            MultiPrfMode::FourFive => 3,
        }
    }

    /// Nyquist unfolding factor for this PRF ratio.
    pub fn unfolding_factor(self) -> f64 {
        match self {
            MultiPrfMode::OneOne => 1.0,
            MultiPrfMode::TwoThree => 2.0,
            MultiPrfMode::ThreeFour => 3.0,
            MultiPrfMode::FourFive => 4.0,
        }
    }
}

/// DSP section of the task configuration, including the data mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDspInfo {
    pub major_mode: u16,
    pub dsp_type: u16,
    pub curr_data_mask: DspDataMask,
    pub orig_data_mask: DspDataMask,
    pub mode_batch: TaskDspModeBatch,
    pub prf: i32,
    pub pulse_w: i32,
    pub multi_prf_mode: MultiPrfMode,
    pub dual_prf: i16,
    pub agc_feedback: u16,
    pub sample_size: i16,
    pub gain_flag: u16,
    pub clutter_file: String,
    pub lin_filter_num: u8,
    pub log_filter_num: u8,
    pub attenuation: i16,
    pub gas_attenuation: u16,
    pub clutter_flag: bool,
    pub xmt_phase: u16,
    pub ray_hdr_mask: u32,
    pub tm_series_flag: u16,
    pub custom_ray_hdr: String,
}

impl TaskDspInfo {
    fn decode(cur: &mut Cur) -> Result<TaskDspInfo> {
        let mut c = cur.sub(TASK_DSP_SIZE)?;
        Ok(TaskDspInfo {
            major_mode: c.u16()?,
            dsp_type: c.u16()?,
            curr_data_mask: DspDataMask::decode(&mut c)?,
            orig_data_mask: DspDataMask::decode(&mut c)?,
            mode_batch: TaskDspModeBatch::decode(&mut c)?,
            prf: c.i32()?,
            pulse_w: c.i32()?,
            multi_prf_mode: MultiPrfMode::from_u16(c.u16()?),
            dual_prf: c.i16()?,
            agc_feedback: c.u16()?,
            sample_size: c.i16()?,
            gain_flag: c.u16()?,
            clutter_file: c.string(12)?,
            lin_filter_num: c.u8()?,
            log_filter_num: c.u8()?,
            attenuation: c.i16()?,
            gas_attenuation: c.u16()?,
            clutter_flag: c.u16()? != 0,
            xmt_phase: c.u16()?,
            ray_hdr_mask: c.u32()?,
            tm_series_flag: c.u16()?,
            custom_ray_hdr: c.string(16)?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.major_mode.to_le_bytes());
        out.extend_from_slice(&self.dsp_type.to_le_bytes());
        self.curr_data_mask.encode_into(out);
        self.orig_data_mask.encode_into(out);
        self.mode_batch.encode_into(out);
        out.extend_from_slice(&self.prf.to_le_bytes());
        out.extend_from_slice(&self.pulse_w.to_le_bytes());
        out.extend_from_slice(&self.multi_prf_mode.as_u16().to_le_bytes());
        out.extend_from_slice(&self.dual_prf.to_le_bytes());
        out.extend_from_slice(&self.agc_feedback.to_le_bytes());
        out.extend_from_slice(&self.sample_size.to_le_bytes());
        out.extend_from_slice(&self.gain_flag.to_le_bytes());
        put_str(out, &self.clutter_file, 12);
        out.push(self.lin_filter_num);
        out.push(self.log_filter_num);
        out.extend_from_slice(&self.attenuation.to_le_bytes());
        out.extend_from_slice(&self.gas_attenuation.to_le_bytes());
        out.extend_from_slice(&(self.clutter_flag as u16).to_le_bytes());
        out.extend_from_slice(&self.xmt_phase.to_le_bytes());
        out.extend_from_slice(&self.ray_hdr_mask.to_le_bytes());
        out.extend_from_slice(&self.tm_series_flag.to_le_bytes());
        put_str(out, &self.custom_ray_hdr, 16);
        pad_to(out, start, TASK_DSP_SIZE);
    }
}

/// Calibration section of the task configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskCalibInfo {
    pub dbz_slope: i16,
    pub dbz_noise_thresh: i16,
    pub clutter_corr_thresh: i16,
    pub sqi_thresh: i16,
    pub pwr_thresh: i16,
    pub cal_dbz: i16,
    pub dbt_flags: u16,
    pub dbz_flags: u16,
    pub vel_flags: u16,
    pub sw_flags: u16,
    pub zdr_flags: u16,
    pub flags: u16,
    /// LDR bias in 1/16 dB
    pub ldr_bias: i16,
    /// ZDR bias in 1/16 dB
    pub zdr_bias: i16,
    pub nx_clutter_thresh: i16,
    pub nx_clutter_skip: u16,
    pub h_pol_io_cal: i16,
    pub v_pol_io_cal: i16,
    pub h_pol_noise: i16,
    pub v_pol_noise: i16,
    pub h_pol_radar_const: i16,
    pub v_pol_radar_const: i16,
    pub bandwidth: u16,
    pub flags2: u16,
}

impl TaskCalibInfo {
    fn decode(cur: &mut Cur) -> Result<TaskCalibInfo> {
        let mut c = cur.sub(TASK_CALIB_SIZE)?;
        Ok(TaskCalibInfo {
            dbz_slope: c.i16()?,
            dbz_noise_thresh: c.i16()?,
            clutter_corr_thresh: c.i16()?,
            sqi_thresh: c.i16()?,
            pwr_thresh: c.i16()?,
            cal_dbz: c.i16()?,
            dbt_flags: c.u16()?,
            dbz_flags: c.u16()?,
            vel_flags: c.u16()?,
            sw_flags: c.u16()?,
            zdr_flags: c.u16()?,
            flags: c.u16()?,
            ldr_bias: c.i16()?,
            zdr_bias: c.i16()?,
            nx_clutter_thresh: c.i16()?,
            nx_clutter_skip: c.u16()?,
            h_pol_io_cal: c.i16()?,
            v_pol_io_cal: c.i16()?,
            h_pol_noise: c.i16()?,
            v_pol_noise: c.i16()?,
            h_pol_radar_const: c.i16()?,
            v_pol_radar_const: c.i16()?,
            bandwidth: c.u16()?,
            flags2: c.u16()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for v in [
            self.dbz_slope,
            self.dbz_noise_thresh,
            self.clutter_corr_thresh,
            self.sqi_thresh,
            self.pwr_thresh,
            self.cal_dbz,
            self.dbt_flags as i16,
            self.dbz_flags as i16,
            self.vel_flags as i16,
            self.sw_flags as i16,
            self.zdr_flags as i16,
            self.flags as i16,
            self.ldr_bias,
            self.zdr_bias,
            self.nx_clutter_thresh,
            self.nx_clutter_skip as i16,
            self.h_pol_io_cal,
            self.v_pol_io_cal,
            self.h_pol_noise,
            self.v_pol_noise,
            self.h_pol_radar_const,
            self.v_pol_radar_const,
            self.bandwidth as i16,
            self.flags2 as i16,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        pad_to(out, start, TASK_CALIB_SIZE);
    }
}

/// Range section of the task configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskRngInfo {
    pub rng_first_bin: i32,
    pub rng_last_bin: i32,
    pub num_bins_in: i16,
    pub num_bins_out: i16,
    pub step_in: i32,
    pub step_out: i32,
    pub flag: u16,
    pub rng_avg_flag: i16,
}

impl TaskRngInfo {
    fn decode(cur: &mut Cur) -> Result<TaskRngInfo> {
        let mut c = cur.sub(TASK_RNG_SIZE)?;
        Ok(TaskRngInfo {
            rng_first_bin: c.i32()?,
            rng_last_bin: c.i32()?,
            num_bins_in: c.i16()?,
            num_bins_out: c.i16()?,
            step_in: c.i32()?,
            step_out: c.i32()?,
            flag: c.u16()?,
            rng_avg_flag: c.i16()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.rng_first_bin.to_le_bytes());
        out.extend_from_slice(&self.rng_last_bin.to_le_bytes());
        out.extend_from_slice(&self.num_bins_in.to_le_bytes());
        out.extend_from_slice(&self.num_bins_out.to_le_bytes());
        out.extend_from_slice(&self.step_in.to_le_bytes());
        out.extend_from_slice(&self.step_out.to_le_bytes());
        out.extend_from_slice(&self.flag.to_le_bytes());
        out.extend_from_slice(&self.rng_avg_flag.to_le_bytes());
        pad_to(out, start, TASK_RNG_SIZE);
    }
}

/// Volume scan modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    #[default]
    PpiSector,
    Rhi,
    Manual,
    PpiContinuous,
    File,
}

impl ScanMode {
    fn from_u16(v: u16) -> Result<ScanMode> {
        match v {
            1 => Ok(ScanMode::PpiSector),
            2 => Ok(ScanMode::Rhi),
            3 => Ok(ScanMode::Manual),
            4 => Ok(ScanMode::PpiContinuous),
            5 => Ok(ScanMode::File),
            _ => Err(SigmetError::MalformedHeader(format!("unknown scan mode {}", v))),
        }
    }

    fn as_u16(self) -> u16 {
        match self {
            ScanMode::PpiSector => 1,
            ScanMode::Rhi => 2,
            ScanMode::Manual => 3,
            ScanMode::PpiContinuous => 4,
            ScanMode::File => 5,
        }
    }
}

/// Scan-mode specific part of the task scan info.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanInfo {
    Rhi {
        lo_elev: u16,
        hi_elev: u16,
        /// Per-sweep azimuths as 16-bit binary angles
        az: [u16; MAX_SWEEPS],
        start: u8,
    },
    Ppi {
        left_az: u16,
        right_az: u16,
        /// Per-sweep elevations as 16-bit binary angles
        elev: [u16; MAX_SWEEPS],
        start: u8,
    },
    File {
        az0: u16,
        elev0: u16,
        ant_ctrl: String,
    },
    Manual {
        flags: u16,
    },
}

impl Default for ScanInfo {
    fn default() -> Self {
        ScanInfo::Ppi {
            left_az: 0,
            right_az: 0,
            elev: [0; MAX_SWEEPS],
            start: 0,
        }
    }
}

/// Scan section of the task configuration: mode and per-sweep angle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskScanInfo {
    pub scan_mode: ScanMode,
    pub resolution: i16,
    pub num_sweeps: i16,
    pub scan_info: ScanInfo,
}

impl TaskScanInfo {
    fn decode(cur: &mut Cur) -> Result<TaskScanInfo> {
        let mut c = cur.sub(TASK_SCAN_SIZE)?;
        let scan_mode = ScanMode::from_u16(c.u16()?)?;
        let resolution = c.i16()?;
        let num_sweeps = c.i16()?;
        let scan_info = match scan_mode {
            ScanMode::Rhi => {
                let lo_elev = c.u16()?;
                let hi_elev = c.u16()?;
                let mut az = [0u16; MAX_SWEEPS];
                for a in az.iter_mut() {
                    *a = c.u16()?;
                }
                ScanInfo::Rhi {
                    lo_elev,
                    hi_elev,
                    az,
                    start: c.u8()?,
                }
            }
            ScanMode::PpiSector | ScanMode::PpiContinuous => {
                let left_az = c.u16()?;
                let right_az = c.u16()?;
                let mut elev = [0u16; MAX_SWEEPS];
                for e in elev.iter_mut() {
                    *e = c.u16()?;
                }
                ScanInfo::Ppi {
                    left_az,
                    right_az,
                    elev,
                    start: c.u8()?,
                }
            }
            ScanMode::File => ScanInfo::File {
                az0: c.u16()?,
                elev0: c.u16()?,
                ant_ctrl: c.string(12)?,
            },
            ScanMode::Manual => ScanInfo::Manual { flags: c.u16()? },
        };
        Ok(TaskScanInfo {
            scan_mode,
            resolution,
            num_sweeps,
            scan_info,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.scan_mode.as_u16().to_le_bytes());
        out.extend_from_slice(&self.resolution.to_le_bytes());
        out.extend_from_slice(&self.num_sweeps.to_le_bytes());
        match &self.scan_info {
            ScanInfo::Rhi {
                lo_elev,
                hi_elev,
                az,
                start: first,
            } => {
                out.extend_from_slice(&lo_elev.to_le_bytes());
                out.extend_from_slice(&hi_elev.to_le_bytes());
                for a in az {
                    out.extend_from_slice(&a.to_le_bytes());
                }
                out.push(*first);
            }
            ScanInfo::Ppi {
                left_az,
                right_az,
                elev,
                start: first,
            } => {
                out.extend_from_slice(&left_az.to_le_bytes());
                out.extend_from_slice(&right_az.to_le_bytes());
                for e in elev {
                    out.extend_from_slice(&e.to_le_bytes());
                }
                out.push(*first);
            }
            ScanInfo::File { az0, elev0, ant_ctrl } => {
                out.extend_from_slice(&az0.to_le_bytes());
                out.extend_from_slice(&elev0.to_le_bytes());
                put_str(out, ant_ctrl, 12);
            }
            ScanInfo::Manual { flags } => {
                out.extend_from_slice(&flags.to_le_bytes());
            }
        }
        pad_to(out, start, TASK_SCAN_SIZE);
    }

    /// Configured angle for sweep `i` as a 16-bit binary angle, where the
    /// scan mode carries a per-sweep list.
    pub fn sweep_angle_bin2(&self, i: usize) -> Option<u16> {
        match &self.scan_info {
            ScanInfo::Rhi { az, .. } => az.get(i).copied(),
            ScanInfo::Ppi { elev, .. } => elev.get(i).copied(),
            _ => None,
        }
    }
}

/// Miscellaneous section of the task configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskMiscInfo {
    pub wave_len: i32,
    pub tr_serial: String,
    pub power: i32,
    pub flags: u16,
    pub polzn: u16,
    pub trunc_ht: i32,
    pub comment_sz: i16,
    pub horiz_beam_width: u32,
    pub vert_beam_width: u32,
    pub custom: [u32; 10],
}

impl TaskMiscInfo {
    fn decode(cur: &mut Cur) -> Result<TaskMiscInfo> {
        let mut c = cur.sub(TASK_MISC_SIZE)?;
        let wave_len = c.i32()?;
        let tr_serial = c.string(16)?;
        let power = c.i32()?;
        let flags = c.u16()?;
        let polzn = c.u16()?;
        let trunc_ht = c.i32()?;
        let comment_sz = c.i16()?;
        let horiz_beam_width = c.u32()?;
        let vert_beam_width = c.u32()?;
        let mut custom = [0u32; 10];
        for v in custom.iter_mut() {
            *v = c.u32()?;
        }
        Ok(TaskMiscInfo {
            wave_len,
            tr_serial,
            power,
            flags,
            polzn,
            trunc_ht,
            comment_sz,
            horiz_beam_width,
            vert_beam_width,
            custom,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.wave_len.to_le_bytes());
        put_str(out, &self.tr_serial, 16);
        out.extend_from_slice(&self.power.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.polzn.to_le_bytes());
        out.extend_from_slice(&self.trunc_ht.to_le_bytes());
        out.extend_from_slice(&self.comment_sz.to_le_bytes());
        out.extend_from_slice(&self.horiz_beam_width.to_le_bytes());
        out.extend_from_slice(&self.vert_beam_width.to_le_bytes());
        for v in &self.custom {
            out.extend_from_slice(&v.to_le_bytes());
        }
        pad_to(out, start, TASK_MISC_SIZE);
    }
}

/// End section of the task configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskEndInfo {
    pub task_major: i16,
    pub task_minor: i16,
    pub task_cfg: String,
    pub task_descr: String,
    pub hybrid_ntasks: i32,
    pub task_state: u16,
    pub data_tm: Ymds,
}

impl TaskEndInfo {
    fn decode(cur: &mut Cur) -> Result<TaskEndInfo> {
        let mut c = cur.sub(TASK_END_SIZE)?;
        Ok(TaskEndInfo {
            task_major: c.i16()?,
            task_minor: c.i16()?,
            task_cfg: c.string(12)?,
            task_descr: c.string(80)?,
            hybrid_ntasks: c.i32()?,
            task_state: c.u16()?,
            data_tm: c.ymds()?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.task_major.to_le_bytes());
        out.extend_from_slice(&self.task_minor.to_le_bytes());
        put_str(out, &self.task_cfg, 12);
        put_str(out, &self.task_descr, 80);
        out.extend_from_slice(&self.hybrid_ntasks.to_le_bytes());
        out.extend_from_slice(&self.task_state.to_le_bytes());
        self.data_tm.encode_into(out);
        pad_to(out, start, TASK_END_SIZE);
    }
}

/// Full task configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCfg {
    pub struct_hdr: StructHdr,
    pub sched: TaskSchedInfo,
    pub dsp: TaskDspInfo,
    pub calib: TaskCalibInfo,
    pub rng: TaskRngInfo,
    pub scan: TaskScanInfo,
    pub misc: TaskMiscInfo,
    pub end: TaskEndInfo,
}

impl TaskCfg {
    fn decode(cur: &mut Cur) -> Result<TaskCfg> {
        let mut c = cur.sub(TASK_CFG_SIZE)?;
        Ok(TaskCfg {
            struct_hdr: StructHdr::decode(&mut c)?,
            sched: TaskSchedInfo::decode(&mut c)?,
            dsp: TaskDspInfo::decode(&mut c)?,
            calib: TaskCalibInfo::decode(&mut c)?,
            rng: TaskRngInfo::decode(&mut c)?,
            scan: TaskScanInfo::decode(&mut c)?,
            misc: TaskMiscInfo::decode(&mut c)?,
            end: TaskEndInfo::decode(&mut c)?,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.struct_hdr.encode_into(out);
        self.sched.encode_into(out);
        self.dsp.encode_into(out);
        self.calib.encode_into(out);
        self.rng.encode_into(out);
        self.scan.encode_into(out);
        self.misc.encode_into(out);
        self.end.encode_into(out);
        pad_to(out, start, TASK_CFG_SIZE);
    }
}

/// Record #2 of a raw product file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestHdr {
    pub struct_hdr: StructHdr,
    pub ingest_cfg: IngestCfg,
    pub task_cfg: TaskCfg,
}

impl IngestHdr {
    pub fn decode(buf: &[u8]) -> Result<IngestHdr> {
        let mut c = Cur::new(buf);
        Ok(IngestHdr {
            struct_hdr: StructHdr::decode(&mut c)?,
            ingest_cfg: IngestCfg::decode(&mut c)?,
            task_cfg: TaskCfg::decode(&mut c)?,
        })
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        self.struct_hdr.encode_into(out);
        self.ingest_cfg.encode_into(out);
        self.task_cfg.encode_into(out);
        pad_to(out, start, INGEST_HDR_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_hdr_roundtrip() {
        let hdr = StructHdr {
            id: 27,
            format: 8,
            sz: 640,
            flags: 1,
        };
        let mut buf = Vec::new();
        hdr.encode_into(&mut buf);
        assert_eq!(buf.len(), STRUCT_HDR_SIZE);
        let mut c = Cur::new(&buf);
        assert_eq!(StructHdr::decode(&mut c).unwrap(), hdr);
    }

    #[test]
    fn test_prod_hdr_roundtrip() {
        let hdr = ProdHdr {
            struct_hdr: StructHdr {
                id: 27,
                format: 8,
                sz: PROD_HDR_SIZE as i32,
                flags: 0,
            },
            cfg: ProdCfg {
                ptype: 15,
                task_name: "VOL_A".to_string(),
                prod_specific_info: ProdSpecificInfo {
                    data_type_mask: 0x0c,
                    xhdr_type: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
            end: ProdEnd {
                site_name_prod: "KOUN".to_string(),
                prf: 1000,
                wave_len: 1070,
                num_bins_out: 25,
                rec_wgmt: -300,
                tz: "CST".to_string(),
                ..Default::default()
            },
        };
        let mut buf = Vec::new();
        hdr.encode_into(&mut buf);
        assert_eq!(buf.len(), PROD_HDR_SIZE);
        assert_eq!(ProdHdr::decode(&buf).unwrap(), hdr);
    }

    #[test]
    fn test_ingest_hdr_roundtrip() {
        let hdr = IngestHdr {
            struct_hdr: StructHdr {
                id: 28,
                format: 8,
                sz: INGEST_HDR_SIZE as i32,
                flags: 0,
            },
            ingest_cfg: IngestCfg {
                file_name: "vol.raw".to_string(),
                num_sweeps_done: 2,
                ray_hdr_sz: 12,
                ext_ray_hdr_sz: 4,
                num_rays: 4,
                iris_vsn: "8.12".to_string(),
                rec_wgmt: 0,
                ..Default::default()
            },
            task_cfg: TaskCfg {
                dsp: TaskDspInfo {
                    curr_data_mask: DspDataMask {
                        mask_word_0: 0x0c,
                        ..Default::default()
                    },
                    prf: 1000,
                    ..Default::default()
                },
                rng: TaskRngInfo {
                    num_bins_in: 25,
                    num_bins_out: 25,
                    ..Default::default()
                },
                scan: TaskScanInfo {
                    scan_mode: ScanMode::PpiContinuous,
                    num_sweeps: 2,
                    scan_info: ScanInfo::Ppi {
                        left_az: 0,
                        right_az: 0,
                        elev: [100; MAX_SWEEPS],
                        start: 0,
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
        };
        let mut buf = Vec::new();
        hdr.encode_into(&mut buf);
        assert_eq!(buf.len(), INGEST_HDR_SIZE);
        assert_eq!(IngestHdr::decode(&buf).unwrap(), hdr);
    }

    #[test]
    fn test_scan_modes_roundtrip() {
        for (mode, info) in [
            (
                ScanMode::Rhi,
                ScanInfo::Rhi {
                    lo_elev: 1,
                    hi_elev: 2,
                    az: [7; MAX_SWEEPS],
                    start: 1,
                },
            ),
            (
                ScanMode::Manual,
                ScanInfo::Manual { flags: 3 },
            ),
            (
                ScanMode::File,
                ScanInfo::File {
                    az0: 9,
                    elev0: 10,
                    ant_ctrl: "ctl".to_string(),
                },
            ),
        ] {
            let scan = TaskScanInfo {
                scan_mode: mode,
                resolution: 1,
                num_sweeps: 3,
                scan_info: info,
            };
            let mut buf = Vec::new();
            scan.encode_into(&mut buf);
            assert_eq!(buf.len(), TASK_SCAN_SIZE);
            let mut c = Cur::new(&buf);
            assert_eq!(TaskScanInfo::decode(&mut c).unwrap(), scan);
        }
    }

    #[test]
    fn test_scan_mode_unknown_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&9u16.to_le_bytes());
        buf.resize(TASK_SCAN_SIZE, 0);
        let mut c = Cur::new(&buf);
        assert!(matches!(
            TaskScanInfo::decode(&mut c),
            Err(SigmetError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_sweep_angle_list() {
        let mut elev = [0u16; MAX_SWEEPS];
        elev[0] = 1000;
        elev[1] = 2000;
        let scan = TaskScanInfo {
            scan_mode: ScanMode::PpiSector,
            num_sweeps: 2,
            scan_info: ScanInfo::Ppi {
                left_az: 0,
                right_az: 0,
                elev,
                start: 0,
            },
            ..Default::default()
        };
        assert_eq!(scan.sweep_angle_bin2(0), Some(1000));
        assert_eq!(scan.sweep_angle_bin2(1), Some(2000));
    }

    #[test]
    fn test_string_field_trimming() {
        let mut buf = Vec::new();
        put_str(&mut buf, "DB_DBZ", 12);
        let mut c = Cur::new(&buf);
        assert_eq!(c.string(12).unwrap(), "DB_DBZ");
    }

    #[test]
    fn test_cursor_truncation() {
        let buf = [0u8; 4];
        let mut c = Cur::new(&buf);
        assert!(c.u32().is_ok());
        assert!(matches!(c.u16(), Err(SigmetError::TruncatedStream(_))));
    }

    #[test]
    fn test_multi_prf_unfolding() {
        assert_eq!(MultiPrfMode::OneOne.unfolding_factor(), 1.0);
        assert_eq!(MultiPrfMode::TwoThree.unfolding_factor(), 2.0);
        assert_eq!(MultiPrfMode::FourFive.unfolding_factor(), 4.0);
    }
}
