use std::fs::File;
use std::io::{BufReader, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use clap::Parser;
use eyre::{bail, eyre, Context, Result};
use log::info;

use sigmet_raw::cli::{Cli, Commands, DaemonCommands};
use sigmet_raw::daemon::{pid_path_for, Daemon, DaemonConfig};
use sigmet_raw::ipc::messages::{Request, SubCmd};
use sigmet_raw::ipc::{Client, ALL_SWEEPS};
use sigmet_raw::tm::{break_time, parse_sweep_arg, tz_str};
use sigmet_raw::types;
use sigmet_raw::volume::{DecoderConfig, Volume};

const DEG_PER_RAD: f64 = 57.29577951308232087648;

/// Program name for error messages; APP_NAME overrides it.
fn app_name() -> String {
    std::env::var("APP_NAME").unwrap_or_else(|_| "sigmet_raw".to_string())
}

fn setup_logging() {
    env_logger::Builder::from_default_env().init();
}

#[tokio::main]
async fn main() {
    setup_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}: {:#}", app_name(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Daemon { command } => match command {
            DaemonCommands::Start { socket, volume } => daemon_start(&socket, &volume).await,
            DaemonCommands::Stop { socket } => daemon_stop(&socket),
        },
        Commands::Data {
            binary,
            data_type,
            sweep,
            path,
        } => data_cmd(&data_type, sweep, &path, binary, false),
        Commands::Corrected {
            binary,
            data_type,
            sweep,
            path,
        } => data_cmd(&data_type, sweep, &path, binary, true),
        Commands::RayHeaders {
            sweep,
            data_type,
            path,
        } => {
            let i_swp = parse_sweep_arg(&sweep)?;
            ray_headers_cmd(i_swp, data_type.as_deref(), &path)
        }
        Commands::SweepHeaders { path } => sweep_headers_cmd(&path),
        Commands::VolumeHeaders { path } => volume_headers_cmd(&path),
        Commands::Exit { path } => {
            Client::new(path).exit()?;
            Ok(())
        }
    }
}

/// True when the path names a daemon socket, false for a regular file or
/// fifo.
fn is_socket(path: &Path) -> Result<bool> {
    let md = std::fs::metadata(path)
        .with_context(|| format!("could not get information about {}", path.display()))?;
    let ft = md.file_type();
    if ft.is_socket() {
        Ok(true)
    } else if md.is_file() || ft.is_fifo() {
        Ok(false)
    } else {
        bail!("{} must be a file, fifo, or socket", path.display());
    }
}

fn open_volume(path: &Path) -> Result<Volume> {
    let file =
        File::open(path).with_context(|| format!("could not open file {}", path.display()))?;
    let vol = Volume::read_from(BufReader::new(file), &DecoderConfig::from_env())
        .with_context(|| format!("could not read volume from {}", path.display()))?;
    Ok(vol)
}

async fn daemon_start(socket: &Path, volume_path: &Path) -> Result<()> {
    let vol = open_volume(volume_path)?;
    info!(
        "serving {} ({} sweeps, {} rays, {} types)",
        volume_path.display(),
        vol.num_sweeps(),
        vol.num_rays(),
        vol.num_types()
    );
    let mut daemon = Daemon::new(DaemonConfig::with_socket_path(socket), vol);
    daemon.run().await?;
    Ok(())
}

fn daemon_stop(socket: &Path) -> Result<()> {
    let pid_path = pid_path_for(socket);
    if Daemon::stop(&pid_path)? {
        println!("daemon stopped");
    } else {
        println!("no daemon running at {}", socket.display());
    }
    Ok(())
}

fn data_cmd(abbrv: &str, sweep: u32, path: &Path, binary: bool, corrected: bool) -> Result<()> {
    let ty = types::get_by_abbrev(abbrv)
        .ok_or_else(|| eyre!("{} is not a Sigmet data type.", abbrv))?;
    if is_socket(path)? {
        data_from_socket(abbrv, ty, sweep, path, binary, corrected)
    } else {
        data_from_file(abbrv, ty, sweep, path, binary, corrected)
    }
}

fn data_from_file(
    abbrv: &str,
    ty: &'static types::DataType,
    sweep: u32,
    path: &Path,
    binary: bool,
    corrected: bool,
) -> Result<()> {
    let vol = open_volume(path)?;
    let s = sweep as usize;
    if s >= vol.num_sweeps() {
        bail!(
            "sweep index {} out of range. Volume has {} sweeps.",
            sweep,
            vol.num_sweeps()
        );
    }
    let y = vol
        .headers
        .type_index(ty)
        .ok_or_else(|| eyre!("{} data type is not in volume at {}.", abbrv, path.display()))?;

    let mut num_bins_max = 0usize;
    for r in 0..vol.num_rays() {
        num_bins_max = num_bins_max.max(vol.ray(s, r, y)?.hdr.num_bins as usize);
    }
    if num_bins_max == 0 {
        bail!("raw product file {} has no data.", path.display());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut vals = vec![f32::NAN; num_bins_max];
    for r in 0..vol.num_rays() {
        vals.fill(f32::NAN);
        let nb = vol.ray(s, r, y)?.hdr.num_bins as usize;
        let stor = vol.ray_data(s, r, y)?;
        if let Some(stor) = stor {
            if corrected {
                ty.storage_to_corrected(nb, &mut vals, stor, &vol.headers)?;
            } else {
                ty.storage_to_value(nb, &mut vals, stor, &vol.headers)?;
            }
        }
        if binary {
            // Binary output skips empty rays; text prints them as NaN.
            if stor.is_some() {
                for v in &vals[..nb] {
                    out.write_all(&v.to_le_bytes())?;
                }
            }
        } else {
            for v in &vals {
                out.write_all(ty.format_datum(*v).as_bytes())?;
            }
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn data_from_socket(
    abbrv: &str,
    ty: &'static types::DataType,
    sweep: u32,
    path: &Path,
    binary: bool,
    corrected: bool,
) -> Result<()> {
    let client = Client::new(path);
    if binary {
        // The daemon writes the float stream straight to standard output.
        let sub_cmd = if corrected { SubCmd::Corrected } else { SubCmd::Data };
        let req = Request::new(sub_cmd).with_data_type(abbrv).with_sweep(sweep);
        client.request_to_fd(&req, std::io::stdout().as_raw_fd())?;
        return Ok(());
    }
    // Ray headers provide per-ray bin counts for the text layout.
    let (rh_resp, ray_hdrs) = client.ray_headers(abbrv, sweep)?;
    let (_, vals) = client.data(abbrv, sweep, corrected)?;
    let num_rays = rh_resp.num_rays as usize;
    let num_bins_max = ray_hdrs.iter().map(|h| h.num_bins.max(0) as usize).max().unwrap_or(0);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut it = vals.iter();
    for h in ray_hdrs.iter().take(num_rays) {
        let nb = h.num_bins.max(0) as usize;
        for _ in 0..nb {
            let v = it.next().copied().unwrap_or(f32::NAN);
            out.write_all(ty.format_datum(v).as_bytes())?;
        }
        for _ in nb..num_bins_max {
            out.write_all(ty.format_datum(f32::NAN).as_bytes())?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn print_ray_row(
    out: &mut impl Write,
    s: usize,
    r: usize,
    time: f64,
    az0: f32,
    az1: f32,
    tilt0: f32,
    tilt1: f32,
    num_bins: i32,
) -> Result<()> {
    let (yr, mon, day, hr, min, sec) = break_time(time).unwrap_or((0, 0, 0, 0, 0, 0.0));
    writeln!(
        out,
        "{:2} {:4}    time    {:04}/{:02}/{:02} {:02}:{:02}:{:06.3}    az    {:7.1} {:7.1}    tilt {:6.1} {:6.1}    num_bins    {:4} ",
        s,
        r,
        yr,
        mon,
        day,
        hr,
        min,
        sec,
        az0 as f64 * DEG_PER_RAD,
        az1 as f64 * DEG_PER_RAD,
        tilt0 as f64 * DEG_PER_RAD,
        tilt1 as f64 * DEG_PER_RAD,
        num_bins
    )?;
    Ok(())
}

fn ray_headers_cmd(i_swp: u32, abbrv: Option<&str>, path: &Path) -> Result<()> {
    if let Some(name) = abbrv {
        if types::get_by_abbrev(name).is_none() {
            bail!("{} is not a Sigmet data type.", name);
        }
    }
    if is_socket(path)? {
        ray_headers_from_socket(i_swp, abbrv, path)
    } else {
        ray_headers_from_file(i_swp, abbrv, path)
    }
}

fn ray_headers_from_file(i_swp: u32, abbrv: Option<&str>, path: &Path) -> Result<()> {
    let vol = open_volume(path)?;
    let num_swps = vol.num_sweeps();
    if i_swp != ALL_SWEEPS && i_swp as usize >= num_swps {
        bail!(
            "sweep index {} out of range. Volume {} has {} sweeps.",
            i_swp,
            path.display(),
            num_swps
        );
    }
    let y = match abbrv {
        Some(name) => {
            let ty = types::get_by_abbrev(name)
                .ok_or_else(|| eyre!("{} is not a Sigmet data type.", name))?;
            vol.headers
                .type_index(ty)
                .ok_or_else(|| eyre!("{} data type is not in volume at {}.", name, path.display()))?
        }
        None => vol
            .headers
            .default_type_index()
            .ok_or_else(|| eyre!("volume has no usable data type"))?,
    };
    // Format times in the volume's zone, not local time.
    std::env::set_var("TZ", tz_str(&vol.headers.tz_field()));
    let (s0, s1) = if i_swp == ALL_SWEEPS {
        (0, num_swps)
    } else {
        (i_swp as usize, i_swp as usize + 1)
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for s in s0..s1 {
        for r in 0..vol.num_rays() {
            let h = vol.ray(s, r, y)?.hdr;
            let time = vol.ray_time(s, r)?;
            print_ray_row(&mut out, s, r, time, h.az0, h.az1, h.tilt0, h.tilt1, h.num_bins)?;
        }
    }
    Ok(())
}

fn ray_headers_from_socket(i_swp: u32, abbrv: Option<&str>, path: &Path) -> Result<()> {
    let client = Client::new(path);
    let (resp, ray_hdrs) = client.ray_headers(abbrv.unwrap_or(""), i_swp)?;
    if resp.num_sweeps == 0 {
        bail!("got impossible sweep count (0) from daemon at socket {}", path.display());
    }
    if resp.num_rays == 0 {
        bail!("got impossible ray count (0) from daemon at socket {}", path.display());
    }
    std::env::set_var("TZ", tz_str(&resp.tz));
    let num_rays = resp.num_rays as usize;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (n, h) in ray_hdrs.iter().enumerate() {
        let s = n / num_rays;
        let r = n % num_rays;
        print_ray_row(&mut out, s, r, h.time, h.az0, h.az1, h.tilt0, h.tilt1, h.num_bins)?;
    }
    Ok(())
}

fn sweep_headers_cmd(path: &Path) -> Result<()> {
    let hdrs = if is_socket(path)? {
        let (_, hdrs) = Client::new(path).sweep_headers()?;
        hdrs
    } else {
        let vol = open_volume(path)?;
        vol.sweep_hdrs.clone()
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (s, h) in hdrs.iter().enumerate() {
        let (yr, mon, day, hr, min, sec) =
            break_time(h.tm.to_seconds()).unwrap_or((0, 0, 0, 0, 0, 0.0));
        writeln!(
            out,
            "{:2}    time    {:04}/{:02}/{:02} {:02}:{:02}:{:06.3}    angle {:7.1} ",
            s,
            yr,
            mon,
            day,
            hr,
            min,
            sec,
            h.angle * DEG_PER_RAD
        )?;
    }
    Ok(())
}

fn volume_headers_cmd(path: &Path) -> Result<()> {
    let hdr = if is_socket(path)? {
        let (_, hdr) = Client::new(path).volume_headers()?;
        hdr
    } else {
        open_volume(path)?.headers
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "site            {}", hdr.prod_hdr.end.site_name_prod)?;
    writeln!(out, "task            {}", hdr.prod_hdr.cfg.task_name)?;
    writeln!(out, "iris_version    {}", hdr.ingest_hdr.ingest_cfg.iris_vsn)?;
    writeln!(out, "num_sweeps      {}", hdr.num_sweeps())?;
    writeln!(out, "num_rays        {}", hdr.num_rays())?;
    writeln!(out, "num_bins        {}", hdr.num_bins_out())?;
    writeln!(out, "prf             {}", hdr.prod_hdr.end.prf)?;
    writeln!(out, "wavelength_cm   {:.2}", hdr.prod_hdr.end.wave_len as f64 / 100.0)?;
    writeln!(out, "time_zone       {}", tz_str(&hdr.tz_field()))?;
    let names: Vec<&str> = hdr.types.iter().map(|t| t.abbrv()).collect();
    writeln!(out, "data_types      {}", names.join(" "))?;
    Ok(())
}
