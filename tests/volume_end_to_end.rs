//! End-to-end tests: decode a synthetic raw product stream and serve it
//! through a live daemon to blocking clients over a temp socket.

use std::io::Write;
use std::time::Duration;

use tempfile::tempdir;

use sigmet_raw::daemon::{Daemon, DaemonConfig};
use sigmet_raw::ipc::messages::WIDE_RAY_HDR_WIRE_SIZE;
use sigmet_raw::ipc::{Client, ALL_SWEEPS};
use sigmet_raw::testgen;
use sigmet_raw::volume::{DecoderConfig, Volume};
use sigmet_raw::SigmetError;

#[test]
fn decode_volume_from_file() {
    // 2 sweeps x 4 rays x 1 type x 3 bins: the ray grid and the sample
    // buffer come out exactly sized.
    let dir = tempdir().unwrap();
    let path = dir.path().join("vol.raw");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(&testgen::two_sweep_dbz_volume()).unwrap();
    drop(f);

    let f = std::fs::File::open(&path).unwrap();
    let vol = Volume::read_from(std::io::BufReader::new(f), &DecoderConfig::default()).unwrap();
    assert_eq!(vol.num_sweeps(), 2);
    assert_eq!(vol.num_rays(), 4);
    assert_eq!(vol.num_types(), 1);
    assert_eq!(vol.sample_buffer_len(), 24);
    for s in 0..2 {
        for r in 0..4 {
            assert_eq!(vol.ray(s, r, 0).unwrap().hdr.num_bins, 3);
        }
    }
}

#[test]
fn decode_truncated_file_fails_cleanly() {
    let bytes = testgen::two_sweep_dbz_volume();
    let err = Volume::read_from(&bytes[..10000], &DecoderConfig::default()).unwrap_err();
    assert!(matches!(err, SigmetError::TruncatedStream(_)), "{:?}", err);
}

async fn wait_for_socket(path: &std::path::Path) {
    for _ in 0..200 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon socket never appeared at {}", path.display());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn daemon_serves_clients() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("vol.sock");
    let bytes = testgen::two_sweep_dbz_volume();
    let vol = Volume::read_from(&bytes[..], &DecoderConfig::default()).unwrap();
    let expect_hdr = vol.headers.clone();
    let sweep_tm = vol.sweep_hdrs[0].tm.to_seconds();

    let mut daemon = Daemon::new(DaemonConfig::with_socket_path(&socket), vol);
    let daemon_task = tokio::spawn(async move { daemon.run().await });
    wait_for_socket(&socket).await;

    let socket_for_client = socket.clone();
    let client_task = tokio::task::spawn_blocking(move || {
        let client = Client::new(&socket_for_client);

        // Volume headers come back byte-identical to the daemon's value.
        let (resp, hdr) = client.volume_headers().unwrap();
        assert!(resp.is_okay());
        assert_eq!(resp.num_sweeps, 2);
        assert_eq!(resp.num_rays, 4);
        assert_eq!(hdr, expect_hdr);

        // Sweep headers: one record per sweep slot.
        let (resp, sweep_hdrs) = client.sweep_headers().unwrap();
        assert_eq!(resp.num_sweeps, 2);
        assert_eq!(sweep_hdrs.len(), 2);
        assert!((sweep_hdrs[0].tm.to_seconds() - sweep_tm).abs() < 1e-9);

        // Ray headers for all sweeps: num_sweeps x num_rays records.
        let (resp, ray_hdrs) = client.ray_headers("", ALL_SWEEPS).unwrap();
        assert_eq!(resp.num_sweeps, 2);
        assert_eq!(resp.num_rays, 4);
        assert_eq!(ray_hdrs.len(), 2 * 4);
        assert_eq!(
            ray_hdrs.len() * WIDE_RAY_HDR_WIRE_SIZE,
            2 * 4 * WIDE_RAY_HDR_WIRE_SIZE
        );
        // Ray times are sweep time plus the per-ray offset.
        assert!((ray_hdrs[1].time - (sweep_tm + 1.0)).abs() < 1e-6);

        // One sweep's ray headers report num_sweeps = 1.
        let (resp, ray_hdrs) = client.ray_headers("DB_DBZ", 1).unwrap();
        assert_eq!(resp.num_sweeps, 1);
        assert_eq!(ray_hdrs.len(), 4);

        // Sweep data: 4 rays x 3 bins of converted DBZ values.
        let (resp, vals) = client.data("DB_DBZ", 0, false).unwrap();
        assert_eq!(resp.num_bins_in_sweep, 12);
        assert_eq!(vals.len(), 12);
        // Storage 10/20/30 in ray 0: dBZ = (N - 64) / 2.
        assert_eq!(vals[0], -27.0);
        assert_eq!(vals[1], -22.0);
        assert_eq!(vals[2], -17.0);

        // Unknown abbreviation: error status plus a message on the error
        // channel, surfaced verbatim.
        let err = client.data("DB_FOO", 0, false).unwrap_err();
        match err {
            SigmetError::Daemon(msg) => {
                assert_eq!(msg, "DB_FOO is not a Sigmet data type.");
            }
            other => panic!("expected daemon error, got {:?}", other),
        }

        // Out-of-range sweep index.
        let err = client.data("DB_DBZ", 7, false).unwrap_err();
        assert!(matches!(err, SigmetError::Daemon(_)));

        // Corrected output matches plain output for an uncorrected type.
        let (_, corr) = client.data("DB_DBZ", 0, true).unwrap();
        assert_eq!(corr, vals);

        client.exit().unwrap();
    });

    client_task.await.unwrap();
    daemon_task.await.unwrap().unwrap();
    assert!(!socket.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn daemon_serves_extended_header_times() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("xhdr.sock");
    let bytes = testgen::xhdr_volume();
    let vol = Volume::read_from(&bytes[..], &DecoderConfig::default()).unwrap();
    let sweep_tm = vol.sweep_hdrs[0].tm.to_seconds();

    let mut daemon = Daemon::new(DaemonConfig::with_socket_path(&socket), vol);
    let daemon_task = tokio::spawn(async move { daemon.run().await });
    wait_for_socket(&socket).await;

    let socket_for_client = socket.clone();
    let client_task = tokio::task::spawn_blocking(move || {
        let client = Client::new(&socket_for_client);
        // Ray times come from the extended header milliseconds, not the
        // whole-second ray header offset.
        let (_, ray_hdrs) = client.ray_headers("", ALL_SWEEPS).unwrap();
        assert_eq!(ray_hdrs.len(), 2);
        assert!((ray_hdrs[0].time - (sweep_tm + 1.5)).abs() < 1e-6);
        assert!((ray_hdrs[1].time - (sweep_tm + 1.501)).abs() < 1e-6);
        client.exit().unwrap();
    });

    client_task.await.unwrap();
    daemon_task.await.unwrap().unwrap();
}
