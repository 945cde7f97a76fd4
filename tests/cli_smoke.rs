use std::path::PathBuf;
use std::process::Command;

fn bin_path() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_kinreel")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push("kinreel");
            p
        })
}

#[test]
fn cli_frames_writes_pngs_and_logs_progress() {
    let root = PathBuf::from("target").join("cli_smoke").join("frames");
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("Relations.md"),
        "graph TD\nA[甲] -- 认识 --> B[乙]\nC[丙] --> D[丁]\n",
    )
    .unwrap();

    let output = Command::new(bin_path())
        .args(["frames", "--root"])
        .arg(&root)
        .output()
        .expect("spawn kinreel binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let console = format!("{stdout}{stderr}");

    if !output.status.success() {
        // Machines without any discoverable font cannot rasterize frames.
        assert!(console.contains("font"), "unexpected failure: {console}");
        eprintln!("skipping: no usable font on this machine");
        return;
    }

    assert!(root.join("frames").join("frame_0000.png").exists());
    assert!(root.join("frames").join("frame_0001.png").exists());

    // The binary installs a fmt subscriber, so library progress events must
    // reach the console, not vanish.
    assert!(
        console.contains("parsed relationship edges"),
        "tracing output missing from console: {console}"
    );
    assert!(console.contains("wrote 2 frames"));
}
