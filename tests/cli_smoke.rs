use std::{io::Cursor, path::PathBuf};

#[test]
fn cli_meme_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let in_path = dir.join("scene.png");
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    let img = image::RgbaImage::from_pixel(40, 30, image::Rgba([80, 40, 120, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&in_path, &bytes).unwrap();

    let exe = std::env::var_os("CARGO_BIN_EXE_scenetrace")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "scenetrace.exe"
            } else {
                "scenetrace"
            });
            p
        });

    let in_arg = in_path.to_string_lossy().to_string();
    let out_arg = out_path.to_string_lossy().to_string();

    let status = std::process::Command::new(exe)
        .args([
            "meme",
            "--image",
            in_arg.as_str(),
            "--top",
            "hello",
            "--out",
        ])
        .arg(out_arg.as_str())
        .status()
        .unwrap();

    assert!(status.success());
    let out = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (80, 60));
}
