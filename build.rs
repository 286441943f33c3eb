use std::env;
use std::path::PathBuf;

/// Point Windows builds of the `ffmpeg` feature at a vcpkg FFmpeg install.
fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");
    println!("cargo:rerun-if-env-changed=VCPKGRS_TRIPLET");

    // Nothing links against FFmpeg without the feature.
    if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=scenecut: the `ffmpeg` feature needs FFmpeg development libraries. Set FFMPEG_DIR, or VCPKG_ROOT for a vcpkg install."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if ffmpeg_dir.exists() {
        println!(
            "cargo:warning=scenecut: found vcpkg FFmpeg at {}; set FFMPEG_DIR to it to make discovery explicit.",
            ffmpeg_dir.display(),
        );
    } else {
        println!(
            "cargo:warning=scenecut: VCPKG_ROOT is set but {} does not exist.",
            ffmpeg_dir.display(),
        );
    }
}
