// Build script for Vulkan shader compilation

use std::path::{Path, PathBuf};
use std::process::Command;

/// Compile every GLSL stage file in the shader directory to SPIR-V.
///
/// Missing glslc is reported but not fatal; the repository may already ship
/// compiled .spv files.
fn compile_shaders(shader_dir: &Path, glslc: &str) {
    let entries = match std::fs::read_dir(shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            println!(
                "cargo:warning=no shader directory at {}, skipping shader compilation",
                shader_dir.display()
            );
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ext != "vert" && ext != "frag" {
            continue;
        }

        let out_file = shader_dir.join(format!("{ext}.spv"));

        println!("cargo:rerun-if-changed={}", path.display());
        let status = Command::new(glslc).arg(&path).arg("-o").arg(&out_file).status();

        match status {
            Ok(status) if status.success() => {
                println!(
                    "cargo:warning=compiled {} -> {}",
                    path.display(),
                    out_file.display()
                );
            }
            Ok(status) => {
                println!(
                    "cargo:warning=glslc failed on {} with {status}",
                    path.display()
                );
            }
            Err(_) => {
                println!(
                    "cargo:warning=glslc not found, skipping {}; install the Vulkan SDK to rebuild shaders",
                    path.display()
                );
                return;
            }
        }
    }
}

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let shader_dir = manifest_dir.parent().unwrap().join("shaders");
    println!("cargo:rerun-if-changed={}", shader_dir.display());

    compile_shaders(&shader_dir, "glslc");
}
