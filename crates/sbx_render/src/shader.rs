//! WGSL loading and validation.
//!
//! wgpu reports shader errors through the device's error handler, which
//! panics by default. Shaders are therefore parsed and validated with naga
//! before they ever reach the device, so a broken edit becomes an `Err` the
//! caller can recover from.

use std::fs;
use std::path::Path;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Compiled into the binary; used when the on-disk shader is unusable.
pub const BUILTIN_MESH_SHADER: &str = include_str!("shaders/mesh.wgsl");

pub fn validate_wgsl(label: &str, source: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("Shader '{label}' parse failed:\n{}", e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| format!("Shader '{label}' validation failed:\n{}", e.emit_to_string(source)))?;

    for (name, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage);
        if !found {
            return Err(format!(
                "Shader '{label}' is missing {stage:?} entry point '{name}'"
            ));
        }
    }
    Ok(())
}

pub fn load_shader_source(path: &Path) -> Result<String, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read shader {}: {e}", path.display()))?;
    validate_wgsl(&path.display().to_string(), &source)?;
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
        @vertex fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(p, 1.0);
        }
        @fragment fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0);
        }
    ";

    #[test]
    fn builtin_shader_validates() {
        validate_wgsl("builtin", BUILTIN_MESH_SHADER).expect("builtin shader must validate");
    }

    #[test]
    fn minimal_shader_validates() {
        validate_wgsl("minimal", MINIMAL).expect("valid");
    }

    #[test]
    fn syntax_error_is_reported_with_label() {
        let broken = MINIMAL.replace("return vec4<f32>(1.0);", "return vec4<f32>(1.0)");
        let err = validate_wgsl("broken.wgsl", &broken).unwrap_err();
        assert!(err.contains("broken.wgsl"), "{err}");
        assert!(err.contains("parse failed"), "{err}");
    }

    #[test]
    fn type_error_fails_validation() {
        let broken = MINIMAL.replace("return vec4<f32>(1.0);", "return 1.0;");
        assert!(validate_wgsl("typed", &broken).is_err());
    }

    #[test]
    fn missing_fragment_entry_is_rejected() {
        let renamed = MINIMAL.replace("fn fs_main", "fn frag");
        let err = validate_wgsl("renamed", &renamed).unwrap_err();
        assert!(err.contains("fs_main"), "{err}");
    }

    #[test]
    fn load_reads_and_validates() {
        let path = std::env::temp_dir().join(format!(
            "sbx_test_shader_{}_{}.wgsl",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("system time before unix epoch")
                .as_nanos()
        ));
        fs::write(&path, MINIMAL).expect("write");
        assert_eq!(load_shader_source(&path).expect("load"), MINIMAL);

        fs::write(&path, "not wgsl").expect("rewrite");
        assert!(load_shader_source(&path).is_err());
        let _ = fs::remove_file(path);

        let err = load_shader_source(Path::new("/missing/shader.wgsl")).unwrap_err();
        assert!(err.starts_with("Failed to read shader"), "{err}");
    }
}
