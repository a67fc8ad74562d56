use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::device::{GraphicsDevice, ProgramHandle, ShaderStage, UniformLocation};
use crate::error::ShaderError;

/// Registry record for one linked program.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub handle: ProgramHandle,
    /// SHA-256 hex of both stage sources. Diagnostics only.
    pub digest: String,
}

/// Owns every shader program created through the engine.
///
/// A handle present in the registry always denotes a successfully linked
/// program; it is removed exactly once, by [`destroy`](Self::destroy) or
/// by the bulk teardown in [`destroy_all`](Self::destroy_all).
#[derive(Default)]
pub struct ShaderRegistry {
    programs: HashMap<ProgramHandle, ProgramInfo>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and links a vertex/fragment source pair.
    ///
    /// The vertex stage is compiled first; if it is rejected, the fragment
    /// stage is never attempted. Intermediate stage objects are released
    /// on every exit path: immediately on the failing path, and right
    /// after the link attempt otherwise (only the linked program is
    /// retained, as the underlying API allows).
    pub fn create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramHandle, ShaderError> {
        let vertex = device
            .compile_shader(ShaderStage::Vertex, vertex_src)
            .map_err(|log| ShaderError::Compile {
                stage: ShaderStage::Vertex,
                log,
                rejected_source: vertex_src.to_owned(),
            })?;

        let fragment = match device.compile_shader(ShaderStage::Fragment, fragment_src) {
            Ok(handle) => handle,
            Err(log) => {
                device.delete_shader(vertex);
                return Err(ShaderError::Compile {
                    stage: ShaderStage::Fragment,
                    log,
                    rejected_source: fragment_src.to_owned(),
                });
            }
        };

        let linked = device.link_program(vertex, fragment);
        device.delete_shader(vertex);
        device.delete_shader(fragment);

        let handle = linked.map_err(|log| ShaderError::Link { log })?;
        self.programs.insert(
            handle,
            ProgramInfo {
                handle,
                digest: source_digest(vertex_src, fragment_src),
            },
        );
        Ok(handle)
    }

    /// Releases the program object and removes it from the registry.
    /// No-op if the handle is absent, so cleanup paths may run twice.
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice, handle: ProgramHandle) {
        if self.programs.remove(&handle).is_some() {
            device.delete_program(handle);
        }
    }

    /// Releases every tracked program and clears the registry.
    ///
    /// The engine invokes this once at teardown, while the graphics
    /// context is still live.
    pub fn destroy_all(&mut self, device: &mut dyn GraphicsDevice) {
        let count = self.programs.len();
        for (handle, _) in self.programs.drain() {
            device.delete_program(handle);
        }
        if count > 0 {
            log::debug!("released {count} shader program(s)");
        }
    }

    /// Installs a tracked program as the device's bound program.
    /// Untracked handles are ignored.
    pub fn bind(&self, device: &mut dyn GraphicsDevice, handle: ProgramHandle) {
        if self.programs.contains_key(&handle) {
            device.bind_program(Some(handle));
        }
    }

    pub fn get(&self, handle: ProgramHandle) -> Option<&ProgramInfo> {
        self.programs.get(&handle)
    }

    pub fn contains(&self, handle: ProgramHandle) -> bool {
        self.programs.contains_key(&handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = ProgramHandle> + '_ {
        self.programs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    // Uniform set operations resolve a name against the currently bound
    // program. Names the program does not know resolve to a no-op
    // location; the set silently does nothing.

    pub fn set_int(&self, device: &mut dyn GraphicsDevice, name: &str, v0: i32) {
        self.set_i32(device, name, &[v0]);
    }

    pub fn set_int2(&self, device: &mut dyn GraphicsDevice, name: &str, v0: i32, v1: i32) {
        self.set_i32(device, name, &[v0, v1]);
    }

    pub fn set_int3(&self, device: &mut dyn GraphicsDevice, name: &str, v0: i32, v1: i32, v2: i32) {
        self.set_i32(device, name, &[v0, v1, v2]);
    }

    pub fn set_int4(
        &self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        v0: i32,
        v1: i32,
        v2: i32,
        v3: i32,
    ) {
        self.set_i32(device, name, &[v0, v1, v2, v3]);
    }

    pub fn set_float(&self, device: &mut dyn GraphicsDevice, name: &str, v0: f32) {
        self.set_f32(device, name, &[v0]);
    }

    pub fn set_float2(&self, device: &mut dyn GraphicsDevice, name: &str, v0: f32, v1: f32) {
        self.set_f32(device, name, &[v0, v1]);
    }

    pub fn set_float3(
        &self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        v0: f32,
        v1: f32,
        v2: f32,
    ) {
        self.set_f32(device, name, &[v0, v1, v2]);
    }

    pub fn set_float4(
        &self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        v0: f32,
        v1: f32,
        v2: f32,
        v3: f32,
    ) {
        self.set_f32(device, name, &[v0, v1, v2, v3]);
    }

    fn set_i32(&self, device: &mut dyn GraphicsDevice, name: &str, values: &[i32]) {
        let location = device.uniform_location(name);
        device.set_uniform_i32(location, values);
    }

    fn set_f32(&self, device: &mut dyn GraphicsDevice, name: &str, values: &[f32]) {
        let location = device.uniform_location(name);
        device.set_uniform_f32(location, values);
    }
}

fn source_digest(vertex_src: &str, fragment_src: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(vertex_src.as_bytes());
    hasher.update(fragment_src.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::RecordingDevice;

    const VS: &str = "@vertex fn vs_main() {}";
    const FS: &str = "@fragment fn fs_main() {}";

    #[test]
    fn create_registers_linked_program() {
        let mut device = RecordingDevice::default();
        let mut registry = ShaderRegistry::new();

        let handle = registry.create(&mut device, VS, FS).unwrap();

        assert!(registry.contains(handle));
        assert_eq!(registry.handles().collect::<Vec<_>>(), vec![handle]);
        assert_eq!(registry.len(), 1);
        assert!(!registry.get(handle).unwrap().digest.is_empty());
        // Both intermediate stage objects are released on success.
        assert_eq!(device.deleted_stages.len(), 2);
        assert!(device.deleted_programs.is_empty());
    }

    #[test]
    fn digest_tracks_sources() {
        let mut device = RecordingDevice::default();
        let mut registry = ShaderRegistry::new();

        let a = registry.create(&mut device, VS, FS).unwrap();
        let b = registry.create(&mut device, VS, "@fragment fn other() {}").unwrap();

        assert_eq!(registry.get(a).unwrap().digest, source_digest(VS, FS));
        assert_ne!(
            registry.get(a).unwrap().digest,
            registry.get(b).unwrap().digest
        );
    }

    #[test]
    fn vertex_failure_skips_fragment_stage() {
        let mut device = RecordingDevice {
            fail_compile: Some(ShaderStage::Vertex),
            ..Default::default()
        };
        let mut registry = ShaderRegistry::new();

        let err = registry.create(&mut device, "bad", FS).unwrap_err();

        assert_eq!(err.stage(), Some(ShaderStage::Vertex));
        assert_eq!(device.compile_calls, vec![ShaderStage::Vertex]);
        assert!(device.deleted_stages.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn fragment_failure_releases_vertex_stage() {
        let mut device = RecordingDevice {
            fail_compile: Some(ShaderStage::Fragment),
            ..Default::default()
        };
        let mut registry = ShaderRegistry::new();

        let err = registry.create(&mut device, VS, "bad").unwrap_err();

        assert_eq!(err.stage(), Some(ShaderStage::Fragment));
        match err {
            ShaderError::Compile { log, rejected_source, .. } => {
                assert!(log.contains("fragment"));
                assert_eq!(rejected_source, "bad");
            }
            ShaderError::Link { .. } => panic!("expected a compile error"),
        }
        assert_eq!(
            device.compile_calls,
            vec![ShaderStage::Vertex, ShaderStage::Fragment]
        );
        // The already-compiled vertex stage must not leak.
        assert_eq!(device.deleted_stages.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn link_failure_releases_both_stages() {
        let mut device = RecordingDevice {
            fail_link: true,
            ..Default::default()
        };
        let mut registry = ShaderRegistry::new();

        let err = registry.create(&mut device, VS, FS).unwrap_err();

        assert!(matches!(err, ShaderError::Link { .. }));
        assert_eq!(device.deleted_stages.len(), 2);
        assert!(device.deleted_programs.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn destroy_removes_exactly_once() {
        let mut device = RecordingDevice::default();
        let mut registry = ShaderRegistry::new();
        let handle = registry.create(&mut device, VS, FS).unwrap();

        registry.destroy(&mut device, handle);
        assert!(!registry.contains(handle));
        assert_eq!(device.deleted_programs, vec![handle]);

        // Second destroy is an accepted no-op, not an error.
        registry.destroy(&mut device, handle);
        assert_eq!(device.deleted_programs, vec![handle]);
    }

    #[test]
    fn destroy_all_drains_every_program() {
        let mut device = RecordingDevice::default();
        let mut registry = ShaderRegistry::new();
        let a = registry.create(&mut device, VS, FS).unwrap();
        let b = registry.create(&mut device, VS, FS).unwrap();

        registry.destroy_all(&mut device);

        assert!(registry.is_empty());
        assert_eq!(device.deleted_programs.len(), 2);
        assert!(device.deleted_programs.contains(&a));
        assert!(device.deleted_programs.contains(&b));

        // Teardown with nothing registered is also fine.
        registry.destroy_all(&mut device);
        assert_eq!(device.deleted_programs.len(), 2);
    }

    #[test]
    fn bind_ignores_untracked_handles() {
        let mut device = RecordingDevice::default();
        let mut registry = ShaderRegistry::new();
        let handle = registry.create(&mut device, VS, FS).unwrap();

        registry.destroy(&mut device, handle);
        registry.bind(&mut device, handle);
        assert!(device.bind_calls.is_empty());

        let handle = registry.create(&mut device, VS, FS).unwrap();
        registry.bind(&mut device, handle);
        assert_eq!(device.bind_calls, vec![Some(handle)]);
    }

    #[test]
    fn unknown_uniform_names_are_silent_noops() {
        let mut device = RecordingDevice::default();
        device.uniforms.insert("tint".to_owned(), 0);
        let mut registry = ShaderRegistry::new();
        let handle = registry.create(&mut device, VS, FS).unwrap();
        registry.bind(&mut device, handle);

        registry.set_float4(&mut device, "typo", 1.0, 0.5, 0.2, 1.0);
        assert!(device.writes.is_empty());

        registry.set_float4(&mut device, "tint", 1.0, 0.5, 0.2, 1.0);
        assert_eq!(device.writes, vec![(0, 16)]);

        registry.set_int(&mut device, "tint", 3);
        assert_eq!(device.writes.len(), 2);
    }
}
