use winit::dpi::PhysicalSize;

/// Per-frame render target handed to the active scene during update.
///
/// The frame loop has already recorded the clear pass when a scene sees
/// this; scene passes should load the existing contents.
pub struct RenderFrame<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    /// Drawable size in physical pixels.
    pub size: PhysicalSize<u32>,
}
