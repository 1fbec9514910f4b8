//! Host component
//!
//! Owns the props and wires the layout oracle, the wheel builder and the spin
//! engine together. Platform code feeds it viewport changes and frame
//! timestamps; everything else happens here.

use std::future::Future;
use std::rc::Rc;

use crate::consts::MOUNT_SELECTOR;
use crate::error::{WheelError, WheelResult};
use crate::layout::{Debouncer, LayoutMode, Viewport, WheelGeometry, WheelStyle};
use crate::scene::{BuildRequest, ImageRequest, RenderKind, WheelBuilder};
use crate::settings::WheelProps;
use crate::slice::{Slice, SliceId, SliceSet};
use crate::spin::{Animator, SpinConfig, SpinEngine};

/// What changed during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// Scene structure changed; the mount must re-sync its markup
    pub scene_changed: bool,
    /// Container size or font changed; the mount must re-apply the style
    pub style_changed: bool,
    /// A rotation is still running
    pub animating: bool,
    /// Center image the mount should start loading
    pub image_request: Option<ImageRequest>,
}

#[derive(Debug)]
pub struct FortuneWheel {
    props: WheelProps,
    viewport: Viewport,
    geometry: WheelGeometry,
    mode: LayoutMode,
    builder: WheelBuilder,
    engine: Rc<SpinEngine>,
    animator: Animator,
    resize: Debouncer<Viewport>,
    mounted: bool,
    scene_dirty: bool,
    style_dirty: bool,
    error: Option<String>,
}

fn spin_config(props: &WheelProps) -> SpinConfig {
    SpinConfig {
        duration_ms: props.anim_duration,
        overshoot: props.overshoot,
    }
}

/// Everything the builder needs, borrowed from the props
fn build_request(props: &WheelProps, geometry: WheelGeometry, mode: LayoutMode) -> BuildRequest<'_> {
    BuildRequest {
        slices: &props.data,
        geometry,
        font_size: mode.label_font_size(props.data.len()),
        font_family: props.font_family(),
        middle_circle: props.middle_circle,
        center_image: props.center_image(),
    }
}

impl FortuneWheel {
    /// Host mounted on the default `#wheel` container
    pub fn new(props: WheelProps, viewport: Viewport) -> Self {
        Self::with_mount_id(MOUNT_SELECTOR.trim_start_matches('#'), props, viewport)
    }

    pub fn with_mount_id(mount_id: &str, props: WheelProps, viewport: Viewport) -> Self {
        let geometry = WheelGeometry::from_viewport(viewport.width, &props.layout);
        let mode = LayoutMode::for_viewport(viewport.width, &props.layout);
        Self {
            engine: Rc::new(SpinEngine::new(spin_config(&props))),
            animator: Animator::new(),
            resize: Debouncer::new(props.layout.settle_ms),
            builder: WheelBuilder::new(mount_id),
            viewport,
            geometry,
            mode,
            props,
            mounted: false,
            scene_dirty: false,
            style_dirty: true,
            error: None,
        }
    }

    pub fn props(&self) -> &WheelProps {
        &self.props
    }

    pub fn data(&self) -> &SliceSet {
        &self.props.data
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn geometry(&self) -> WheelGeometry {
        self.geometry
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Current label font size (px)
    pub fn font_size(&self) -> f64 {
        self.mode.label_font_size(self.props.data.len())
    }

    pub fn style(&self) -> WheelStyle {
        WheelStyle::new(&self.geometry, self.props.data.len())
    }

    pub fn builder(&self) -> &WheelBuilder {
        &self.builder
    }

    pub fn engine(&self) -> &SpinEngine {
        &self.engine
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_built(&self) -> bool {
        self.builder.is_built()
    }

    pub fn is_spinning(&self) -> bool {
        self.engine.is_spinning()
    }

    /// Last error from the host, the builder or the engine
    pub fn error(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.builder.error().map(str::to_string))
            .or_else(|| self.engine.error())
    }

    /// Current wheel orientation (degrees), if built
    pub fn rotation_angle(&self) -> Option<f64> {
        self.builder
            .rotation_group()
            .and_then(|g| g.upgrade())
            .map(|g| g.angle())
    }

    /// SVG transform of the rotation group, if built
    pub fn rotation_transform(&self) -> Option<String> {
        self.builder
            .rotation_group()
            .and_then(|g| g.upgrade())
            .map(|g| g.transform())
    }

    /// Build the wheel for the first time
    pub fn mount(&mut self) -> WheelResult<()> {
        self.mounted = true;
        self.style_dirty = true;
        log::info!(
            "Mounting wheel: {} slices, {}x{} ({:?})",
            self.props.data.len(),
            self.geometry.width,
            self.geometry.height,
            self.mode
        );

        if let Err(e) = self.props.check() {
            self.record_error(&e);
            return Err(e);
        }
        if self.props.data.is_empty() {
            self.record_error(&WheelError::EmptyData);
            return Err(WheelError::EmptyData);
        }
        self.schedule(RenderKind::Full);
        self.flush()
    }

    /// Tear the scene down and stop listening to time
    pub fn unmount(&mut self) {
        log::info!("Unmounting wheel");
        self.mounted = false;
        self.resize.cancel();
        self.animator.clear();
        self.builder.teardown();
        self.scene_dirty = true;
    }

    /// Replace the slice data; the wheel is redrawn on the next frame
    pub fn set_data(&mut self, data: SliceSet) {
        self.props.data = data;
        self.style_dirty = true;
        self.data_changed();
    }

    /// Change the slice the next spin lands on
    pub fn set_model_value(&mut self, model_value: SliceId) {
        self.props.model_value = model_value;
    }

    /// Replace every prop at once
    pub fn set_props(&mut self, props: WheelProps) {
        let redraw = props.data != self.props.data
            || props.middle_circle != self.props.middle_circle
            || props.img_params != self.props.img_params
            || props.font_family != self.props.font_family
            || props.layout != self.props.layout;

        self.engine.set_config(spin_config(&props));
        self.resize.set_settle_ms(props.layout.settle_ms);
        self.props = props;

        if redraw {
            self.style_dirty = true;
            self.relayout(self.viewport);
            self.data_changed();
        }
    }

    fn data_changed(&mut self) {
        if !self.mounted {
            return;
        }
        if self.props.data.is_empty() {
            log::warn!("Wheel data is empty, tearing the scene down");
            self.builder.teardown();
            self.scene_dirty = true;
            self.record_error(&WheelError::EmptyData);
            return;
        }
        self.error = None;
        self.schedule_redraw();
    }

    /// Window resized or rotated; recomputed once the burst settles
    pub fn on_viewport_change(&mut self, viewport: Viewport, now_ms: f64) {
        self.resize.push(viewport, now_ms);
    }

    /// Advance one animation frame
    pub fn frame(&mut self, now_ms: f64) -> FrameOutput {
        if let Some(viewport) = self.resize.poll(now_ms) {
            if self.relayout(viewport) {
                self.schedule_redraw();
            }
        }

        if self.builder.has_pending() {
            // Errors are recorded by the builder and reported through `error()`
            let _ = self.flush();
        }

        let animating = self.animator.tick(now_ms) > 0;

        FrameOutput {
            scene_changed: std::mem::take(&mut self.scene_dirty),
            style_changed: std::mem::take(&mut self.style_dirty),
            animating,
            image_request: self.builder.take_image_request(),
        }
    }

    /// Spin towards the current `model_value`.
    ///
    /// The returned future is independent of the host borrow; the frame loop
    /// drives it through `frame`.
    pub fn spin(&self) -> impl Future<Output = Option<Slice>> + use<> {
        let engine = Rc::clone(&self.engine);
        let animator = self.animator.clone();
        let slices = self.props.data.clone();
        let model_value = self.props.model_value;
        let group = self.builder.rotation_group();
        async move { engine.spin(&slices, model_value, group, &animator).await }
    }

    /// Register the `done` listener
    pub fn on_done(&self, callback: impl FnMut(&Slice) + 'static) {
        self.engine.on_done(callback);
    }

    /// Markup for the mount container
    pub fn markup(&mut self) -> String {
        self.builder.markup()
    }

    /// Center image finished loading
    pub fn image_loaded(&mut self, generation: u64) {
        if self.builder.image_loaded(generation) {
            self.scene_dirty = true;
        }
    }

    /// Center image failed to load
    pub fn image_failed(&mut self, generation: u64) {
        if let Some(e) = self.builder.image_failed(generation) {
            self.error = Some(e.to_string());
        }
    }

    /// Leave the terminal render state and try again
    pub fn reset(&mut self) {
        self.builder.reset();
        self.error = None;
        if self.mounted && !self.props.data.is_empty() {
            self.schedule_redraw();
        }
    }

    /// Recompute geometry and font tier. Returns whether anything changed.
    fn relayout(&mut self, viewport: Viewport) -> bool {
        self.viewport = viewport;
        let geometry = WheelGeometry::from_viewport(viewport.width, &self.props.layout);
        let mode = LayoutMode::for_viewport(viewport.width, &self.props.layout);
        if geometry == self.geometry && mode == self.mode {
            return false;
        }
        log::debug!(
            "Viewport {}x{}: wheel {}x{} ({:?})",
            viewport.width,
            viewport.height,
            geometry.width,
            geometry.height,
            mode
        );
        self.geometry = geometry;
        self.mode = mode;
        self.style_dirty = true;
        true
    }

    fn schedule_redraw(&mut self) {
        if !self.mounted {
            return;
        }
        let kind = if self.builder.is_built() {
            RenderKind::Partial
        } else {
            RenderKind::Full
        };
        self.schedule(kind);
    }

    fn schedule(&mut self, kind: RenderKind) {
        self.builder.schedule(kind);
    }

    fn flush(&mut self) -> WheelResult<()> {
        let request = build_request(&self.props, self.geometry, self.mode);
        let result = self.builder.flush(&request);
        self.scene_dirty = true;
        match &result {
            Ok(()) => self.error = None,
            Err(e) => self.record_error(e),
        }
        result
    }

    fn record_error(&mut self, error: &WheelError) {
        log::error!("{}", error);
        self.error = Some(error.to_string());
    }
}
