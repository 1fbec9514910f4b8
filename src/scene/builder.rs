//! Wheel builder: owns the scene and builds, rebuilds or tears down the wheel
//!
//! Scene layout under the mount container:
//!
//! ```text
//! svg
//! ├── defs > filter#arrowShadow
//! └── g.wrapper (centered)
//!     └── g.wheelholder
//!         ├── g.vis (rotation group): wedges, label arcs, labels
//!         ├── circle.middleCircle (optional)
//!         ├── circle.borderCircle
//!         ├── image.centerImage (once loaded)
//!         └── path.arrow
//! ```

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::arc::{SliceArc, pie};
use super::node::{NodeId, Scene};
use crate::consts::*;
use crate::error::{WheelError, WheelResult};
use crate::fmt_num;
use crate::layout::WheelGeometry;
use crate::slice::{ImgParams, SliceSet};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// DOM id of the rotation group, used by the browser mount for per-frame updates
pub const VIS_ID: &str = "wheel-vis";
const SHADOW_FILTER_ID: &str = "arrowShadow";
const SHADOW_FILTER_URL: &str = "url(#arrowShadow)";
const ARROW_PATH: &str = "M 95.3 9.8 C 78.8 9.8 71.6 25.4 73.4 36.8 C 76.8 58.5 95.3 79 95.3 79 S 113.8 58.5 117.2 36.8 C 119 25.4 111.8 9.8 95.3 9.8 Z";

/// Classes of everything that depends on slice data and is redrawn on rebuild
const DATA_CLASSES: [&str; 6] = [
    "slice",
    "hiddenarcs",
    "middleArcText",
    "middleCircle",
    "borderCircle",
    "centerImage",
];

/// The transformable group whose angle is the wheel's orientation.
///
/// The builder owns it; the spin engine only ever sees a `Weak` to it.
#[derive(Debug)]
pub struct RotationGroup {
    node: NodeId,
    angle: Cell<f64>,
}

impl RotationGroup {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            angle: Cell::new(0.0),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::new(Scene::new("detached").root())
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current rotation (degrees)
    pub fn angle(&self) -> f64 {
        self.angle.get()
    }

    pub fn set_angle(&self, degrees: f64) {
        self.angle.set(degrees);
    }

    /// SVG transform for the current angle
    pub fn transform(&self) -> String {
        format!("rotate({})", fmt_num(self.angle.get()))
    }
}

/// Live nodes of a built wheel
#[derive(Debug)]
pub struct SceneHandle {
    pub svg: NodeId,
    pub defs: NodeId,
    pub wrapper: NodeId,
    pub container: NodeId,
    pub arrow: NodeId,
    vis: Rc<RotationGroup>,
}

impl SceneHandle {
    pub fn vis(&self) -> NodeId {
        self.vis.node()
    }
}

#[derive(Debug)]
enum Lifecycle {
    Unbuilt,
    Built(SceneHandle),
}

/// What a scheduled render does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Tear everything down and construct from scratch
    Full,
    /// Redraw data-dependent nodes, keep the canvas and filters
    Partial,
}

/// Render bookkeeping
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub is_rendering: bool,
    /// Consecutive failed attempts
    pub attempts: u32,
    /// Last human-readable error
    pub error: Option<String>,
    /// Retry cap hit, nothing renders until `reset`
    pub exhausted: bool,
}

/// Everything one render needs
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub slices: &'a SliceSet,
    pub geometry: WheelGeometry,
    pub font_size: f64,
    pub font_family: &'a str,
    pub middle_circle: bool,
    pub center_image: Option<&'a ImgParams>,
}

/// A center image the host should load, tagged with the scene generation
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub generation: u64,
    pub params: ImgParams,
}

/// Builds and owns the wheel scene
#[derive(Debug)]
pub struct WheelBuilder {
    scene: Scene,
    lifecycle: Lifecycle,
    render: RenderState,
    pending: Option<RenderKind>,
    /// Bumped on every render and teardown; stale image loads are dropped
    generation: u64,
    image_request: Option<ImageRequest>,
    awaiting_image: Option<ImageRequest>,
}

impl WheelBuilder {
    pub fn new(mount_id: &str) -> Self {
        Self {
            scene: Scene::new(mount_id),
            lifecycle: Lifecycle::Unbuilt,
            render: RenderState::default(),
            pending: None,
            generation: 0,
            image_request: None,
            awaiting_image: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn handle(&self) -> Option<&SceneHandle> {
        match &self.lifecycle {
            Lifecycle::Built(handle) => Some(handle),
            Lifecycle::Unbuilt => None,
        }
    }

    pub fn is_built(&self) -> bool {
        self.handle().is_some()
    }

    pub fn is_rendering(&self) -> bool {
        self.render.is_rendering
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    pub fn error(&self) -> Option<&str> {
        self.render.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read-only reference to the rotation group for the spin engine
    pub fn rotation_group(&self) -> Option<Weak<RotationGroup>> {
        self.handle().map(|h| Rc::downgrade(&h.vis))
    }

    /// Queue a render for the next frame.
    ///
    /// Test-and-set on `is_rendering`: returns false (and queues nothing) if a
    /// render is already pending.
    pub fn schedule(&mut self, kind: RenderKind) -> bool {
        if self.render.is_rendering {
            log::warn!("Wheel is already rendering, skipping {:?} render", kind);
            return false;
        }
        self.render.is_rendering = true;
        self.pending = Some(kind);
        true
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run the queued render, if any. Always clears `is_rendering`.
    pub fn flush(&mut self, request: &BuildRequest<'_>) -> WheelResult<()> {
        let Some(kind) = self.pending.take() else {
            return Ok(());
        };

        let result = self.render(kind, request);
        self.render.is_rendering = false;

        match &result {
            Ok(()) => {
                self.render.attempts = 0;
                self.render.error = None;
            }
            Err(e) => {
                log::error!("Error during {:?} render: {}", kind, e);
                self.render.error = Some(e.to_string());
            }
        }
        result
    }

    /// Build the wheel from scratch (tears down any existing scene first)
    pub fn build(&mut self, request: &BuildRequest<'_>) -> WheelResult<()> {
        if !self.schedule(RenderKind::Full) {
            return Ok(());
        }
        self.flush(request)
    }

    /// Redraw slices and decorations on the existing canvas.
    ///
    /// A no-op while another render is in progress.
    pub fn rebuild(&mut self, request: &BuildRequest<'_>) -> WheelResult<()> {
        if !self.schedule(RenderKind::Partial) {
            return Ok(());
        }
        self.flush(request)
    }

    /// Destroy the whole scene. Safe to call when nothing is built.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.render.is_rendering = false;
        if self.is_built() {
            log::info!("Tearing down wheel");
        }
        self.teardown_scene();
    }

    /// Leave the terminal state after the retry cap was hit
    pub fn reset(&mut self) {
        self.render = RenderState::default();
        self.pending = None;
    }

    fn teardown_scene(&mut self) {
        if let Lifecycle::Built(handle) = std::mem::replace(&mut self.lifecycle, Lifecycle::Unbuilt) {
            self.scene.remove(handle.svg);
        }
        self.generation += 1;
        self.image_request = None;
        self.awaiting_image = None;
    }

    fn render(&mut self, kind: RenderKind, request: &BuildRequest<'_>) -> WheelResult<()> {
        if self.render.exhausted || self.render.attempts >= MAX_RENDER_ATTEMPTS {
            self.render.exhausted = true;
            return Err(WheelError::RenderRetryExhausted {
                attempts: self.render.attempts,
            });
        }
        if kind == RenderKind::Partial && !self.is_built() {
            return Err(WheelError::SceneNotReady("rebuild requires a built wheel"));
        }

        self.render.attempts += 1;

        let geometry = request.geometry;
        if geometry.is_degenerate() {
            return Err(WheelError::InvalidGeometry {
                width: geometry.width,
                height: geometry.height,
            });
        }
        // Validate before touching any node so a bad data set leaves the last good scene
        request.slices.validate()?;

        match kind {
            RenderKind::Full => self.render_full(request),
            RenderKind::Partial => self.render_partial(request),
        }

        if let Some(img) = request.center_image {
            self.request_image(img);
        }
        Ok(())
    }

    fn render_full(&mut self, request: &BuildRequest<'_>) {
        let previous_angle = self.handle().map(|h| h.vis.angle());
        self.teardown_scene();

        let handle = create_svg(&mut self.scene, request);
        if let Some(angle) = previous_angle {
            handle.vis.set_angle(angle);
        }
        draw_slices(&mut self.scene, handle.vis(), request);
        draw_decorations(&mut self.scene, handle.container, None, request);
        let arrow = create_arrow(&mut self.scene, handle.container, request.geometry);

        let handle = SceneHandle { arrow, ..handle };
        log::info!(
            "Wheel built: {} slices, radius {}",
            request.slices.len(),
            fmt_num(request.geometry.radius)
        );
        self.lifecycle = Lifecycle::Built(handle);
    }

    fn render_partial(&mut self, request: &BuildRequest<'_>) {
        let Lifecycle::Built(handle) = &self.lifecycle else {
            return;
        };

        for class in DATA_CLASSES {
            for id in self.scene.select_class(class) {
                self.scene.remove(id);
            }
        }
        self.generation += 1;
        self.image_request = None;
        self.awaiting_image = None;

        apply_canvas_attrs(&mut self.scene, handle, request);
        draw_slices(&mut self.scene, handle.vis(), request);
        draw_decorations(&mut self.scene, handle.container, Some(handle.arrow), request);
        log::debug!("Wheel redrawn with {} slices", request.slices.len());
    }

    fn request_image(&mut self, img: &ImgParams) {
        let request = ImageRequest {
            generation: self.generation,
            params: img.clone(),
        };
        self.image_request = Some(request.clone());
        self.awaiting_image = Some(request);
    }

    /// Image the host should start loading, if any
    pub fn take_image_request(&mut self) -> Option<ImageRequest> {
        self.image_request.take()
    }

    /// Swap the loaded center image in. Returns false for stale or unexpected loads.
    pub fn image_loaded(&mut self, generation: u64) -> bool {
        let Lifecycle::Built(handle) = &self.lifecycle else {
            log::warn!("Discarding image load for a torn-down wheel");
            return false;
        };
        let Some(img) = self
            .awaiting_image
            .take_if(|req| req.generation == generation)
        else {
            log::warn!("Discarding stale image load (generation {})", generation);
            return false;
        };

        let params = &img.params;
        let node = self
            .scene
            .insert_before(handle.container, "image", handle.arrow);
        self.scene
            .set_attr(node, "class", "centerImage")
            .set_attr(node, "x", fmt_num(-params.width / 2.0))
            .set_attr(node, "y", fmt_num(-params.height / 2.0))
            .set_attr(node, "width", fmt_num(params.width))
            .set_attr(node, "height", fmt_num(params.height))
            .set_attr(node, "href", params.src.clone())
            .set_attr(node, "preserveAspectRatio", "xMidYMid meet");
        log::debug!("Center image loaded: {}", params.src);
        true
    }

    /// Record a failed center image load. The wheel stays usable without it.
    pub fn image_failed(&mut self, generation: u64) -> Option<WheelError> {
        let img = self
            .awaiting_image
            .take_if(|req| req.generation == generation)?;
        let error = WheelError::ImageLoad {
            src: img.params.src,
        };
        log::error!("{}", error);
        self.render.error = Some(error.to_string());
        Some(error)
    }

    /// Markup for the mount container, with the rotation group's current angle applied
    pub fn markup(&mut self) -> String {
        if let Lifecycle::Built(handle) = &self.lifecycle {
            self.scene
                .set_attr(handle.vis(), "transform", handle.vis.transform());
        }
        self.scene.inner_markup()
    }
}

fn create_svg(scene: &mut Scene, request: &BuildRequest<'_>) -> SceneHandle {
    let svg = scene.append(scene.root(), "svg");
    scene
        .set_attr(svg, "xmlns", SVG_NS)
        .set_attr(svg, "height", "100%")
        .set_attr(svg, "width", "100%")
        .set_attr(svg, "shape-rendering", "optimizeSpeed")
        .set_attr(svg, "role", "img")
        .set_attr(svg, "aria-label", "Fortune Wheel");

    let defs = scene.append(svg, "defs");
    create_shadow_filter(scene, defs);

    let wrapper = scene.append(svg, "g");
    scene.set_attr(wrapper, "class", "wrapper");

    let container = scene.append(wrapper, "g");
    scene.set_attr(container, "class", "wheelholder");

    let vis_node = scene.append(container, "g");
    let vis = Rc::new(RotationGroup::new(vis_node));
    scene
        .set_attr(vis_node, "id", VIS_ID)
        .set_attr(vis_node, "class", "vis")
        .set_attr(vis_node, "transform", vis.transform());

    let handle = SceneHandle {
        svg,
        defs,
        wrapper,
        container,
        // Placeholder until the arrow is drawn on top of everything else
        arrow: vis_node,
        vis,
    };
    apply_canvas_attrs(scene, &handle, request);
    handle
}

fn create_shadow_filter(scene: &mut Scene, defs: NodeId) {
    let filter = scene.append(defs, "filter");
    scene
        .set_attr(filter, "id", SHADOW_FILTER_ID)
        .set_attr(filter, "x", "-50%")
        .set_attr(filter, "y", "-50%")
        .set_attr(filter, "width", "200%")
        .set_attr(filter, "height", "200%");

    let offset = scene.append(filter, "feOffset");
    scene
        .set_attr(offset, "in", "SourceAlpha")
        .set_attr(offset, "dx", "0")
        .set_attr(offset, "dy", "0")
        .set_attr(offset, "result", "offsetOut");

    let blur = scene.append(filter, "feGaussianBlur");
    scene
        .set_attr(blur, "stdDeviation", "6")
        .set_attr(blur, "in", "offsetOut")
        .set_attr(blur, "result", "blurOut");

    let matrix = scene.append(filter, "feColorMatrix");
    scene
        .set_attr(matrix, "in", "blurOut")
        .set_attr(matrix, "type", "matrix")
        .set_attr(matrix, "values", "0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0.20 0")
        .set_attr(matrix, "result", "shadowOut");

    let blend = scene.append(filter, "feBlend");
    scene
        .set_attr(blend, "in", "SourceGraphic")
        .set_attr(blend, "in2", "shadowOut")
        .set_attr(blend, "mode", "normal");
}

/// Geometry and font attributes of the preserved canvas nodes
fn apply_canvas_attrs(scene: &mut Scene, handle: &SceneHandle, request: &BuildRequest<'_>) {
    let g = request.geometry;
    let canvas_width = g.width + CANVAS_GUTTER;
    scene
        .set_attr(handle.svg, "font-size", format!("{}px", fmt_num(request.font_size)))
        .set_attr(handle.svg, "font-family", request.font_family)
        .set_attr(
            handle.svg,
            "viewBox",
            format!("0 0 {} {}", fmt_num(canvas_width), fmt_num(g.height)),
        );
    scene.set_attr(
        handle.wrapper,
        "transform",
        format!(
            "translate({}, {})",
            fmt_num(canvas_width / 2.0),
            fmt_num(g.height / 2.0)
        ),
    );
    if handle.arrow != handle.vis() {
        scene.set_attr(handle.arrow, "transform", arrow_transform(g));
    }
}

fn arrow_transform(g: WheelGeometry) -> String {
    format!("translate(-95, {})", fmt_num(-g.height / 2.0 + ARROW_TOP_OFFSET))
}

/// Wedges, label arcs and label text inside the rotation group
fn draw_slices(scene: &mut Scene, vis: NodeId, request: &BuildRequest<'_>) {
    let radius = request.geometry.radius;
    let arcs = pie(request.slices.len());

    for (arc, slice) in arcs.iter().zip(request.slices) {
        let wedge = scene.append(vis, "path");
        scene
            .set_attr(wedge, "class", "slice")
            .set_attr(wedge, "d", arc.wedge_path(radius))
            .set_attr(wedge, "stroke", "#000000")
            .set_attr(wedge, "stroke-width", fmt_num(STROKE_WIDTH / 2.0))
            .set_attr(wedge, "fill", slice.bg_color.clone())
            .set_attr(wedge, "shape-rendering", "auto")
            .set_attr(wedge, "stroke-linejoin", "round")
            .set_attr(wedge, "stroke-linecap", "round");
    }

    for arc in &arcs {
        let hidden = scene.append(vis, "path");
        scene
            .set_attr(hidden, "class", "hiddenarcs")
            .set_attr(hidden, "id", label_path_id(arc))
            .set_attr(hidden, "d", arc.label_arc(radius).to_path())
            .set_attr(hidden, "style", "fill: none;");
    }

    for (arc, slice) in arcs.iter().zip(request.slices) {
        let text = scene.append(vis, "text");
        scene
            .set_attr(text, "class", "middleArcText")
            .set_attr(text, "dy", fmt_num(arc.label_dy()));

        let path = scene.append(text, "textPath");
        scene
            .set_attr(path, "startOffset", "50%")
            .set_attr(path, "text-anchor", "middle")
            .set_attr(path, "stroke", "#0000001a")
            .set_attr(path, "fill", slice.color.clone())
            .set_attr(path, "font-family", request.font_family)
            .set_attr(path, "font-size", format!("{}px", fmt_num(request.font_size)))
            .set_attr(path, "letter-spacing", "1px")
            .set_attr(path, "href", format!("#{}", label_path_id(arc)));
        scene.set_text(path, slice.value.clone());
    }
}

fn label_path_id(arc: &SliceArc) -> String {
    format!("middleArc{}", arc.index)
}

/// Middle disc and border ring, placed beneath the arrow when it exists
fn draw_decorations(
    scene: &mut Scene,
    container: NodeId,
    arrow: Option<NodeId>,
    request: &BuildRequest<'_>,
) {
    let add = |scene: &mut Scene, tag: &'static str| match arrow {
        Some(before) => scene.insert_before(container, tag, before),
        None => scene.append(container, tag),
    };

    if request.middle_circle {
        let circle = add(scene, "circle");
        scene
            .set_attr(circle, "class", "middleCircle")
            .set_attr(circle, "cx", "0")
            .set_attr(circle, "cy", "0")
            .set_attr(circle, "r", fmt_num(request.geometry.radius / 2.5))
            .set_attr(circle, "fill", "#ffffff")
            .set_attr(circle, "stroke-width", fmt_num(STROKE_WIDTH / 2.0))
            .set_attr(circle, "stroke", "#000000")
            .set_attr(circle, "filter", SHADOW_FILTER_URL);
    }

    let border = add(scene, "circle");
    scene
        .set_attr(border, "class", "borderCircle")
        .set_attr(border, "cx", "0")
        .set_attr(border, "cy", "0")
        .set_attr(border, "r", fmt_num((request.geometry.width - 4.0) / 2.0))
        .set_attr(border, "fill", "transparent")
        .set_attr(border, "stroke-width", "10")
        .set_attr(border, "stroke", "#ffffff")
        .set_attr(border, "filter", SHADOW_FILTER_URL);
}

fn create_arrow(scene: &mut Scene, container: NodeId, geometry: WheelGeometry) -> NodeId {
    let arrow = scene.append(container, "path");
    scene
        .set_attr(arrow, "class", "arrow")
        .set_attr(arrow, "d", ARROW_PATH)
        .set_attr(arrow, "stroke", "#ffffff")
        .set_attr(arrow, "fill", "#FFFFFF")
        .set_attr(arrow, "stroke-linejoin", "round")
        .set_attr(arrow, "stroke-width", fmt_num(STROKE_WIDTH / 2.0))
        .set_attr(arrow, "filter", SHADOW_FILTER_URL)
        .set_attr(arrow, "transform", arrow_transform(geometry));
    arrow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Slice;

    fn gifts(n: usize) -> SliceSet {
        let colors = ["#7d7db3", "#ffffff", "#c92729", "#000000"];
        SliceSet::new(
            (0..n)
                .map(|i| {
                    Slice::new(
                        i as u64 + 1,
                        format!("Gift {}", i + 1),
                        colors[i % colors.len()],
                        "#111111",
                    )
                })
                .collect(),
        )
    }

    fn request<'a>(slices: &'a SliceSet, img: Option<&'a ImgParams>) -> BuildRequest<'a> {
        BuildRequest {
            slices,
            geometry: WheelGeometry::new(580.0, 720.0),
            font_size: 18.0,
            font_family: DEFAULT_FONT_FAMILY,
            middle_circle: true,
            center_image: img,
        }
    }

    fn fills(builder: &WheelBuilder) -> Vec<String> {
        let scene = builder.scene();
        scene
            .select_class("slice")
            .into_iter()
            .map(|id| scene.attr(id, "fill").unwrap_or_default().to_string())
            .collect()
    }

    fn labels(builder: &WheelBuilder) -> Vec<String> {
        let scene = builder.scene();
        scene
            .select_class("middleArcText")
            .into_iter()
            .filter_map(|text| scene.get(text)?.children().first().copied())
            .map(|path| scene.get(path).and_then(|n| n.text()).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_build_creates_full_scene() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();

        assert!(builder.is_built());
        assert!(!builder.is_rendering());
        let scene = builder.scene();
        assert_eq!(scene.select_class("slice").len(), 3);
        assert_eq!(scene.select_class("hiddenarcs").len(), 3);
        assert_eq!(scene.select_class("middleArcText").len(), 3);
        assert_eq!(scene.select_class("middleCircle").len(), 1);
        assert_eq!(scene.select_class("borderCircle").len(), 1);
        assert_eq!(scene.select_class("arrow").len(), 1);
        assert_eq!(fills(&builder), vec!["#7d7db3", "#ffffff", "#c92729"]);
        assert_eq!(labels(&builder), vec!["Gift 1", "Gift 2", "Gift 3"]);

        let handle = builder.handle().unwrap();
        assert_eq!(scene.attr(handle.svg, "viewBox"), Some("0 0 620 720"));
        assert_eq!(scene.attr(handle.wrapper, "transform"), Some("translate(310, 360)"));
        assert_eq!(scene.attr(handle.arrow, "transform"), Some("translate(-95, -340)"));
        // Arrow sits on top of everything in the container
        let container = scene.get(handle.container).unwrap();
        assert_eq!(container.children().last(), Some(&handle.arrow));
    }

    #[test]
    fn test_build_without_middle_circle() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        let req = BuildRequest {
            middle_circle: false,
            ..request(&slices, None)
        };
        builder.build(&req).unwrap();
        assert!(builder.scene().select_class("middleCircle").is_empty());
    }

    #[test]
    fn test_build_empty_data_fails() {
        let slices = SliceSet::default();
        let mut builder = WheelBuilder::new("wheel");
        assert_eq!(builder.build(&request(&slices, None)), Err(WheelError::EmptyData));
        assert!(!builder.is_built());
        assert!(!builder.is_rendering());
        assert_eq!(builder.error(), Some("wheel data cannot be empty"));
        assert!(builder.scene().is_empty());
        assert!(builder.rotation_group().is_none());
    }

    #[test]
    fn test_invalid_data_keeps_last_good_scene() {
        let good = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&good, None)).unwrap();

        let mut bad = gifts(4).as_slice().to_vec();
        bad[2].color.clear();
        let bad = SliceSet::new(bad);
        assert_eq!(
            builder.rebuild(&request(&bad, None)),
            Err(WheelError::InvalidSlice { index: 2, field: "color" })
        );
        assert!(builder.is_built());
        assert_eq!(fills(&builder).len(), 3);
        assert!(builder.error().unwrap().contains("index 2"));

        // A full build with bad data doesn't tear the good scene down either
        assert!(builder.build(&request(&bad, None)).is_err());
        assert!(builder.is_built());
        assert_eq!(labels(&builder), vec!["Gift 1", "Gift 2", "Gift 3"]);
    }

    #[test]
    fn test_rebuild_requires_built_scene() {
        let slices = gifts(2);
        let mut builder = WheelBuilder::new("wheel");
        assert!(matches!(
            builder.rebuild(&request(&slices, None)),
            Err(WheelError::SceneNotReady(_))
        ));
        assert!(!builder.is_rendering());
    }

    #[test]
    fn test_rebuild_is_deterministic_and_preserves_canvas() {
        let slices = gifts(5);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();
        let (svg, defs, vis) = {
            let h = builder.handle().unwrap();
            (h.svg, h.defs, h.vis())
        };
        let built_fills = fills(&builder);
        let built_labels = labels(&builder);
        let built_markup = builder.markup();

        builder.rebuild(&request(&slices, None)).unwrap();
        let h = builder.handle().unwrap();
        assert_eq!((h.svg, h.defs, h.vis()), (svg, defs, vis));
        assert_eq!(fills(&builder), built_fills);
        assert_eq!(labels(&builder), built_labels);
        assert_eq!(builder.markup(), built_markup);
    }

    #[test]
    fn test_rebuild_with_new_data_and_geometry() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();

        let more = gifts(4);
        let req = BuildRequest {
            geometry: WheelGeometry::new(355.0, 495.0),
            font_size: 13.0,
            ..request(&more, None)
        };
        builder.rebuild(&req).unwrap();

        let scene = builder.scene();
        let handle = builder.handle().unwrap();
        assert_eq!(scene.select_class("slice").len(), 4);
        assert_eq!(scene.select_class("borderCircle").len(), 1);
        assert_eq!(scene.attr(handle.svg, "viewBox"), Some("0 0 395 495"));
        assert_eq!(scene.attr(handle.svg, "font-size"), Some("13px"));
        assert_eq!(scene.attr(handle.arrow, "transform"), Some("translate(-95, -227.5)"));
        let container = scene.get(handle.container).unwrap();
        assert_eq!(container.children().last(), Some(&handle.arrow));
        assert_eq!(scene.select_class("wrapper").len(), 1);
    }

    #[test]
    fn test_rebuild_is_noop_while_render_pending() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();

        assert!(builder.schedule(RenderKind::Partial));
        assert!(builder.is_rendering());
        assert!(!builder.schedule(RenderKind::Full));

        let more = gifts(6);
        // Re-entry is ignored; the scene is untouched
        assert_eq!(builder.rebuild(&request(&more, None)), Ok(()));
        assert_eq!(fills(&builder).len(), 3);
        assert!(builder.is_rendering());

        builder.flush(&request(&more, None)).unwrap();
        assert!(!builder.is_rendering());
        assert_eq!(fills(&builder).len(), 6);
    }

    #[test]
    fn test_retry_cap_on_degenerate_geometry() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        let bad = BuildRequest {
            geometry: WheelGeometry::new(0.0, 0.0),
            ..request(&slices, None)
        };

        for _ in 0..MAX_RENDER_ATTEMPTS {
            assert!(matches!(
                builder.build(&bad),
                Err(WheelError::InvalidGeometry { .. })
            ));
        }
        assert_eq!(
            builder.build(&bad),
            Err(WheelError::RenderRetryExhausted { attempts: MAX_RENDER_ATTEMPTS })
        );
        // Terminal: even good input is refused until reset
        assert!(matches!(
            builder.build(&request(&slices, None)),
            Err(WheelError::RenderRetryExhausted { .. })
        ));
        assert!(builder.render_state().exhausted);
        assert!(!builder.is_rendering());

        builder.reset();
        builder.build(&request(&slices, None)).unwrap();
        assert!(builder.is_built());
        assert_eq!(builder.render_state().attempts, 0);
    }

    #[test]
    fn test_success_resets_attempts() {
        let slices = gifts(3);
        let empty = SliceSet::default();
        let mut builder = WheelBuilder::new("wheel");
        for _ in 0..2 {
            let _ = builder.build(&request(&empty, None));
        }
        assert_eq!(builder.render_state().attempts, 2);
        builder.build(&request(&slices, None)).unwrap();
        assert_eq!(builder.render_state().attempts, 0);
        assert!(builder.error().is_none());
    }

    #[test]
    fn test_teardown() {
        let mut builder = WheelBuilder::new("wheel");
        // Nothing built yet
        builder.teardown();
        assert!(!builder.is_built());

        let slices = gifts(3);
        builder.build(&request(&slices, None)).unwrap();
        let group = builder.rotation_group().unwrap();
        assert!(group.upgrade().is_some());

        builder.teardown();
        assert!(!builder.is_built());
        assert!(builder.scene().is_empty());
        assert!(group.upgrade().is_none());
        assert_eq!(builder.markup(), "");
    }

    #[test]
    fn test_full_build_replaces_previous_scene() {
        let slices = gifts(3);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();
        let old = builder.rotation_group().unwrap();
        old.upgrade().unwrap().set_angle(123.0);

        builder.build(&request(&slices, None)).unwrap();
        assert!(old.upgrade().is_none());
        assert_eq!(builder.scene().select_class("wrapper").len(), 1);
        // Orientation survives the rebuild
        let group = builder.rotation_group().unwrap().upgrade().unwrap();
        assert_eq!(group.angle(), 123.0);
    }

    #[test]
    fn test_markup_applies_rotation() {
        let slices = gifts(2);
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, None)).unwrap();
        builder
            .rotation_group()
            .and_then(|g| g.upgrade())
            .unwrap()
            .set_angle(1890.0);

        let markup = builder.markup();
        assert!(markup.starts_with("<svg"));
        assert!(markup.contains(r#"transform="rotate(1890)""#));
        assert!(markup.contains("Gift 2</textPath>"));
        assert!(markup.contains(r##"href="#middleArc1""##));
    }

    #[test]
    fn test_center_image_load() {
        let slices = gifts(3);
        let img = ImgParams {
            src: "logo.png".into(),
            width: 50.0,
            height: 40.0,
        };
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, Some(&img))).unwrap();

        let req = builder.take_image_request().unwrap();
        assert_eq!(req.params, img);
        assert!(builder.take_image_request().is_none());
        // Not in the scene until loaded
        assert!(builder.scene().select_class("centerImage").is_empty());

        assert!(builder.image_loaded(req.generation));
        let scene = builder.scene();
        let image = scene.select_class("centerImage");
        assert_eq!(image.len(), 1);
        assert_eq!(scene.attr(image[0], "x"), Some("-25"));
        assert_eq!(scene.attr(image[0], "y"), Some("-20"));
        let handle = builder.handle().unwrap();
        let container = scene.get(handle.container).unwrap();
        assert_eq!(container.children().last(), Some(&handle.arrow));

        // A second notification for the same load is ignored
        assert!(!builder.image_loaded(req.generation));
    }

    #[test]
    fn test_stale_image_load_is_discarded() {
        let slices = gifts(3);
        let img = ImgParams {
            src: "logo.png".into(),
            width: 50.0,
            height: 50.0,
        };
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, Some(&img))).unwrap();
        let stale = builder.take_image_request().unwrap();

        builder.rebuild(&request(&slices, Some(&img))).unwrap();
        let fresh = builder.take_image_request().unwrap();
        assert!(fresh.generation > stale.generation);

        assert!(!builder.image_loaded(stale.generation));
        assert!(builder.scene().select_class("centerImage").is_empty());

        builder.teardown();
        assert!(!builder.image_loaded(fresh.generation));
    }

    #[test]
    fn test_image_failure_degrades_gracefully() {
        let slices = gifts(3);
        let img = ImgParams {
            src: "missing.png".into(),
            width: 50.0,
            height: 50.0,
        };
        let mut builder = WheelBuilder::new("wheel");
        builder.build(&request(&slices, Some(&img))).unwrap();
        let req = builder.take_image_request().unwrap();

        let err = builder.image_failed(req.generation).unwrap();
        assert_eq!(err, WheelError::ImageLoad { src: "missing.png".into() });
        assert!(builder.is_built());
        assert!(builder.error().unwrap().contains("missing.png"));
        assert!(builder.scene().select_class("centerImage").is_empty());
        // Already settled
        assert!(builder.image_failed(req.generation).is_none());
    }
}
