//! Browser mount
//!
//! Serializes the wheel scene into the mount container, runs the
//! `requestAnimationFrame` loop that drives layout, rendering and the spin,
//! and forwards window resize / orientation changes and center image loads to
//! the host component.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::render::{AnimationFrame, request_animation_frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, HtmlImageElement};

use crate::layout::Viewport;
use crate::scene::{ImageRequest, VIS_ID};
use crate::settings::WheelProps;
use crate::slice::{Slice, SliceId, SliceSet};
use crate::wheel::FortuneWheel;

/// Attribute holding the JSON props on the mount container
pub const PROPS_ATTRIBUTE: &str = "data-props";

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

/// Current window inner size
pub fn viewport() -> Viewport {
    let Some(window) = web_sys::window() else {
        return Viewport::default();
    };
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport::new(width, height)
}

/// Monotonic time on the same clock as animation frame timestamps
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Props from the container's `data-props` attribute, defaults if absent or invalid
pub fn props_from_element(element: &Element) -> WheelProps {
    let Some(json) = element.get_attribute(PROPS_ATTRIBUTE) else {
        return WheelProps::default();
    };
    WheelProps::from_json(&json).unwrap_or_else(|e| {
        log::error!("Invalid {} on mount container: {}", PROPS_ATTRIBUTE, e);
        WheelProps::default()
    })
}

/// A wheel mounted into a page element
pub struct DomMount {
    wheel: RefCell<FortuneWheel>,
    container: HtmlElement,
    /// Rotation group element, refreshed after every markup sync
    vis: RefCell<Option<Element>>,
    listeners: RefCell<Vec<EventListener>>,
    image_listeners: RefCell<Vec<EventListener>>,
    frame: RefCell<Option<AnimationFrame>>,
    was_animating: Cell<bool>,
    alive: Cell<bool>,
}

impl DomMount {
    /// Mount into the element matching `selector`.
    ///
    /// Without explicit props, they are read from the element's `data-props`.
    pub fn mount(selector: &str, props: Option<WheelProps>) -> Result<Rc<Self>, JsValue> {
        let document = window()?
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let container: HtmlElement = document
            .query_selector(selector)?
            .ok_or_else(|| JsValue::from_str(&format!("mount container {} not found", selector)))?
            .dyn_into()
            .map_err(JsValue::from)?;

        let props = props.unwrap_or_else(|| props_from_element(&container));
        let mount_id = match container.id() {
            id if id.is_empty() => selector.trim_start_matches('#').to_string(),
            id => id,
        };

        let mut wheel = FortuneWheel::with_mount_id(&mount_id, props, viewport());
        if let Err(e) = wheel.mount() {
            // The wheel stays mounted and recovers on the next data change
            log::error!("Initial wheel build failed: {}", e);
        }

        let mount = Rc::new(Self {
            wheel: RefCell::new(wheel),
            container,
            vis: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            image_listeners: RefCell::new(Vec::new()),
            frame: RefCell::new(None),
            was_animating: Cell::new(false),
            alive: Cell::new(true),
        });

        mount.on_frame(now_ms());
        mount.install_listeners()?;
        mount.schedule_frame();
        log::info!("Wheel mounted on {}", selector);
        Ok(mount)
    }

    fn install_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let window = window()?;
        let mut listeners = Vec::new();
        for event in ["resize", "orientationchange"] {
            let mount = Rc::downgrade(self);
            let listener = EventListener::new(&window, event, move |_event| {
                if let Some(mount) = mount.upgrade() {
                    mount.wheel.borrow_mut().on_viewport_change(viewport(), now_ms());
                }
            });
            listeners.push(listener);
        }
        *self.listeners.borrow_mut() = listeners;
        Ok(())
    }

    fn schedule_frame(self: &Rc<Self>) {
        let mount = Rc::downgrade(self);
        let handle = request_animation_frame(move |timestamp| {
            let Some(mount) = mount.upgrade() else {
                return;
            };
            mount.frame.borrow_mut().take();
            if !mount.alive.get() {
                return;
            }
            mount.on_frame(timestamp);
            mount.schedule_frame();
        });
        *self.frame.borrow_mut() = Some(handle);
    }

    fn on_frame(self: &Rc<Self>, timestamp: f64) {
        let image_request = {
            let mut wheel = self.wheel.borrow_mut();
            let output = wheel.frame(timestamp);

            if output.style_changed {
                let _ = self.container.set_attribute("style", &wheel.style().to_css());
            }

            if output.scene_changed {
                self.container.set_inner_html(&wheel.markup());
                let vis = self
                    .container
                    .query_selector(&format!("#{}", VIS_ID))
                    .ok()
                    .flatten();
                *self.vis.borrow_mut() = vis;
            } else if output.animating || self.was_animating.get() {
                // Only the rotation changes while spinning
                if let (Some(vis), Some(transform)) =
                    (self.vis.borrow().as_ref(), wheel.rotation_transform())
                {
                    let _ = vis.set_attribute("transform", &transform);
                }
            }
            self.was_animating.set(output.animating);
            output.image_request
        };

        if let Some(request) = image_request {
            self.load_image(request);
        }
    }

    fn load_image(self: &Rc<Self>, request: ImageRequest) {
        let generation = request.generation;
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(e) => {
                log::error!("Cannot create image element: {:?}", e);
                self.wheel.borrow_mut().image_failed(generation);
                return;
            }
        };

        let mount = Rc::downgrade(self);
        let on_load = EventListener::once(&img, "load", move |_event| {
            if let Some(mount) = mount.upgrade() {
                mount.wheel.borrow_mut().image_loaded(generation);
            }
        });
        let mount = Rc::downgrade(self);
        let on_error = EventListener::once(&img, "error", move |_event| {
            if let Some(mount) = mount.upgrade() {
                mount.wheel.borrow_mut().image_failed(generation);
            }
        });
        img.set_src(&request.params.src);

        // Listeners of an older load are stale; dropping them detaches them
        *self.image_listeners.borrow_mut() = vec![on_load, on_error];
    }

    /// Start a spin; drive it with `wasm_bindgen_futures::spawn_local`
    pub fn spin(&self) -> impl Future<Output = Option<Slice>> + use<> {
        self.wheel.borrow().spin()
    }

    pub fn on_done(&self, callback: impl FnMut(&Slice) + 'static) {
        self.wheel.borrow().on_done(callback);
    }

    pub fn set_data(&self, data: SliceSet) {
        self.wheel.borrow_mut().set_data(data);
    }

    pub fn set_model_value(&self, model_value: SliceId) {
        self.wheel.borrow_mut().set_model_value(model_value);
    }

    pub fn set_props(&self, props: WheelProps) {
        self.wheel.borrow_mut().set_props(props);
    }

    /// Run `f` with the host component
    pub fn with_wheel<R>(&self, f: impl FnOnce(&mut FortuneWheel) -> R) -> R {
        f(&mut self.wheel.borrow_mut())
    }

    /// Stop the frame loop, detach listeners and clear the container
    pub fn unmount(&self) {
        if !self.alive.replace(false) {
            return;
        }
        self.frame.borrow_mut().take();
        self.listeners.borrow_mut().clear();
        self.image_listeners.borrow_mut().clear();
        self.wheel.borrow_mut().unmount();
        self.vis.borrow_mut().take();
        self.container.set_inner_html("");
        log::info!("Wheel unmounted");
    }
}
