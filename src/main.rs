//! Fortune Wheel demo entry point
//!
//! On the web: mounts the wheel into `#wheel`, spins it from `#spin-btn` and
//! writes the prize into `#result`. Natively: spins a sample wheel headlessly
//! and prints the final SVG.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo::events::EventListener;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use fortune_wheel::consts::MOUNT_SELECTOR;
    use fortune_wheel::platform::DomMount;

    thread_local! {
        /// Keeps the mount alive for the lifetime of the page
        static MOUNT: RefCell<Option<Rc<DomMount>>> = const { RefCell::new(None) };
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger already set: {}", e).into());
        }

        log::info!("Fortune Wheel starting...");

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let mount = DomMount::mount(MOUNT_SELECTOR, None)?;

        let result = document.get_element_by_id("result");
        mount.on_done(move |slice| {
            log::info!("Landed on {}", slice.value);
            if let Some(el) = &result {
                el.set_text_content(Some(&slice.value));
            }
        });

        if let Some(button) = document.get_element_by_id("spin-btn") {
            let seed = js_sys::Date::now() as u64;
            log::info!("Spin targets seeded with: {}", seed);
            let rng = RefCell::new(Pcg32::seed_from_u64(seed));
            let target = Rc::clone(&mount);
            EventListener::new(&button, "click", move |_event| {
                let pick = target.with_wheel(|wheel| wheel.data().random_id(&mut *rng.borrow_mut()));
                if let Some(id) = pick {
                    target.set_model_value(id);
                }
                let spin = target.spin();
                spawn_local(async move {
                    if spin.await.is_none() {
                        log::debug!("Spin request ignored");
                    }
                });
            })
            .forget();
        }

        MOUNT.with(|slot| *slot.borrow_mut() = Some(mount));
        log::info!("Fortune Wheel running!");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    web_demo::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::task::{Context, Poll};

    use futures::FutureExt;
    use futures::task::noop_waker_ref;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use fortune_wheel::{FortuneWheel, Slice, SliceSet, Viewport, WheelProps};

    env_logger::init();
    log::info!("Fortune Wheel (native) starting...");

    let colors = [("#7d7db3", "#ffffff"), ("#ffffff", "#000000"), ("#c92729", "#ffffff")];
    let data = SliceSet::new(
        (0..6)
            .map(|i| {
                let (bg, fg) = colors[i % colors.len()];
                Slice::new(i as u64 + 1, format!("Gift {}", i + 1), bg, fg)
            })
            .collect(),
    );

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42u64);
    let mut rng = Pcg32::seed_from_u64(seed);
    let props = WheelProps {
        model_value: data.random_id(&mut rng).unwrap_or_default(),
        data,
        anim_duration: 2000.0,
        ..Default::default()
    };

    let mut wheel = FortuneWheel::new(props, Viewport::new(1024.0, 768.0));
    if let Err(e) = wheel.mount() {
        log::error!("Build failed: {}", e);
        std::process::exit(1);
    }
    wheel.on_done(|slice| log::info!("done: {}", slice.value));

    // Headless frame loop at ~60 fps
    let mut cx = Context::from_waker(noop_waker_ref());
    let mut spin = Box::pin(wheel.spin());
    let mut now = 0.0;
    let landed = loop {
        if let Poll::Ready(landed) = spin.poll_unpin(&mut cx) {
            break landed;
        }
        wheel.frame(now);
        now += 16.0;
    };

    match landed {
        Some(slice) => log::info!(
            "Target {:?}, landed on {} after {} ms",
            wheel.props().model_value,
            slice.value,
            now
        ),
        None => log::warn!("Spin did not complete"),
    }
    println!("{}", wheel.markup());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The wasm entry point is `wasm_main`
}
