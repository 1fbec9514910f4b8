//! Spin engine: runs one spin at a time and reports the landed slice
//!
//! The engine never touches the scene directly. It turns the rotation group
//! it is handed through the animator and remembers the accumulated angle so
//! that every spin moves the wheel forward.

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use super::animator::Animator;
use super::easing::{Easing, Tween};
use super::plan::plan_spin;
use crate::consts::{DEFAULT_ANIM_DURATION_MS, DEFAULT_OVERSHOOT};
use crate::error::WheelError;
use crate::scene::RotationGroup;
use crate::slice::{Slice, SliceId, SliceSet};

/// Timing of a spin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinConfig {
    pub duration_ms: f64,
    pub overshoot: f64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_ANIM_DURATION_MS,
            overshoot: DEFAULT_OVERSHOOT,
        }
    }
}

type DoneCallback = Box<dyn FnMut(&Slice)>;

/// Clears the spinning flag however the spin ends, including the future being dropped
struct SpinGuard<'a>(&'a Cell<bool>);

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct SpinEngine {
    config: Cell<SpinConfig>,
    is_spinning: Cell<bool>,
    /// Accumulated rotation (degrees), only ever grows
    rotation: Cell<f64>,
    error: RefCell<Option<String>>,
    on_done: RefCell<Option<DoneCallback>>,
}

impl std::fmt::Debug for SpinEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinEngine")
            .field("config", &self.config.get())
            .field("is_spinning", &self.is_spinning.get())
            .field("rotation", &self.rotation.get())
            .field("error", &self.error.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for SpinEngine {
    fn default() -> Self {
        Self::new(SpinConfig::default())
    }
}

impl SpinEngine {
    pub fn new(config: SpinConfig) -> Self {
        Self {
            config: Cell::new(config),
            is_spinning: Cell::new(false),
            rotation: Cell::new(0.0),
            error: RefCell::new(None),
            on_done: RefCell::new(None),
        }
    }

    pub fn config(&self) -> SpinConfig {
        self.config.get()
    }

    /// Takes effect on the next spin
    pub fn set_config(&self, config: SpinConfig) {
        self.config.set(config);
    }

    pub fn is_spinning(&self) -> bool {
        self.is_spinning.get()
    }

    /// Accumulated rotation (degrees)
    pub fn rotation(&self) -> f64 {
        self.rotation.get()
    }

    /// Last spin failure, if any
    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    /// Register the `done` listener (replaces any previous one)
    pub fn on_done(&self, callback: impl FnMut(&Slice) + 'static) {
        *self.on_done.borrow_mut() = Some(Box::new(callback));
    }

    /// Spin towards `model_value` and resolve with the landed slice.
    ///
    /// Resolves to `None` without emitting `done` when a spin is already in
    /// flight, the set is empty, or the animation was interrupted. Without a
    /// rotation group the animation is skipped but `done` still fires.
    pub async fn spin(
        &self,
        slices: &SliceSet,
        model_value: SliceId,
        group: Option<Weak<RotationGroup>>,
        animator: &Animator,
    ) -> Option<Slice> {
        if self.is_spinning.get() {
            log::debug!("Spin already in progress, ignoring");
            return None;
        }
        // A rebuilt or interrupted group may sit away from the accumulated angle
        let group = group.filter(|g| g.strong_count() > 0);
        let current_angle = group.as_ref().and_then(Weak::upgrade).map(|g| g.angle());
        let previous = current_angle.map_or(self.rotation.get(), |a| a.max(self.rotation.get()));

        let Some(plan) = plan_spin(slices, model_value, previous) else {
            log::warn!("Cannot spin an empty wheel");
            return None;
        };
        // The set may change while we await; keep the slice we resolved to
        let picked = slices.get(plan.picked_index)?.clone();

        self.is_spinning.set(true);
        let _guard = SpinGuard(&self.is_spinning);
        self.rotation.set(plan.to);

        log::info!(
            "Spinning to slice {} ({} of {}), target {:?}",
            plan.picked_index,
            picked.value,
            slices.len(),
            model_value
        );
        let from = current_angle.unwrap_or(plan.from);
        log::debug!(
            "Rotation {} -> {} (snapped {}, offset {})",
            from,
            plan.to,
            plan.rotation,
            plan.centering_offset
        );

        match group {
            Some(group) => {
                let config = self.config.get();
                let tween = Tween::new(
                    from,
                    plan.to,
                    config.duration_ms,
                    Easing::back_out(config.overshoot),
                );
                if let Err(e) = animator.rotate(group, tween).await {
                    log::error!("Error spinning the wheel: {}", e);
                    *self.error.borrow_mut() = Some(e.to_string());
                    return None;
                }
            }
            None => {
                log::warn!("{}", WheelError::SceneNotReady("no rotation group, skipping animation"));
            }
        }

        *self.error.borrow_mut() = None;
        drop(_guard);
        self.emit_done(&picked);
        Some(picked)
    }

    fn emit_done(&self, slice: &Slice) {
        // Taken out for the call so the listener may re-register or spin again
        let callback = self.on_done.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(slice);
            let mut slot = self.on_done.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use futures::executor::block_on;
    use futures::task::noop_waker_ref;
    use std::rc::Rc;
    use std::task::{Context, Poll};

    fn two_slices() -> SliceSet {
        SliceSet::new(vec![
            Slice::new(1, "A", "#000", "#fff"),
            Slice::new(2, "B", "#fff", "#000"),
        ])
    }

    fn recorder(engine: &SpinEngine) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_done(move |slice| sink.borrow_mut().push(slice.value.clone()));
        seen
    }

    fn fast() -> SpinConfig {
        SpinConfig {
            duration_ms: 100.0,
            overshoot: 0.3,
        }
    }

    #[test]
    fn test_spin_lands_on_target_and_emits_once() {
        let engine = SpinEngine::new(fast());
        let seen = recorder(&engine);
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        let slices = two_slices();

        let mut cx = Context::from_waker(noop_waker_ref());
        let mut fut = Box::pin(engine.spin(&slices, SliceId(2), Some(Rc::downgrade(&group)), &animator));
        assert!(fut.poll_unpin(&mut cx).is_pending());
        assert!(engine.is_spinning());

        animator.tick(0.0);
        animator.tick(50.0);
        assert!(fut.poll_unpin(&mut cx).is_pending());
        assert!(seen.borrow().is_empty());

        animator.tick(100.0);
        let landed = match fut.poll_unpin(&mut cx) {
            Poll::Ready(slice) => slice,
            Poll::Pending => panic!("spin should have finished"),
        };
        assert_eq!(landed.map(|s| s.value), Some("B".to_string()));
        assert_eq!(*seen.borrow(), vec!["B"]);
        assert_eq!(group.angle(), 1890.0);
        assert_eq!(engine.rotation(), 1890.0);
        assert!(!engine.is_spinning());
        assert!(engine.error().is_none());
    }

    #[test]
    fn test_spin_while_spinning_is_noop() {
        let engine = SpinEngine::new(fast());
        let seen = recorder(&engine);
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        let slices = two_slices();
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut first = Box::pin(engine.spin(&slices, SliceId(1), Some(Rc::downgrade(&group)), &animator));
        assert!(first.poll_unpin(&mut cx).is_pending());

        // Second call resolves immediately and starts nothing
        let second = block_on(engine.spin(&slices, SliceId(2), Some(Rc::downgrade(&group)), &animator));
        assert!(second.is_none());
        assert_eq!(animator.transitions_started(), 1);

        animator.tick(0.0);
        animator.tick(100.0);
        assert!(matches!(first.poll_unpin(&mut cx), Poll::Ready(Some(_))));
        assert_eq!(*seen.borrow(), vec!["A"]);
    }

    #[test]
    fn test_empty_set_is_noop() {
        let engine = SpinEngine::default();
        let seen = recorder(&engine);
        let animator = Animator::new();
        let result = block_on(engine.spin(&SliceSet::default(), SliceId(1), None, &animator));
        assert!(result.is_none());
        assert!(seen.borrow().is_empty());
        assert!(!engine.is_spinning());
        assert_eq!(engine.rotation(), 0.0);
    }

    #[test]
    fn test_spin_without_group_still_emits() {
        let engine = SpinEngine::default();
        let seen = recorder(&engine);
        let animator = Animator::new();
        let slices = two_slices();
        let result = block_on(engine.spin(&slices, SliceId(2), None, &animator));
        assert_eq!(result.map(|s| s.id), Some(SliceId(2)));
        assert_eq!(*seen.borrow(), vec!["B"]);
        assert_eq!(animator.transitions_started(), 0);
        assert_eq!(engine.rotation(), 1890.0);
    }

    #[test]
    fn test_vanished_group_records_error() {
        let engine = SpinEngine::new(fast());
        let seen = recorder(&engine);
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        let slices = two_slices();
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut fut = Box::pin(engine.spin(&slices, SliceId(1), Some(Rc::downgrade(&group)), &animator));
        assert!(fut.poll_unpin(&mut cx).is_pending());
        animator.tick(0.0);
        drop(group);
        animator.tick(10.0);

        assert_eq!(fut.poll_unpin(&mut cx), Poll::Ready(None));
        assert!(seen.borrow().is_empty());
        assert!(!engine.is_spinning());
        assert!(engine.error().unwrap().contains("vanished"));
    }

    #[test]
    fn test_dropped_spin_clears_flag() {
        let engine = SpinEngine::new(fast());
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        let slices = two_slices();
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut fut = Box::pin(engine.spin(&slices, SliceId(1), Some(Rc::downgrade(&group)), &animator));
        assert!(fut.poll_unpin(&mut cx).is_pending());
        assert!(engine.is_spinning());
        drop(fut);
        assert!(!engine.is_spinning());
    }

    #[test]
    fn test_consecutive_spins_accumulate() {
        let engine = SpinEngine::new(SpinConfig {
            duration_ms: 0.0,
            overshoot: 0.3,
        });
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        let slices = two_slices();
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut angles = Vec::new();
        for _ in 0..3 {
            let mut fut = Box::pin(engine.spin(&slices, SliceId(2), Some(Rc::downgrade(&group)), &animator));
            assert!(fut.poll_unpin(&mut cx).is_pending());
            animator.tick(0.0);
            assert!(matches!(fut.poll_unpin(&mut cx), Poll::Ready(Some(_))));
            angles.push(group.angle());
        }
        assert_eq!(angles, vec![1890.0, 1890.0 + 2160.0, 1890.0 + 2.0 * 2160.0]);
    }

    #[test]
    fn test_spin_starts_from_group_angle() {
        let engine = SpinEngine::new(fast());
        let animator = Animator::new();
        let slices = two_slices();
        block_on(engine.spin(&slices, SliceId(2), None, &animator));
        assert_eq!(engine.rotation(), 1890.0);

        // A freshly built group starts at rest
        let group = Rc::new(RotationGroup::detached());
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut fut = Box::pin(engine.spin(&slices, SliceId(2), Some(Rc::downgrade(&group)), &animator));
        assert!(fut.poll_unpin(&mut cx).is_pending());
        animator.tick(0.0);
        assert_eq!(group.angle(), 0.0);
        animator.tick(100.0);
        assert!(matches!(fut.poll_unpin(&mut cx), Poll::Ready(Some(_))));
        assert_eq!(group.angle(), 1890.0 + 2160.0);
    }

    #[test]
    fn test_group_ahead_of_accumulator_moves_forward() {
        let engine = SpinEngine::new(fast());
        let animator = Animator::new();
        let group = Rc::new(RotationGroup::detached());
        group.set_angle(3000.0);
        let mut cx = Context::from_waker(noop_waker_ref());

        let slices = two_slices();
        let mut fut = Box::pin(engine.spin(&slices, SliceId(1), Some(Rc::downgrade(&group)), &animator));
        assert!(fut.poll_unpin(&mut cx).is_pending());
        animator.tick(0.0);
        assert_eq!(group.angle(), 3000.0);
        animator.tick(100.0);
        assert!(matches!(fut.poll_unpin(&mut cx), Poll::Ready(Some(_))));
        // ceil(3000 / 360) * 360 = 3240, plus 2160 - 90
        assert_eq!(group.angle(), 5310.0);
        assert_eq!(engine.rotation(), 5310.0);
    }

    #[test]
    fn test_done_listener_can_replace_itself() {
        let engine = Rc::new(SpinEngine::default());
        let animator = Animator::new();
        let slices = two_slices();
        let spins = Rc::new(Cell::new(0));

        let counter = Rc::clone(&spins);
        let weak = Rc::downgrade(&engine);
        engine.on_done(move |_| {
            counter.set(counter.get() + 1);
            // Re-registering from inside the listener replaces it
            if let Some(engine) = weak.upgrade() {
                engine.on_done(|_| {});
            }
        });

        block_on(engine.spin(&slices, SliceId(1), None, &animator));
        block_on(engine.spin(&slices, SliceId(1), None, &animator));
        assert_eq!(spins.get(), 1);
    }
}
