//! Frame-driven transitions of the rotation group
//!
//! `rotate` registers a transition and hands back a future; the host's frame
//! loop calls `tick` with a monotonic timestamp, which samples every active
//! transition and resolves its future once it reaches the end.

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;

use super::easing::Tween;
use crate::error::{WheelError, WheelResult};
use crate::scene::RotationGroup;

struct Transition {
    group: Weak<RotationGroup>,
    tween: Tween,
    /// Set on the first tick
    started_at: Option<f64>,
    done: oneshot::Sender<WheelResult<()>>,
}

#[derive(Default)]
struct AnimatorInner {
    active: Vec<Transition>,
    started: usize,
}

/// Shared handle to the running transitions
#[derive(Clone, Default)]
pub struct Animator {
    inner: Rc<RefCell<AnimatorInner>>,
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Animator")
            .field("active", &inner.active.len())
            .field("started", &inner.started)
            .finish()
    }
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start turning `group` along `tween`.
    ///
    /// A transition already running on the same group is interrupted and its
    /// future resolves with `AnimationInterrupted`.
    pub fn rotate(
        &self,
        group: Weak<RotationGroup>,
        tween: Tween,
    ) -> impl Future<Output = WheelResult<()>> + use<> {
        let (tx, rx) = oneshot::channel();

        let superseded = {
            let mut inner = self.inner.borrow_mut();
            let (same, others): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.active)
                .into_iter()
                .partition(|t| t.group.ptr_eq(&group));
            inner.active = others;
            inner.active.push(Transition {
                group,
                tween,
                started_at: None,
                done: tx,
            });
            inner.started += 1;
            same
        };
        for transition in superseded {
            log::debug!("Interrupting running rotation");
            let _ = transition
                .done
                .send(Err(WheelError::AnimationInterrupted("superseded by a new rotation")));
        }

        async move {
            rx.await
                .unwrap_or(Err(WheelError::AnimationInterrupted("animator dropped")))
        }
    }

    /// Advance every transition to `now_ms`. Returns how many are still running.
    pub fn tick(&self, now_ms: f64) -> usize {
        let mut settled = Vec::new();
        let remaining = {
            let mut inner = self.inner.borrow_mut();
            let mut i = 0;
            while i < inner.active.len() {
                let t = &mut inner.active[i];
                if t.done.is_canceled() {
                    inner.active.swap_remove(i);
                    continue;
                }

                let started_at = *t.started_at.get_or_insert(now_ms);
                let elapsed = now_ms - started_at;

                let outcome = match t.group.upgrade() {
                    None => Some(Err(WheelError::AnimationInterrupted("rotation group vanished"))),
                    Some(group) => {
                        group.set_angle(t.tween.sample(elapsed));
                        t.tween.is_finished(elapsed).then_some(Ok(()))
                    }
                };

                match outcome {
                    Some(result) => {
                        let t = inner.active.swap_remove(i);
                        settled.push((t.done, result));
                    }
                    None => i += 1,
                }
            }
            inner.active.len()
        };

        // Resolve outside the borrow so woken tasks may start new transitions
        for (done, result) in settled {
            let _ = done.send(result);
        }
        remaining
    }

    pub fn is_idle(&self) -> bool {
        self.inner.borrow().active.is_empty()
    }

    /// Transitions started since creation
    pub fn transitions_started(&self) -> usize {
        self.inner.borrow().started
    }

    /// Drop every running transition; their futures resolve as interrupted
    pub fn clear(&self) {
        let active = std::mem::take(&mut self.inner.borrow_mut().active);
        drop(active);
    }
}
