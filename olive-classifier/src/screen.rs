//! State machine behind the classification screen.
//!
//! ```text
//! Idle --acquire--> Loading --success--> Result --reset--> Idle
//!                      |
//!                      +--failure/cancel--> Idle
//! ```
//!
//! Only one run can be in flight: an acquisition requested while the
//! controller is not idle is ignored.
use std::sync::{Mutex, MutexGuard};

use log::{error, info, warn};

use crate::{
    acquire::{AcquireError, Acquisition, ImageAcquirer, ImageSource},
    engine::InferenceEngine,
    service::{Service, ServiceError},
    verdict::Verdict,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    Idle,
    Loading,
    Result(Verdict),
}

/// Message the user has to see, e.g. in a dismissible dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PermissionNeeded(String),
    AnalysisFailed(String),
}

/// Outcome of a user action.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The action was not allowed in the current state, nothing happened.
    Ignored,
    /// The user closed the picker, back to idle.
    Cancelled,
    /// The run failed, a notice was queued.
    Failed(Notice),
    Completed(Verdict),
    Reset,
}

pub struct ScreenController<'s, A, E> {
    acquirer: A,
    service: &'s Service<E>,
    state: Mutex<ScreenState>,
    notices: Mutex<Vec<Notice>>,
}

impl<'s, A, E> ScreenController<'s, A, E>
where
    A: ImageAcquirer,
    E: InferenceEngine,
{
    pub fn new(acquirer: A, service: &'s Service<E>) -> Self {
        Self {
            acquirer,
            service,
            state: Mutex::new(ScreenState::Idle),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ScreenState {
        self.lock_state().clone()
    }

    pub fn is_busy(&self) -> bool {
        matches!(*self.lock_state(), ScreenState::Loading)
    }

    /// Notices queued since the last call.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Takes a picture or picks one from the gallery, then classifies it.
    ///
    /// Blocks until the run completes. Returns [`Transition::Ignored`] without
    /// doing anything if the screen is not idle.
    pub fn acquire(&self, source: ImageSource) -> Transition {
        {
            let mut state = self.lock_state();
            if *state != ScreenState::Idle {
                warn!("Ignoring {source} request, the screen is not idle");
                return Transition::Ignored;
            }
            *state = ScreenState::Loading;
        }

        let (next, transition) = self.run(source);
        *self.lock_state() = next;
        if let Transition::Failed(notice) = &transition {
            self.notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(notice.clone());
        }
        transition
    }

    /// Goes back to idle after a result was shown.
    pub fn reset(&self) -> Transition {
        let mut state = self.lock_state();
        match *state {
            ScreenState::Result(_) => {
                *state = ScreenState::Idle;
                Transition::Reset
            }
            _ => Transition::Ignored,
        }
    }

    fn run(&self, source: ImageSource) -> (ScreenState, Transition) {
        let image = match self.acquirer.acquire(source) {
            Ok(Acquisition::Image(image)) => image,
            Ok(Acquisition::Cancelled) => {
                info!("Image selection cancelled");
                return (ScreenState::Idle, Transition::Cancelled);
            }
            Err(e @ AcquireError::PermissionDenied(_)) => {
                warn!("{e}");
                let notice = Notice::PermissionNeeded(e.to_string());
                return (ScreenState::Idle, Transition::Failed(notice));
            }
            Err(e) => {
                warn!("{e}");
                let notice = Notice::AnalysisFailed(e.to_string());
                return (ScreenState::Idle, Transition::Failed(notice));
            }
        };

        match self.service.classify(&image) {
            Ok(verdict) => (
                ScreenState::Result(verdict.clone()),
                Transition::Completed(verdict),
            ),
            Err(e) => {
                report(&e);
                let notice = Notice::AnalysisFailed(format!("Failed to analyze image: {e}"));
                (ScreenState::Idle, Transition::Failed(notice))
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ScreenState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn report(e: &ServiceError) {
    if e.is_configuration_error() {
        error!("Configuration error, the model and the label table are out of sync: {e}");
    } else {
        warn!("Failed to analyze image: {e}");
    }
}
