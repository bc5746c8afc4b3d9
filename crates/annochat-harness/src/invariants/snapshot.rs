//! Observable state snapshots for invariant checking.
//!
//! An [`Observation`] pairs the rendered view with everything the runtime
//! asked the driver to do so far. Invariants operate on observations rather
//! than live state so every check sees one consistent moment.

use annochat_app::{AppView, ConnectionId};

use crate::DriverCall;

/// Observable state at one render.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// View handed to the driver.
    pub view: AppView,
    /// Chat connection the driver holds open.
    pub open_chat: Option<ConnectionId>,
    /// Driver operations up to this render, oldest first.
    pub calls: Vec<DriverCall>,
}

impl Observation {
    /// Observation of `view` with no driver history.
    pub fn of_view(view: AppView) -> Self {
        Self { view, ..Self::default() }
    }
}
