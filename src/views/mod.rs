//! Dependent views
//!
//! View models computed from the session. Each one consults the
//! dependent-view gate; none of them holds session state of its own.

pub mod navigation;
pub mod workflows;

pub use navigation::{AccountArea, NavAction, NavLink, NavigationModel};
pub use workflows::WorkflowsView;
