// SPDX-License-Identifier: LGPL-3.0-only
//! Icon resolution services for npicon.
//!
//! See [`icon::IconService`] for the entry point and [`settings::IconSettings`]
//! for configuration.

pub mod icon;
pub mod settings;

pub use icon::{IconError, IconEvent, IconImage, IconRequest, IconService, IconStats, LoaderState, SlotId, SlotUpdate};
pub use settings::IconSettings;
