#![warn(missing_docs)]

//! Non-blocking icon resolution and caching for file-browsing UIs.

pub use npicon_services as services;

/// A "prelude" for users of npicon.
///
/// Importing this module brings into scope the types needed to request
/// icons and receive them.
///
/// ```rust
/// use npicon::prelude::*;
/// ```
pub mod prelude {
    pub use crate::services::icon::{
        ExtractionGateway, IconError, IconEvent, IconImage, IconRequest, IconService,
        IconStats, LoaderState, PreloadReport, ShellIconGateway, SlotId, SlotSink, SlotUpdate,
    };
    pub use crate::services::settings::IconSettings;

    // Runtime
    pub use tokio::sync::mpsc::unbounded_channel as slot_channel;
}
