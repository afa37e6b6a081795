//! Logging facilities for seqmodel.
//!
//! seqmodel uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("seqmodel=trace,seqmodel_core=debug")
//!     .init();
//! ```
//!
//! Every forwarded change event is logged at `trace` level under the target
//! of the layer that forwarded it. Full rebuilds (source replacement, new
//! map or filter functions) are logged at `debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal emission target. `Signal::emit` spans use the same name.
    pub const SIGNAL: &str = "seqmodel_core::signal";
    /// Array store target.
    pub const STORE: &str = "seqmodel::store";
    /// Flatten model target.
    pub const FLATTEN: &str = "seqmodel::flatten";
    /// Map model target.
    pub const MAP: &str = "seqmodel::map";
    /// Filter model target.
    pub const FILTER: &str = "seqmodel::filter";
    /// Selection model target.
    pub const SELECTION: &str = "seqmodel::selection";
}
