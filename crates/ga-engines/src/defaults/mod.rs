//! The two standard policy bundles a `Factory` embeds and delegates to,
//! per the composition-over-virtual-inheritance design note in §9.

mod multi;
mod single;

pub use multi::MultiObjectiveDefaults;
pub use single::SingleObjectiveDefaults;
