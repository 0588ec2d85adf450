//! Override composition for dataset style modules.
//!
//! Modules are flattened, split into active and inactive sets, turned into
//! JSON fragments, and deep-merged into the single patch the renderer
//! applies. Everything here is synchronous and never fails.

pub mod cleanse;
pub mod color;
pub mod compose;
pub mod condition;
pub mod context;
pub mod flatten;
pub mod fragment;
pub mod merge;
pub mod tables;

pub use cleanse::{cleanse_for_type, cleanse_fragment, removal_cleanse};
pub use color::{DEFAULT_COLOR, Rgba, apply_transparency, rewrite_alpha, transparency_alpha};
pub use compose::{Composition, compose};
pub use condition::{attribute_ref, compile_condition, compile_range, numeric_attribute};
pub use context::{AttributeDomain, FragmentContext};
pub use flatten::{
    Activation, MAX_TEMPLATE_DEPTH, flatten, is_module_active, partition_modules,
    resolve_activation,
};
pub use fragment::{FragmentHandler, HANDLERS, fragment_for, handler_for};
pub use merge::{MergeModule, MergePass, merge_into, merge_overrides, merged, switch_dataset_patch};
