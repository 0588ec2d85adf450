//! Condition table generators.
//!
//! Every generator returns a [`mapstyle_model::ConditionTable`], which always
//! ends with the unconditional default row.

mod categorical;
mod filter;
mod gradient;
mod range;

pub use categorical::{
    BUILDING_PURPOSE, BUILDING_PURPOSE_ATTRIBUTE, BUILDING_STRUCTURE, BUILDING_STRUCTURE_ATTRIBUTE,
    CategoryColor, categorical_table,
};
pub use filter::{combine_filters, compile_range_filter, filter_table};
pub use gradient::{MAX_GRADIENT_STEPS, gradient, gradient_color_table, gradient_domain, gradient_table};
pub use range::{
    DEFAULT_MISSING_VALUE, FLOOD_RANK, HEIGHT_ATTRIBUTE, HEIGHT_BANDS, RangeColor,
    numeric_range_table,
};
