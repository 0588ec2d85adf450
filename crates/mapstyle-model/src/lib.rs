pub mod condition;
pub mod dataset;
pub mod error;
pub mod module;
pub mod patch;
pub mod table;
pub mod template;

pub use condition::{Condition, Operand, Operator};
pub use dataset::{ConfigVariant, Dataset, DatasetConfig};
pub use error::{ModelError, Result};
pub use module::{
    BuildingColorSettings, BuildingColorType, BuildingFilterSettings, BuildingShadowSettings,
    BuildingTransparencySettings, ColorGradientSettings, ColorRule, ColorRuleSettings, GroupItem,
    ModuleSettings, ModuleType, RangeFilterSetting, ShadowMode, StyleModule, SwitchDatasetSettings,
    SwitchGroupSettings, SwitchVisibilitySettings, TemplateSettings, TemplateUserSettings,
    VisibilityItem,
};
pub use patch::{Facet, Patch, expression_leaf, leaf_table};
pub use table::{ConditionTable, DEFAULT_EXPRESSION};
pub use template::{Template, TemplateLibrary};
