//! View model for the template cards shown by the scaffolder's template
//! picker.

mod card;
mod links;

pub use card::CardSections;
pub use card::NO_DESCRIPTION;
pub use card::TASK_CREATE_PERMISSION;
pub use card::TemplateCard;
pub use card::TemplateCardOptions;
pub use links::CardLink;
pub use links::FALLBACK_ICON;
pub use links::IconResolver;
