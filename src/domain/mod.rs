pub mod force;
pub mod holidays;
pub mod mapping;
pub mod models;
pub mod overrides;
pub mod stacks;
pub mod week;
pub mod zodiac;
