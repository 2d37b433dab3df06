pub mod bootstrap;
pub mod commands;
pub mod glide;
pub mod search;
