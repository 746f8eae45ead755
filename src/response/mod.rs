pub mod chart;
pub mod composer;
pub mod format;
pub mod template;

pub use chart::{ChartPayload, ChartRenderer};
pub use composer::{Composition, ResponseComposer, UserResponse, DEFAULT_MAX_DISPLAY_ROWS};
