pub mod paths;
pub mod time;
