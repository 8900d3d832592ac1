pub mod core;
pub mod features;
pub mod grades;
pub mod notify;
