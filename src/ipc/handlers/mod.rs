pub mod adddrop;
pub mod catalog;
pub mod core;
pub mod enrollment;
pub mod grading;
pub mod maintenance;
pub mod session;
pub mod setup;
pub mod slabs;
