pub mod capability;
pub mod config;
pub mod orchestration;
pub mod planner;
pub mod rpc;
pub mod safety;
pub mod shared;
pub mod tools;
