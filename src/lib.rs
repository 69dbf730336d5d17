pub mod config;
pub mod pose;
pub mod projection;
pub mod render;
pub mod scene;
pub mod tracker;
pub mod transform;
