pub mod calibration;
pub mod cli;
pub mod config;
pub mod http_client;
pub mod model;
pub mod no_vig;
pub mod normalize;
pub mod pipeline;
pub mod predict;
pub mod resolve;
pub mod snapshot;
pub mod store;
pub mod training;
