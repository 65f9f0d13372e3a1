pub mod activity;
pub mod error;
pub mod job_poller;
pub mod pipeline_controller;
pub mod pipeline_logger;
pub mod pipeline_state;
