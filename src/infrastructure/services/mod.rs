//! Application services

mod experiment_result_service;

pub use experiment_result_service::ExperimentResultService;
