pub mod about;
pub mod binding_sites;
pub mod design;
pub mod diagnostics;
pub mod error;
pub mod parameters;
pub mod primer3_input;
pub mod primer3_output;
pub mod primer3_runner;
pub mod report_export;
pub mod sequence_template;
pub mod session;
pub mod task;
