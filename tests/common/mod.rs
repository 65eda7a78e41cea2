#![allow(dead_code)]

pub use autoapply_test_utils::builders;
pub use autoapply_test_utils::{CaptureSink, free_port, init_tracing, with_timeout};

use std::error::Error;

pub type TestResult = Result<(), Box<dyn Error>>;
