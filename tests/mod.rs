mod common;
mod pipeline_tests;
mod reducer_tests;
mod retry_tests;
