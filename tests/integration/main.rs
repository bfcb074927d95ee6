#![allow(clippy::expect_used)]

mod common;
mod cycle_test;
mod failure_test;
mod notify_test;
