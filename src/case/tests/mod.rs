//! Tests for the case/task lifecycle engines.

mod support;

mod case_lifecycle_tests;
mod reconcile_tests;
mod task_lifecycle_tests;
