//! Unit tests for artifact storage and the metadata ledger

mod artifacts_test;
mod ledger_test;
