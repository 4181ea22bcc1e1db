//! Behavioural test suites for the session engine.

mod behaviour;
