//! Integration tests for the WebObs server.

mod helpers;
mod page_test;
mod ws_test;
