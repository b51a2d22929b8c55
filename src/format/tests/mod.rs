//! Tests for the ground truth file set.
//!
//! These tests write real file sets into temporary directories and read
//! them back.

mod roundtrip_tests;
