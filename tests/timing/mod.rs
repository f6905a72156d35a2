//! Tests that the measured interval covers the concurrent work and nothing else

pub mod overlap;
