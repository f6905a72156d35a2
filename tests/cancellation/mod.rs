//! Tests for cancelled coordinators and cancelled workers
