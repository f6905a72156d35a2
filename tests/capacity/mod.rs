//! Tests for pools that cannot run every worker at once
