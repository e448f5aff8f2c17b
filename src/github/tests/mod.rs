//! Unit tests for cursor pagination.
