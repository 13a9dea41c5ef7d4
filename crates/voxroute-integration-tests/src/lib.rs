//! End-to-end integration tests for VoxRoute
//!
//! The tests under `tests/` wire ingress, routing, cache and egress together
//! against mocked ElevenLabs and key-value services.
