/// Rig construction: small tier geometries and recording ports.
pub mod harness;
