//! Read and validate job request messages

/// Valid JSON messages are deserialised into a typed job request
pub mod message;

/// Load and compile the job request JSON schemas
pub mod schema;
