pub mod devices;
pub mod extensions;
pub mod interfaces;
pub mod lines;
pub mod object_changes;
pub mod partitions;
