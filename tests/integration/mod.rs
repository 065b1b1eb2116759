//! Integration tests for the dirmirror live tree mirror

mod fan_out;
mod root_switch;
mod test_utils;
mod tree_structure;
mod watcher;
