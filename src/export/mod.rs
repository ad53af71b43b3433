pub mod json;

pub use json::{CardSnapshot, export_json_to_path, import_json, import_json_for_user};
