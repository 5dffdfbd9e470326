pub mod logging;
pub mod ndjson;

pub use logging::truncate_text;
pub use ndjson::to_ndjson_line;
