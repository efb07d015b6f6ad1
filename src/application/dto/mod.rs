pub mod bookmark_json;
