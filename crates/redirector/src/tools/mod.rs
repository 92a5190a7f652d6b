pub mod format_links;
pub mod get_links;
