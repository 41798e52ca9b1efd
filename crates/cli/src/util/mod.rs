pub mod target_url;
