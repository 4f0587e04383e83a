pub mod fixture;
pub mod rss;
