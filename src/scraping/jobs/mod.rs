mod feed_job;

pub use feed_job::FeedScrapeJob;
