pub mod http;

pub use http::HttpRecommendationClient;
