pub mod features;
pub mod fetcher;
pub mod http;
pub mod index;

pub use features::HtmlFeatureExtractor;
pub use fetcher::ReplayFetcher;
pub use http::ArchiveClient;
pub use index::CdxIndex;
