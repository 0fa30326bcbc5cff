pub mod http_client;
pub mod output_file;

pub use http_client::ReqwestCatalogFetcher;
pub use output_file::FsArtifactStore;
