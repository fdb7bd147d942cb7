pub mod aggregator;
pub mod candidate;
pub mod context;
pub mod downloader;
pub mod error;
pub mod events;
pub mod extractor;
pub mod fetcher;
pub mod validator;

pub use aggregator::aggregate;
pub use candidate::{
    quality_from_json, CandidateRecord, ContainerFormat, DownloadRequest, ExtractionMethod,
    PLACEHOLDER_TITLE,
};
pub use context::ExtractionContext;
pub use downloader::Downloader;
pub use error::{DecodeError, ExtractError, FetchError, StrategyError};
pub use events::ExtractionEvent;
pub use extractor::{ExtractionEngine, ExtractionReport, Strategy, StrategyKind, StrategyReport};
pub use fetcher::{resolve_locator, FetchOptions, FetchedPage, Fetcher, RequestFlavor};
pub use validator::{classify_format, estimate_quality, is_valid_candidate, ValidationRules};
