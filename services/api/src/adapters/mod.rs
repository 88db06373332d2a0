pub mod llm;
pub mod pdf;
pub mod prompts;
pub mod solution_link;

pub use llm::OpenAiGateway;
pub use pdf::PdfTextExtractor;
pub use solution_link::{CachedLinkFinder, WebSolutionLinkFinder};
