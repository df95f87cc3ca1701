pub mod analyzer;
pub mod parser;
pub mod vision;

pub use analyzer::{Analyzer, ANALYSIS_PROMPT};
pub use parser::{
    extract_confidence, extract_recommendations, extract_summary, parse_analysis,
    DEFAULT_CONFIDENCE, NO_RECOMMENDATIONS, NO_SUMMARY,
};
pub use vision::{VisionClient, VisionProvider};
