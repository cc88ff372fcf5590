//! Result records produced by the analyzer
//!
//! All records are plain serde structures; callers choose the wire format.

mod analysis;
mod deep;

pub use analysis::{AnalysisResult, HeadingCounts, LinkStatus};
pub use deep::{
    is_proper_header_structure, AccessibilitySignals, ContentAnalysis, CookieProfile,
    DeepAnalysisResult, HeaderStructure, ImageAnalysis, LinkProfile, MediaCounts, MetaTags,
    MobileFlags, PerformanceMetrics, SchemaFormat, SchemaMarkup, SecurityFlags, SeoAnalysis,
    SocialSignals, TechnologyFingerprint,
};
