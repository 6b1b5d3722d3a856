//! Sliding window rate limiting.

mod clock;
mod gate;
mod key;
mod limiter;
mod rules;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::RateLimiter;
pub use key::{RateLimitKey, DEFAULT_NAMESPACE};
pub use limiter::{evaluate, ErrorCode, RateLimitOutcome, TOO_MANY_REQUESTS};
pub use rules::{IdentityOverride, RateLimitRules, ResolvedLimit, ScopeRule};
pub use window::{window_threshold, SlidingWindow, BUCKET_TTL, WINDOW_SECONDS};
