pub mod classifier;
pub mod context;
pub mod engine;
pub mod orchestrator;
pub mod reducer;
pub mod resolver;
pub mod states;

pub use classifier::{
    Classification, ClassificationSource, IntentClassifier, IntentRule, DEFAULT_RULES,
};
pub use context::{QueryRequest, RequestContext};
pub use engine::{RoutingEngine, RoutingTransitionError};
pub use orchestrator::{Answer, Orchestrator};
pub use reducer::{reduce, Responses};
pub use resolver::IdentityResolver;
pub use states::{RoutingAction, RoutingEvent, RoutingState, TransitionOutcome};
