pub mod config;
pub mod controller;
pub mod error;
pub mod overlay;
pub mod quick_query;
pub mod resolver;
pub mod store;
pub mod transport;
pub mod view;

pub use config::{load_settings, ChatSettings, ResolverKind};
pub use controller::{
    RejectReason, ResolverFailurePolicy, SessionController, SessionEvent, SessionPhase,
    SubmitOutcome,
};
pub use error::{ConfigError, FailureCategory, ResolveError, SessionError, StoreError};
pub use overlay::{argo_overlay, MapOverlay};
pub use quick_query::{QuickQueryProvider, QUICK_QUERIES};
pub use resolver::{CannedResolver, MissingQueryBackend, QueryResolver, RESPONSE_TEMPLATES};
pub use store::{MessageDraft, MessageStore, StoreSnapshot};
pub use transport::HttpQueryResolver;
pub use view::ViewState;

pub const WELCOME_MESSAGE: &str = "Welcome to Float Chat! I can help you explore ARGO oceanographic data. Try asking me about salinity profiles, temperature data, or BGC parameters from specific regions and time periods.";
pub const LOADING_LABEL: &str = "Processing oceanographic data...";
pub const INPUT_PLACEHOLDER: &str =
    "Ask about ARGO float data, CTD profiles, salinity, temperature, or BGC parameters...";
