pub mod admission;
pub mod auth;
pub mod config;
pub mod counter;
pub mod metrics;
pub mod quota;
pub mod registry;
pub mod testing;
pub mod token;

pub use admission::{
    Admission, AdmissionError, AdmissionService, TicketChanges, TicketDraft,
};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    TrustedHeaderAuthenticator, USER_ID_HEADER,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AdmissionConfig, AuthConfig,
    AuthMethod, CacheBackend, CacheConfig, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use counter::{CounterError, CounterStore, MemoryCounterStore, RedisCounterStore};
pub use quota::{QuotaError, QuotaLedger, Reservation};
pub use registry::{
    NewRegistrant, NewTicket, Registrant, RegistrantPage, RegistrantStore, RegistryError,
    SqliteRegistry, Ticket, TicketMode, TicketStore, UserId,
};
pub use token::{generate_token, TokenError, TokenIssuer, TokenPurpose};
