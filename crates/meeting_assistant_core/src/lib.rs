pub mod accounts;
pub mod domain;
pub mod error;
pub mod guard;
pub mod password;
pub mod ports;
pub mod session;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod testing;

pub use accounts::AccountsClient;
pub use domain::{
    OAuthProvider, Preferences, Registration, RegistrationReceipt, Session, User, WorkDay,
    WorkingHours,
};
pub use error::{AuthError, AuthResult, FormField};
pub use guard::{Navigation, RouteAccess, RouteGuard};
pub use password::{evaluate as evaluate_password, PasswordStrength, StrengthLabel};
pub use ports::{
    ApiRequest, ApiResponse, HttpTransport, Method, PortError, PortResult, TokenStore, UserSource,
};
pub use session::{RetryableRequest, SessionManager};
pub use storage::{MemoryStore, SessionState, SessionStorage};
