mod events;
mod firebase;
mod provider;

pub use events::{AuthChange, AuthEvents, AuthSubscription};
pub use firebase::FirebaseProvider;
pub use provider::{Identity, IdentityProvider};
