pub mod fcm;
pub mod firestore;
pub mod iid;
pub mod oauth;

pub use fcm::{FcmClient, PushSender};
pub use firestore::{FirestoreDirectory, RecipientDirectory};
pub use iid::{IidClient, SubscriptionOutcome, SubscriptionRegistrar};
pub use oauth::{AccessToken, CredentialProvider, ServiceAccountCredentials, ServiceAccountKey};
