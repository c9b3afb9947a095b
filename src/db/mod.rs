//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const GUIDES: &str = "guides";
    pub const TOURS: &str = "tours";
    pub const RESERVATIONS: &str = "reservations";
    pub const REVIEWS: &str = "reviews";
}
