use crate::{Liker, STUB_UUID};

use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

/// Locally generated identifier of an unauthenticated visitor
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GuestId(pub Uuid);

impl GuestId {
    pub fn stub() -> GuestId {
        GuestId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Guest {
    pub id: GuestId,

    /// Nickname remembered from the last submission, if any
    pub nickname: Option<String>,
}

impl Guest {
    pub fn generate() -> Guest {
        Guest {
            id: GuestId(Uuid::new_v4()),
            nickname: None,
        }
    }
}

/// Whoever is performing an operation
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Actor {
    Registered(UserId),
    Guest(Guest),
}

impl Actor {
    pub fn liker(&self) -> Liker {
        match self {
            Actor::Registered(user) => Liker::User(*user),
            Actor::Guest(guest) => Liker::Guest(guest.id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Registered(user) => Some(*user),
            Actor::Guest(_) => None,
        }
    }
}
