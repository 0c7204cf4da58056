use serde::Serialize;

use indica_events::Notification;

use crate::role::RoleState;
use crate::session::Identity;

/// Published by the session store whenever the signed-in identity changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionChanged {
    pub generation: u64,
    pub identity: Option<Identity>,
}

impl Notification for SessionChanged {
    fn kind(&self) -> &'static str {
        "auth.session.changed"
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// Published by the role resolver whenever its state for a generation moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleChanged {
    pub generation: u64,
    pub state: RoleState,
}

impl Notification for RoleChanged {
    fn kind(&self) -> &'static str {
        "auth.role.changed"
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
