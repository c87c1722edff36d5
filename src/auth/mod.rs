pub mod claims;
pub mod context;
pub mod guard;
pub mod middleware;
pub mod tokens;

pub use claims::Claims;
pub use context::AuthContext;
pub use guard::{authorize, Access};
pub use middleware::{RequireAdmin, RequireAuth};
pub use tokens::{TokenError, TokenService, TOKEN_COOKIE};
