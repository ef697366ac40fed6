pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use claims::{Claims, QuizAccessClaims, UserRole, QUIZ_ACCESS_TOKEN_TYPE};
pub use jwt::JwtService;
pub use middleware::{AuthMiddleware, AuthenticatedUser};
pub use password::{hash_password, verify_credential, CredentialCheck};
pub use utils::attempt_viewer;
