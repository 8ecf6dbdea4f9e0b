use uuid::Uuid;

use crate::error::AgriError;
use crate::types::Role;

/// The authenticated caller. Built from validated JWT claims at the server
/// boundary — core logic never reads raw tokens and there is no implicit or
/// thread-local identity anywhere.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn from_claims(claims: &AuthClaims) -> Result<Self, AgriError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AgriError::Unauthorized("malformed sub claim".into()))?;
        let role = Role::parse(&claims.role)
            .ok_or_else(|| AgriError::Unauthorized(format!("unknown role '{}'", claims.role)))?;
        Ok(Self {
            user_id,
            name: claims.name.clone().unwrap_or_default(),
            role,
        })
    }

    /// Construct explicitly for in-process callers (tests, seed tooling).
    pub fn in_process(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            name: String::new(),
            role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require_role(&self, role: Role) -> Result<(), AgriError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AgriError::Forbidden(format!(
                "{} role required, caller is {}",
                role, self.role
            )))
        }
    }

    /// Some surfaces (recommendation lookup) are shared between roles.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), AgriError> {
        if roles.iter().any(|r| self.has_role(*r)) {
            Ok(())
        } else {
            Err(AgriError::Forbidden(format!(
                "caller role {} not permitted",
                self.role
            )))
        }
    }
}

/// JWT claims shape. Minted at login, deserialised by the server middleware.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AuthClaims {
    /// User id, stringified UUID.
    pub sub: String,
    pub role: String,
    pub name: Option<String>,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> AuthClaims {
        AuthClaims {
            sub: sub.to_string(),
            role: role.to_string(),
            name: Some("Asha".to_string()),
            exp: 4_102_444_800, // far future
        }
    }

    #[test]
    fn from_claims_happy_path() {
        let id = Uuid::new_v4();
        let p = Principal::from_claims(&claims(&id.to_string(), "FARMER")).unwrap();
        assert_eq!(p.user_id, id);
        assert_eq!(p.role, Role::Farmer);
        assert_eq!(p.name, "Asha");
    }

    #[test]
    fn from_claims_rejects_bad_sub() {
        let err = Principal::from_claims(&claims("not-a-uuid", "ADMIN")).unwrap_err();
        assert!(matches!(err, AgriError::Unauthorized(_)));
    }

    #[test]
    fn from_claims_rejects_unknown_role() {
        let id = Uuid::new_v4();
        let err = Principal::from_claims(&claims(&id.to_string(), "WIZARD")).unwrap_err();
        assert!(matches!(err, AgriError::Unauthorized(_)));
    }

    #[test]
    fn require_role_ok_and_err() {
        let p = Principal::in_process(Uuid::new_v4(), Role::Admin);
        assert!(p.require_role(Role::Admin).is_ok());
        let err = p.require_role(Role::Farmer).unwrap_err();
        assert!(matches!(err, AgriError::Forbidden(_)));
    }

    #[test]
    fn require_any_matches_either() {
        let p = Principal::in_process(Uuid::new_v4(), Role::Admin);
        assert!(p.require_any(&[Role::Farmer, Role::Admin]).is_ok());
        assert!(p.require_any(&[Role::Researcher]).is_err());
    }
}
