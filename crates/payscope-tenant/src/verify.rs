use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use payscope_core::error::PayScopeError;
use uuid::Uuid;

use crate::claims::TokenClaims;

/// Verifies signed bearer tokens against the platform's rotating public
/// key. One `TokenVerifier` is built per process from `TOKEN_PUBLIC_KEY`
/// and reused across requests; key rotation means restarting the process
/// (or, in a future revision, refreshing the key on a schedule).
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// `public_key_pem` is an RS256 public key in PEM form, per
    /// `spec.md` §6 ("rotating asymmetric key pair").
    pub fn from_pem(public_key_pem: &str) -> Result<Self, PayScopeError> {
        let decoding_key =
            DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| PayScopeError::Configuration {
                detail: format!("invalid TOKEN_PUBLIC_KEY: {e}"),
            })?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Decodes and verifies `token`, returning its claims if the signature
    /// and expiration are valid.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, PayScopeError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| PayScopeError::AuthError {
                reason: e.to_string(),
            })
    }
}

/// Enforces that the `X-Bank-Id` header equals the token's `bank_id`
/// (spec.md §4.9 / §6). Any mismatch is rejected before a tenant context
/// is ever constructed.
pub fn check_tenant_header(claims: &TokenClaims, header_bank_id: Uuid) -> Result<(), PayScopeError> {
    if claims.bank_id != header_bank_id {
        return Err(PayScopeError::TenantMismatch {
            token_bank_id: claims.bank_id,
            header_bank_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/test_rsa_private.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../testdata/test_rsa_public.pem");

    fn sign(claims: &TokenClaims) -> String {
        let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
    }

    #[test]
    fn verifies_well_formed_token() {
        let verifier = TokenVerifier::from_pem(TEST_PUBLIC_KEY).unwrap();
        let claims = TokenClaims {
            sub: "analyst-1".to_string(),
            role: Role::Analyst,
            bank_id: Uuid::new_v4(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
        };
        let token = sign(&claims);
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.bank_id, claims.bank_id);
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::from_pem(TEST_PUBLIC_KEY).unwrap();
        let claims = TokenClaims {
            sub: "analyst-1".to_string(),
            role: Role::Analyst,
            bank_id: Uuid::new_v4(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp(),
        };
        let token = sign(&claims);
        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err.error_class(), "auth_error");
    }

    #[test]
    fn tenant_header_mismatch_is_rejected() {
        let claims = TokenClaims {
            sub: "analyst-1".to_string(),
            role: Role::Analyst,
            bank_id: Uuid::new_v4(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
        };
        let err = check_tenant_header(&claims, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.error_class(), "tenant_mismatch");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::claims::Role;
    use proptest::prelude::*;

    fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    proptest! {
        /// `check_tenant_header` accepts exactly the header that equals
        /// the token's own `bank_id`, and rejects every other value
        /// (spec.md §4.9 / §6) — never a programming-error escape hatch.
        #[test]
        fn accepts_iff_header_matches_token_bank_id(token_bank_id in arb_uuid(), header_bank_id in arb_uuid()) {
            let claims = TokenClaims {
                sub: "analyst-1".to_string(),
                role: Role::Analyst,
                bank_id: token_bank_id,
                exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
            };
            let result = check_tenant_header(&claims, header_bank_id);
            prop_assert_eq!(result.is_ok(), token_bank_id == header_bank_id);
        }
    }
}
