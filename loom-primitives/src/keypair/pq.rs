//! Post-quantum families over raw encoded keys.
//!
//! ML-KEM, ML-DSA, SLH-DSA, FN-DSA and Classic McEliece keys are carried as
//! the byte strings their standards define; identity is byte identity. This
//! module is the only place that touches the parameter-set specific types
//! of the backing crates.

use crate::rand::SecureRandom;
use crate::spec::{AsymKeySpec, FnDsaParams, McElieceParams, MlDsaParams, MlKemParams, SlhDsaParams};
use digest::{ExtendableOutput, Update, XofReader};
use loom_prelude::prelude::{LoomError, Result};
use sha3::{Digest, Sha3_256, Shake256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

macro_rules! with_ml_kem {
    ($params:expr, $m:ident => $body:expr) => {
        match $params {
            MlKemParams::MlKem512 => {
                use fips203::ml_kem_512 as $m;
                $body
            }
            MlKemParams::MlKem768 => {
                use fips203::ml_kem_768 as $m;
                $body
            }
            MlKemParams::MlKem1024 => {
                use fips203::ml_kem_1024 as $m;
                $body
            }
        }
    };
}

macro_rules! with_ml_dsa {
    ($params:expr, $m:ident => $body:expr) => {
        match $params {
            MlDsaParams::MlDsa44 => {
                use fips204::ml_dsa_44 as $m;
                $body
            }
            MlDsaParams::MlDsa65 => {
                use fips204::ml_dsa_65 as $m;
                $body
            }
            MlDsaParams::MlDsa87 => {
                use fips204::ml_dsa_87 as $m;
                $body
            }
        }
    };
}

macro_rules! with_slh_dsa {
    ($params:expr, $m:ident => $body:expr) => {
        match $params {
            SlhDsaParams::Sha2_128s => {
                use fips205::slh_dsa_sha2_128s as $m;
                $body
            }
            SlhDsaParams::Sha2_128f => {
                use fips205::slh_dsa_sha2_128f as $m;
                $body
            }
            SlhDsaParams::Shake128s => {
                use fips205::slh_dsa_shake_128s as $m;
                $body
            }
            SlhDsaParams::Shake128f => {
                use fips205::slh_dsa_shake_128f as $m;
                $body
            }
            SlhDsaParams::Sha2_256s => {
                use fips205::slh_dsa_sha2_256s as $m;
                $body
            }
            SlhDsaParams::Shake256s => {
                use fips205::slh_dsa_shake_256s as $m;
                $body
            }
        }
    };
}

macro_rules! with_mceliece {
    ($params:expr, $m:ident => $body:expr) => {
        match $params {
            McElieceParams::Cm348864 => {
                use pqcrypto_classicmceliece::mceliece348864 as $m;
                $body
            }
            McElieceParams::Cm348864f => {
                use pqcrypto_classicmceliece::mceliece348864f as $m;
                $body
            }
        }
    };
}

/// Domain-separation context passed to ML-DSA and SLH-DSA.
const SIGNING_CONTEXT: &[u8] = b"";

fn backend(operation: &str) -> impl Fn(&'static str) -> LoomError + '_ {
    move |message| LoomError::operation(operation, message)
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| {
        LoomError::InvalidKey(format!("{what}: expected {N} bytes, got {}", bytes.len()))
    })
}

fn fn_dsa_logn(params: FnDsaParams) -> u32 {
    match params {
        FnDsaParams::FnDsa512 => fn_dsa::FN_DSA_LOGN_512,
        FnDsaParams::FnDsa1024 => fn_dsa::FN_DSA_LOGN_1024,
    }
}

fn slh_dsa_n(params: SlhDsaParams) -> usize {
    match params {
        SlhDsaParams::Sha2_128s
        | SlhDsaParams::Sha2_128f
        | SlhDsaParams::Shake128s
        | SlhDsaParams::Shake128f => 16,
        SlhDsaParams::Sha2_256s | SlhDsaParams::Shake256s => 32,
    }
}

fn ml_kem_k(params: MlKemParams) -> usize {
    match params {
        MlKemParams::MlKem512 => 2,
        MlKemParams::MlKem768 => 3,
        MlKemParams::MlKem1024 => 4,
    }
}

/// Encoded (public, private) lengths.
pub(crate) fn key_lengths(spec: AsymKeySpec) -> Result<(usize, usize)> {
    Ok(match spec {
        AsymKeySpec::MlKem(params) => with_ml_kem!(params, m => (m::EK_LEN, m::DK_LEN)),
        AsymKeySpec::MlDsa(params) => with_ml_dsa!(params, m => (m::PK_LEN, m::SK_LEN)),
        AsymKeySpec::SlhDsa(params) => with_slh_dsa!(params, m => (m::PK_LEN, m::SK_LEN)),
        AsymKeySpec::FnDsa(params) => {
            let logn = fn_dsa_logn(params);
            (fn_dsa::vrfy_key_size(logn), fn_dsa::sign_key_size(logn))
        }
        AsymKeySpec::McEliece(params) => {
            with_mceliece!(params, m => (m::public_key_bytes(), m::secret_key_bytes()))
        }
        other => return Err(LoomError::unsupported(other)),
    })
}

/// Check an encoded key against the parameter set's length.
pub(crate) fn check_length(spec: AsymKeySpec, bytes: &[u8], private: bool) -> Result<()> {
    let (public_len, private_len) = key_lengths(spec)?;
    let expected = if private { private_len } else { public_len };
    if bytes.len() != expected {
        return Err(LoomError::InvalidKey(format!(
            "{spec} {} key must be {expected} bytes, got {}",
            if private { "private" } else { "public" },
            bytes.len()
        )));
    }
    Ok(())
}

/// Generate an encoded (public, private) pair.
pub(crate) fn generate(spec: AsymKeySpec, random: &SecureRandom) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    use fips203::traits::{KeyGen as _, SerDes as _};
    use fips204::traits::{KeyGen as _, SerDes as _};
    use fips205::traits::SerDes as _;
    use fn_dsa::KeyPairGenerator as _;
    use pqcrypto_traits::kem::{PublicKey as _, SecretKey as _};

    let mut rng = random.clone();
    match spec {
        AsymKeySpec::MlKem(params) => with_ml_kem!(params, m => {
            let (ek, dk) = m::KG::try_keygen_with_rng(&mut rng).map_err(backend("ML-KEM keygen"))?;
            Ok((ek.into_bytes().to_vec(), Zeroizing::new(dk.into_bytes().to_vec())))
        }),
        AsymKeySpec::MlDsa(params) => with_ml_dsa!(params, m => {
            let (pk, sk) = m::KG::try_keygen_with_rng(&mut rng).map_err(backend("ML-DSA keygen"))?;
            Ok((pk.into_bytes().to_vec(), Zeroizing::new(sk.into_bytes().to_vec())))
        }),
        AsymKeySpec::SlhDsa(params) => with_slh_dsa!(params, m => {
            let (pk, sk) = m::try_keygen_with_rng(&mut rng).map_err(backend("SLH-DSA keygen"))?;
            Ok((pk.into_bytes().to_vec(), Zeroizing::new(sk.into_bytes().to_vec())))
        }),
        AsymKeySpec::FnDsa(params) => {
            let logn = fn_dsa_logn(params);
            let mut sign_key = Zeroizing::new(vec![0u8; fn_dsa::sign_key_size(logn)]);
            let mut vrfy_key = vec![0u8; fn_dsa::vrfy_key_size(logn)];
            let mut generator = fn_dsa::KeyPairGeneratorStandard::default();
            generator.keygen(logn, &mut rng, &mut sign_key, &mut vrfy_key);
            Ok((vrfy_key, sign_key))
        }
        AsymKeySpec::McEliece(params) => with_mceliece!(params, m => {
            let (pk, sk) = m::keypair();
            Ok((pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec())))
        }),
        other => Err(LoomError::unsupported(other)),
    }
}

/// Whether an encoded private key belongs to an encoded public key.
///
/// ML-KEM, ML-DSA and SLH-DSA private keys embed (a hash of) the public key
/// and are checked structurally. FN-DSA and McEliece are checked with a
/// trial signature or encapsulation.
pub(crate) fn pair_valid(spec: AsymKeySpec, public: &[u8], private: &[u8], random: &SecureRandom) -> bool {
    if check_length(spec, public, false).is_err() || check_length(spec, private, true).is_err() {
        return false;
    }
    match spec {
        AsymKeySpec::MlKem(params) => {
            let offset = 384 * ml_kem_k(params);
            let end = offset + public.len();
            let embedded = &private[offset..end];
            let hash = Sha3_256::digest(public);
            bool::from(embedded.ct_eq(public)) && bool::from(private[end..end + 32].ct_eq(hash.as_slice()))
        }
        AsymKeySpec::MlDsa(_) => {
            let mut tr = [0u8; 64];
            let mut shake = Shake256::default();
            shake.update(public);
            shake.finalize_xof().read(&mut tr);
            bool::from(private[..32].ct_eq(&public[..32])) && bool::from(private[64..128].ct_eq(&tr))
        }
        AsymKeySpec::SlhDsa(params) => {
            let n = slh_dsa_n(params);
            bool::from(private[2 * n..4 * n].ct_eq(public))
        }
        AsymKeySpec::FnDsa(_) => {
            let probe = b"pairing";
            sign(spec, private, probe, random).map_or(false, |sig| {
                verify(spec, public, probe, &sig).unwrap_or(false)
            })
        }
        AsymKeySpec::McEliece(_) => match encapsulate(spec, public, random) {
            Ok((secret, ciphertext)) => decapsulate(spec, private, &ciphertext)
                .map_or(false, |recovered| bool::from(recovered.as_slice().ct_eq(secret.as_slice()))),
            Err(_) => false,
        },
        _ => false,
    }
}

/// Sign `message` with an encoded private key.
pub(crate) fn sign(spec: AsymKeySpec, private: &[u8], message: &[u8], random: &SecureRandom) -> Result<Vec<u8>> {
    use fips204::traits::{SerDes as _, Signer as _};
    use fips205::traits::{SerDes as _, Signer as _};
    use fn_dsa::SigningKey as _;

    check_length(spec, private, true)?;
    let mut rng = random.clone();
    match spec {
        AsymKeySpec::MlDsa(params) => with_ml_dsa!(params, m => {
            let bytes = Zeroizing::new(fixed::<{ m::SK_LEN }>(private, "ML-DSA private key")?);
            let key = m::PrivateKey::try_from_bytes(*bytes).map_err(backend("ML-DSA key decode"))?;
            let sig = key
                .try_sign_with_rng(&mut rng, message, SIGNING_CONTEXT)
                .map_err(backend("ML-DSA signing"))?;
            Ok(sig.to_vec())
        }),
        AsymKeySpec::SlhDsa(params) => with_slh_dsa!(params, m => {
            let bytes = Zeroizing::new(fixed::<{ m::SK_LEN }>(private, "SLH-DSA private key")?);
            let key = m::PrivateKey::try_from_bytes(&bytes).map_err(backend("SLH-DSA key decode"))?;
            let sig = key
                .try_sign_with_rng(&mut rng, message, SIGNING_CONTEXT, true)
                .map_err(backend("SLH-DSA signing"))?;
            Ok(sig.to_vec())
        }),
        AsymKeySpec::FnDsa(params) => {
            let mut key = fn_dsa::SigningKeyStandard::decode(private)
                .ok_or_else(|| LoomError::InvalidKey("malformed FN-DSA signing key".to_string()))?;
            let mut sig = vec![0u8; fn_dsa::signature_size(fn_dsa_logn(params))];
            key.sign(&mut rng, &fn_dsa::DOMAIN_NONE, &fn_dsa::HASH_ID_RAW, message, &mut sig);
            Ok(sig)
        }
        other => Err(LoomError::unsupported(other)),
    }
}

/// Verify a signature under an encoded public key. A signature of the wrong
/// size simply fails.
pub(crate) fn verify(spec: AsymKeySpec, public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
    use fips204::traits::{SerDes as _, Verifier as _};
    use fips205::traits::{SerDes as _, Verifier as _};
    use fn_dsa::VerifyingKey as _;

    check_length(spec, public, false)?;
    match spec {
        AsymKeySpec::MlDsa(params) => with_ml_dsa!(params, m => {
            let key = m::PublicKey::try_from_bytes(fixed::<{ m::PK_LEN }>(public, "ML-DSA public key")?)
                .map_err(backend("ML-DSA key decode"))?;
            Ok(match <[u8; m::SIG_LEN]>::try_from(signature) {
                Ok(sig) => key.verify(message, &sig, SIGNING_CONTEXT),
                Err(_) => false,
            })
        }),
        AsymKeySpec::SlhDsa(params) => with_slh_dsa!(params, m => {
            let key = m::PublicKey::try_from_bytes(&fixed::<{ m::PK_LEN }>(public, "SLH-DSA public key")?)
                .map_err(backend("SLH-DSA key decode"))?;
            Ok(match <[u8; m::SIG_LEN]>::try_from(signature) {
                Ok(sig) => key.verify(message, &sig, SIGNING_CONTEXT),
                Err(_) => false,
            })
        }),
        AsymKeySpec::FnDsa(_) => {
            let key = fn_dsa::VerifyingKeyStandard::decode(public)
                .ok_or_else(|| LoomError::InvalidKey("malformed FN-DSA verifying key".to_string()))?;
            Ok(key.verify(signature, &fn_dsa::DOMAIN_NONE, &fn_dsa::HASH_ID_RAW, message))
        }
        other => Err(LoomError::unsupported(other)),
    }
}

/// Encapsulate to an encoded public key: (shared secret, ciphertext).
pub(crate) fn encapsulate(
    spec: AsymKeySpec,
    public: &[u8],
    random: &SecureRandom,
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    use fips203::traits::{Encaps as _, SerDes as _};
    use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SharedSecret as _};

    check_length(spec, public, false)?;
    let mut rng = random.clone();
    match spec {
        AsymKeySpec::MlKem(params) => with_ml_kem!(params, m => {
            let key = m::EncapsKey::try_from_bytes(fixed::<{ m::EK_LEN }>(public, "ML-KEM public key")?)
                .map_err(|e| LoomError::invalid_key("ML-KEM public key", e))?;
            let (secret, ciphertext) =
                key.try_encaps_with_rng(&mut rng).map_err(backend("ML-KEM encapsulation"))?;
            Ok((Zeroizing::new(secret.into_bytes().to_vec()), ciphertext.into_bytes().to_vec()))
        }),
        AsymKeySpec::McEliece(params) => with_mceliece!(params, m => {
            let key = m::PublicKey::from_bytes(public)
                .map_err(|e| LoomError::invalid_key("McEliece public key", format!("{e:?}")))?;
            let (secret, ciphertext) = m::encapsulate(&key);
            Ok((Zeroizing::new(secret.as_bytes().to_vec()), ciphertext.as_bytes().to_vec()))
        }),
        other => Err(LoomError::unsupported(other)),
    }
}

/// Recover the shared secret from a ciphertext with an encoded private key.
pub(crate) fn decapsulate(spec: AsymKeySpec, private: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    use fips203::traits::{Decaps as _, SerDes as _};
    use pqcrypto_traits::kem::{Ciphertext as _, SecretKey as _, SharedSecret as _};

    check_length(spec, private, true)?;
    match spec {
        AsymKeySpec::MlKem(params) => with_ml_kem!(params, m => {
            let bytes = Zeroizing::new(fixed::<{ m::DK_LEN }>(private, "ML-KEM private key")?);
            let key = m::DecapsKey::try_from_bytes(*bytes)
                .map_err(|e| LoomError::invalid_key("ML-KEM private key", e))?;
            let ciphertext = <[u8; m::CT_LEN]>::try_from(ciphertext)
                .map_err(|_| LoomError::DataLength(format!("ML-KEM ciphertext must be {} bytes", m::CT_LEN)))?;
            let ciphertext = m::CipherText::try_from_bytes(ciphertext)
                .map_err(|e| LoomError::parse("ML-KEM ciphertext", e))?;
            let secret = key.try_decaps(&ciphertext).map_err(backend("ML-KEM decapsulation"))?;
            Ok(Zeroizing::new(secret.into_bytes().to_vec()))
        }),
        AsymKeySpec::McEliece(params) => with_mceliece!(params, m => {
            let key = m::SecretKey::from_bytes(private)
                .map_err(|e| LoomError::invalid_key("McEliece private key", format!("{e:?}")))?;
            let ciphertext = m::Ciphertext::from_bytes(ciphertext)
                .map_err(|e| LoomError::DataLength(format!("McEliece ciphertext: {e:?}")))?;
            let secret = m::decapsulate(&ciphertext, &key);
            Ok(Zeroizing::new(secret.as_bytes().to_vec()))
        }),
        other => Err(LoomError::unsupported(other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_ml_kem_roundtrip_and_structure() {
        let random = SecureRandom::new().unwrap();
        for params in [MlKemParams::MlKem512, MlKemParams::MlKem768, MlKemParams::MlKem1024] {
            let spec = AsymKeySpec::MlKem(params);
            let (pk, sk) = generate(spec, &random).unwrap();
            assert!(pair_valid(spec, &pk, &sk, &random));
            let (secret, ct) = encapsulate(spec, &pk, &random).unwrap();
            assert_eq!(*decapsulate(spec, &sk, &ct).unwrap(), *secret);

            let (other_pk, _) = generate(spec, &random).unwrap();
            assert!(!pair_valid(spec, &other_pk, &sk, &random));
        }
    }

    #[test]
    fn test_ml_dsa_sign_verify() {
        let random = SecureRandom::new().unwrap();
        let spec = AsymKeySpec::MlDsa(MlDsaParams::MlDsa44);
        let (pk, sk) = generate(spec, &random).unwrap();
        assert!(pair_valid(spec, &pk, &sk, &random));
        let sig = sign(spec, &sk, b"lattice", &random).unwrap();
        assert!(verify(spec, &pk, b"lattice", &sig).unwrap());
        assert!(!verify(spec, &pk, b"lattice!", &sig).unwrap());
        assert!(!verify(spec, &pk, b"lattice", &sig[..10]).unwrap());
    }

    #[test]
    fn test_slh_dsa_structure_check() {
        let random = SecureRandom::new().unwrap();
        let spec = AsymKeySpec::SlhDsa(SlhDsaParams::Shake128f);
        let (pk, sk) = generate(spec, &random).unwrap();
        assert!(pair_valid(spec, &pk, &sk, &random));
        let mut tampered = pk.clone();
        tampered[0] ^= 1;
        assert!(!pair_valid(spec, &tampered, &sk, &random));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let random = SecureRandom::new().unwrap();
        let spec = AsymKeySpec::MlKem(MlKemParams::MlKem512);
        assert!(matches!(
            encapsulate(spec, &[0u8; 10], &random),
            Err(LoomError::InvalidKey(_))
        ));
    }
}
