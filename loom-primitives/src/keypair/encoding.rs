//! PKCS#8 and SubjectPublicKeyInfo encodings for every family.
//!
//! RSA, DSA and the curve families go through the `pkcs8`/`spki` traits
//! their crates implement. Diffie-Hellman uses the PKCS#3 `dhKeyAgreement`
//! layout, the RFC 8410 curves wrap the raw key in an OCTET STRING, and the
//! post-quantum and XMSS families place their standard byte encoding
//! directly in the key field.
//!
//! Decoding always reports the spec found in the encoding so the generator
//! can reject keys of another family or parameter set.

use super::ec;
use super::ffc::{DhDomain, DhPrivateKey, DhPublicKey};
use super::pq;
use super::{PrivateKey, PublicKey};
use crate::spec::{
    AsymKeySpec, EcCurve, FfcParams, FnDsaParams, McElieceParams, MlDsaParams, MlKemParams,
    RsaModulus, SlhDsaParams, XmssDigest, XmssHeight, XmssMtHeight,
};
use crate::xmss::{XmssParams, XmssPrivateKey, XmssPublicKey};
use der::asn1::{AnyRef, BitStringRef, ObjectIdentifier, OctetStringRef, UintRef};
use der::{Decode, Encode, Sequence};
use loom_prelude::prelude::{LoomError, Result};
use num_bigint_dig::BigUint;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, PrivateKeyInfo};
use rsa::traits::PublicKeyParts;
use spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use zeroize::Zeroizing;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
const DH_KEY_AGREEMENT: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.3.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");
const SM2P256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");
const ID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");
const ID_X448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.111");
const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const ID_XMSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.6.34");
const ID_XMSS_MT: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.6.35");

const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const ID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");
const ID_SHAKE128: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.11");
const ID_SHAKE256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.12");

/// Post-quantum families identified by OID alone.
const PQ_OIDS: [(AsymKeySpec, ObjectIdentifier); 16] = [
    (AsymKeySpec::MlKem(MlKemParams::MlKem512), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.4.1")),
    (AsymKeySpec::MlKem(MlKemParams::MlKem768), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.4.2")),
    (AsymKeySpec::MlKem(MlKemParams::MlKem1024), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.4.3")),
    (AsymKeySpec::MlDsa(MlDsaParams::MlDsa44), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.17")),
    (AsymKeySpec::MlDsa(MlDsaParams::MlDsa65), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.18")),
    (AsymKeySpec::MlDsa(MlDsaParams::MlDsa87), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.19")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Sha2_128s), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.20")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Sha2_128f), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.21")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Sha2_256s), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.24")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Shake128s), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.26")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Shake128f), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.27")),
    (AsymKeySpec::SlhDsa(SlhDsaParams::Shake256s), ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.30")),
    (AsymKeySpec::FnDsa(FnDsaParams::FnDsa512), ObjectIdentifier::new_unwrap("1.3.9999.3.11")),
    (AsymKeySpec::FnDsa(FnDsaParams::FnDsa1024), ObjectIdentifier::new_unwrap("1.3.9999.3.14")),
    (AsymKeySpec::McEliece(McElieceParams::Cm348864), ObjectIdentifier::new_unwrap("1.3.6.1.4.1.22554.5.1.1")),
    (AsymKeySpec::McEliece(McElieceParams::Cm348864f), ObjectIdentifier::new_unwrap("1.3.6.1.4.1.22554.5.1.2")),
];

const CURVE_OIDS: [(EcCurve, ObjectIdentifier); 4] = [
    (EcCurve::Secp256r1, SECP256R1),
    (EcCurve::Secp384r1, SECP384R1),
    (EcCurve::Secp256k1, SECP256K1),
    (EcCurve::Sm2p256v1, SM2P256V1),
];

const XMSS_DIGEST_OIDS: [(XmssDigest, ObjectIdentifier); 4] = [
    (XmssDigest::Sha256, ID_SHA256),
    (XmssDigest::Sha512, ID_SHA512),
    (XmssDigest::Shake128, ID_SHAKE128),
    (XmssDigest::Shake256, ID_SHAKE256),
];

/// PKCS#3 `DHParameter`.
#[derive(Sequence)]
struct DhParameter<'a> {
    prime: UintRef<'a>,
    base: UintRef<'a>,
    #[asn1(optional = "true")]
    private_value_length: Option<u32>,
}

/// Tree shape carried in the XMSS AlgorithmIdentifier parameters.
#[derive(Sequence)]
struct XmssAlgorithmParams {
    height: u32,
    layers: u32,
    digest: ObjectIdentifier,
}

fn pq_oid(spec: AsymKeySpec) -> Result<ObjectIdentifier> {
    PQ_OIDS
        .iter()
        .find(|(candidate, _)| *candidate == spec)
        .map(|(_, oid)| *oid)
        .ok_or_else(|| LoomError::unsupported(spec))
}

fn curve_from_oid(oid: ObjectIdentifier) -> Result<EcCurve> {
    CURVE_OIDS
        .iter()
        .find(|(_, candidate)| *candidate == oid)
        .map(|(curve, _)| *curve)
        .ok_or_else(|| LoomError::UnsupportedAlgorithm(format!("named curve {oid}")))
}

fn curve_spec(curve: EcCurve) -> AsymKeySpec {
    match curve {
        EcCurve::Sm2p256v1 => AsymKeySpec::Sm2,
        other => AsymKeySpec::Ec(other),
    }
}

fn xmss_parameters(params: XmssParams) -> Result<Vec<u8>> {
    let digest = XMSS_DIGEST_OIDS
        .iter()
        .find(|(candidate, _)| *candidate == params.digest())
        .map(|(_, oid)| *oid)
        .ok_or_else(|| LoomError::unsupported(format!("{:?}", params.digest())))?;
    Ok(XmssAlgorithmParams { height: params.height(), layers: params.layers(), digest }.to_der()?)
}

fn xmss_spec(oid: ObjectIdentifier, parameters: Option<AnyRef<'_>>) -> Result<AsymKeySpec> {
    let parameters = parameters.ok_or_else(|| LoomError::Parse("XMSS parameters missing".to_string()))?;
    let parsed: XmssAlgorithmParams = parameters.decode_as()?;
    let digest = XMSS_DIGEST_OIDS
        .iter()
        .find(|(_, candidate)| *candidate == parsed.digest)
        .map(|(digest, _)| *digest)
        .ok_or_else(|| LoomError::UnsupportedAlgorithm(format!("XMSS digest {}", parsed.digest)))?;
    let unsupported = || {
        LoomError::UnsupportedAlgorithm(format!("XMSS tree h={} d={}", parsed.height, parsed.layers))
    };
    if oid == ID_XMSS {
        let height = [XmssHeight::H10, XmssHeight::H16, XmssHeight::H20]
            .into_iter()
            .find(|h| h.height() == parsed.height && parsed.layers == 1)
            .ok_or_else(unsupported)?;
        Ok(AsymKeySpec::Xmss(digest, height))
    } else {
        let height = [XmssMtHeight::H20D2, XmssMtHeight::H20D4, XmssMtHeight::H40D4, XmssMtHeight::H40D8]
            .into_iter()
            .find(|h| h.height() == parsed.height && h.layers() == parsed.layers)
            .ok_or_else(unsupported)?;
        Ok(AsymKeySpec::XmssMt(digest, height))
    }
}

fn xmss_oid(spec: AsymKeySpec) -> ObjectIdentifier {
    if matches!(spec, AsymKeySpec::XmssMt(..)) {
        ID_XMSS_MT
    } else {
        ID_XMSS
    }
}

fn rsa_spec(n_bits: usize) -> Result<AsymKeySpec> {
    RsaModulus::from_bits(n_bits)
        .map(AsymKeySpec::Rsa)
        .ok_or_else(|| LoomError::UnsupportedAlgorithm(format!("RSA-{n_bits}")))
}

fn ffc_params(p_bits: usize, n_bits: usize) -> Result<FfcParams> {
    FfcParams::from_lengths(p_bits, n_bits)
        .ok_or_else(|| LoomError::UnsupportedAlgorithm(format!("finite-field domain {p_bits}/{n_bits}")))
}

fn spki_der(oid: ObjectIdentifier, parameters: Option<&[u8]>, key: &[u8]) -> Result<Vec<u8>> {
    let parameters = parameters.map(AnyRef::from_der).transpose()?;
    let info = SubjectPublicKeyInfoRef {
        algorithm: AlgorithmIdentifierRef { oid, parameters },
        subject_public_key: BitStringRef::from_bytes(key)?,
    };
    Ok(info.to_der()?)
}

fn pkcs8_der(oid: ObjectIdentifier, parameters: Option<&[u8]>, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let parameters = parameters.map(AnyRef::from_der).transpose()?;
    let info = PrivateKeyInfo::new(AlgorithmIdentifierRef { oid, parameters }, key);
    Ok(Zeroizing::new(info.to_der()?))
}

fn dh_parameters(domain: &DhDomain) -> Result<Vec<u8>> {
    let prime = domain.p().to_bytes_be();
    let base = domain.g().to_bytes_be();
    let private_value_length = u32::try_from(domain.private_bits())
        .map_err(|_| LoomError::InvalidKey("DH private value length".to_string()))?;
    let parameter = DhParameter {
        prime: UintRef::new(&prime)?,
        base: UintRef::new(&base)?,
        private_value_length: Some(private_value_length),
    };
    Ok(parameter.to_der()?)
}

fn dh_domain(parameters: Option<AnyRef<'_>>) -> Result<DhDomain> {
    let parameters = parameters.ok_or_else(|| LoomError::Parse("DH parameters missing".to_string()))?;
    let parsed: DhParameter<'_> = parameters.decode_as()?;
    let p = BigUint::from_bytes_be(parsed.prime.as_bytes());
    let g = BigUint::from_bytes_be(parsed.base.as_bytes());
    let private_bits = parsed
        .private_value_length
        .map_or(p.bits(), |bits| bits as usize);
    DhDomain::new(p, g, private_bits)
}

fn dh_spec(domain: &DhDomain) -> Result<AsymKeySpec> {
    Ok(AsymKeySpec::Dh(ffc_params(domain.p().bits(), domain.private_bits())?))
}

fn octet_string(raw: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(OctetStringRef::new(raw)?.to_der()?))
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes)
        .map_err(|_| LoomError::InvalidKey(format!("{what} must be {N} bytes, got {}", bytes.len())))
}

/// SubjectPublicKeyInfo of a public key.
pub(crate) fn encode_public(spec: AsymKeySpec, public: &PublicKey) -> Result<Vec<u8>> {
    match public {
        PublicKey::Rsa(key) => Ok(key.to_public_key_der()?.into_vec()),
        PublicKey::Dsa(key) => Ok(key.to_public_key_der()?.into_vec()),
        PublicKey::Dh(key) => {
            let parameters = dh_parameters(key.domain())?;
            let y = key.y().to_bytes_be();
            let y = UintRef::new(&y)?.to_der()?;
            spki_der(DH_KEY_AGREEMENT, Some(&parameters), &y)
        }
        PublicKey::Ec(key) => ec::encode_public(key),
        PublicKey::Ed25519(key) => spki_der(ID_ED25519, None, key.as_bytes()),
        PublicKey::X25519(key) => spki_der(ID_X25519, None, key.as_bytes()),
        PublicKey::X448(key) => spki_der(ID_X448, None, key),
        PublicKey::Encoded(bytes) => spki_der(pq_oid(spec)?, None, bytes),
        PublicKey::Xmss(key) => {
            let parameters = xmss_parameters(key.params())?;
            spki_der(xmss_oid(spec), Some(&parameters), &key.to_bytes())
        }
    }
}

/// PKCS#8 PrivateKeyInfo of a private key.
pub(crate) fn encode_private(spec: AsymKeySpec, private: &PrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    match private {
        PrivateKey::Rsa(key) => Ok(Zeroizing::new(key.to_pkcs8_der()?.as_bytes().to_vec())),
        PrivateKey::Dsa(key) => Ok(Zeroizing::new(key.to_pkcs8_der()?.as_bytes().to_vec())),
        PrivateKey::Dh(key) => {
            let parameters = dh_parameters(key.domain())?;
            let x = Zeroizing::new(key.x().to_bytes_be());
            let x = Zeroizing::new(UintRef::new(&x)?.to_der()?);
            pkcs8_der(DH_KEY_AGREEMENT, Some(&parameters), &x)
        }
        PrivateKey::Ec(key) => ec::encode_private(key),
        PrivateKey::Ed25519(key) => pkcs8_der(ID_ED25519, None, &octet_string(&key.to_bytes())?),
        PrivateKey::X25519(key) => pkcs8_der(ID_X25519, None, &octet_string(key.as_bytes())?),
        PrivateKey::X448(key) => pkcs8_der(ID_X448, None, &octet_string(&key[..])?),
        PrivateKey::Encoded(bytes) => pkcs8_der(pq_oid(spec)?, None, bytes),
        PrivateKey::Xmss(key) => {
            let parameters = xmss_parameters(key.public_key().params())?;
            pkcs8_der(xmss_oid(spec), Some(&parameters), &key.to_bytes())
        }
    }
}

/// Decode a SubjectPublicKeyInfo, reporting the spec it encodes.
pub(crate) fn decode_public(der: &[u8]) -> Result<(AsymKeySpec, PublicKey)> {
    let info = SubjectPublicKeyInfoRef::from_der(der)?;
    let oid = info.algorithm.oid;
    let key_bytes = info
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| LoomError::Parse("public key bit string has unused bits".to_string()))?;

    if oid == RSA_ENCRYPTION {
        let key = rsa::RsaPublicKey::from_public_key_der(der)
            .map_err(|e| LoomError::parse("decode RSA public key", e))?;
        return Ok((rsa_spec(key.n().bits())?, PublicKey::Rsa(key)));
    }
    if oid == ID_DSA {
        let key = dsa::VerifyingKey::from_public_key_der(der)
            .map_err(|e| LoomError::parse("decode DSA public key", e))?;
        let components = key.components();
        let params = ffc_params(components.p().bits(), components.q().bits())?;
        return Ok((AsymKeySpec::Dsa(params), PublicKey::Dsa(key)));
    }
    if oid == DH_KEY_AGREEMENT {
        let domain = dh_domain(info.algorithm.parameters)?;
        let y = UintRef::from_der(key_bytes)?;
        let spec = dh_spec(&domain)?;
        let key = DhPublicKey::new(domain, BigUint::from_bytes_be(y.as_bytes()))?;
        return Ok((spec, PublicKey::Dh(key)));
    }
    if oid == ID_EC_PUBLIC_KEY {
        let curve = curve_from_oid(info.algorithm.parameters_oid()?)?;
        return Ok((curve_spec(curve), PublicKey::Ec(ec::decode_public(curve, der)?)));
    }
    if oid == ID_ED25519 {
        let bytes = fixed::<32>(key_bytes, "Ed25519 public key")?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| LoomError::invalid_key("Ed25519 public key", e))?;
        return Ok((AsymKeySpec::Ed25519, PublicKey::Ed25519(key)));
    }
    if oid == ID_X25519 {
        let bytes = fixed::<32>(key_bytes, "X25519 public key")?;
        return Ok((AsymKeySpec::X25519, PublicKey::X25519(x25519_dalek::PublicKey::from(bytes))));
    }
    if oid == ID_X448 {
        let bytes = fixed::<56>(key_bytes, "X448 public key")?;
        return Ok((AsymKeySpec::X448, PublicKey::X448(bytes)));
    }
    if oid == ID_XMSS || oid == ID_XMSS_MT {
        let spec = xmss_spec(oid, info.algorithm.parameters)?;
        let key = XmssPublicKey::from_bytes(XmssParams::from_spec(spec)?, key_bytes)?;
        return Ok((spec, PublicKey::Xmss(key)));
    }
    if let Some((spec, _)) = PQ_OIDS.iter().find(|(_, candidate)| *candidate == oid) {
        pq::check_length(*spec, key_bytes, false)?;
        return Ok((*spec, PublicKey::Encoded(key_bytes.to_vec())));
    }
    Err(LoomError::UnsupportedAlgorithm(format!("public key algorithm {oid}")))
}

/// Decode a PKCS#8 PrivateKeyInfo, reporting the spec it encodes.
pub(crate) fn decode_private(der: &[u8]) -> Result<(AsymKeySpec, PrivateKey)> {
    let info = PrivateKeyInfo::from_der(der)?;
    let oid = info.algorithm.oid;

    if oid == RSA_ENCRYPTION {
        let key = rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| LoomError::parse("decode RSA private key", e))?;
        return Ok((rsa_spec(key.n().bits())?, PrivateKey::Rsa(key)));
    }
    if oid == ID_DSA {
        let key = dsa::SigningKey::from_pkcs8_der(der)
            .map_err(|e| LoomError::parse("decode DSA private key", e))?;
        let components = key.verifying_key().components();
        let params = ffc_params(components.p().bits(), components.q().bits())?;
        return Ok((AsymKeySpec::Dsa(params), PrivateKey::Dsa(key)));
    }
    if oid == DH_KEY_AGREEMENT {
        let domain = dh_domain(info.algorithm.parameters)?;
        let x = UintRef::from_der(info.private_key)?;
        let spec = dh_spec(&domain)?;
        let key = DhPrivateKey::new(domain, BigUint::from_bytes_be(x.as_bytes()))?;
        return Ok((spec, PrivateKey::Dh(key)));
    }
    if oid == ID_EC_PUBLIC_KEY {
        let curve = curve_from_oid(info.algorithm.parameters_oid()?)?;
        return Ok((curve_spec(curve), PrivateKey::Ec(ec::decode_private(curve, der)?)));
    }
    if oid == ID_ED25519 || oid == ID_X25519 || oid == ID_X448 {
        let inner = OctetStringRef::from_der(info.private_key)?;
        let raw = inner.as_bytes();
        if oid == ID_ED25519 {
            let seed = Zeroizing::new(fixed::<32>(raw, "Ed25519 private key")?);
            return Ok((AsymKeySpec::Ed25519, PrivateKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))));
        }
        if oid == ID_X25519 {
            let secret = fixed::<32>(raw, "X25519 private key")?;
            return Ok((AsymKeySpec::X25519, PrivateKey::X25519(x25519_dalek::StaticSecret::from(secret))));
        }
        let secret = Zeroizing::new(fixed::<56>(raw, "X448 private key")?);
        return Ok((AsymKeySpec::X448, PrivateKey::X448(secret)));
    }
    if oid == ID_XMSS || oid == ID_XMSS_MT {
        let spec = xmss_spec(oid, info.algorithm.parameters)?;
        let key = XmssPrivateKey::from_bytes(XmssParams::from_spec(spec)?, info.private_key)?;
        return Ok((spec, PrivateKey::Xmss(key)));
    }
    if let Some((spec, _)) = PQ_OIDS.iter().find(|(_, candidate)| *candidate == oid) {
        pq::check_length(*spec, info.private_key, true)?;
        return Ok((*spec, PrivateKey::Encoded(Zeroizing::new(info.private_key.to_vec()))));
    }
    Err(LoomError::UnsupportedAlgorithm(format!("private key algorithm {oid}")))
}
