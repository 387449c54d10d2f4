mod test_pki;

use std::rc::Rc;

use ltvval::*;
use test_pki::*;

fn index_with(pki: &Pki) -> TrustIndex {
    let mut ti = TrustIndex::new();
    ti.add_trusted(&[pki.root.clone()]);
    ti.add_known(
        &[pki.intermediate.clone(), pki.leaf.clone()],
        CertificateOrigin::SignatureContainer,
    );
    ti
}

#[test]
fn resolves_complete_chain() {
    let env = test_env();
    let pki = pki();
    let mut ti = index_with(&pki);
    let mut resolver = ChainResolver::new(&env, &mut ti);
    let chains = resolver.resolve_chains(&pki.leaf);
    assert_eq!(
        vec![vec![
            pki.root.clone(),
            pki.intermediate.clone(),
            pki.leaf.clone()
        ]],
        chains
    );
}

#[test]
fn self_signed_is_terminal() {
    let env = test_env();
    let pki = pki();
    let mut ti = index_with(&pki);
    let mut resolver = ChainResolver::new(&env, &mut ti);
    assert_eq!(vec![vec![pki.root.clone()]], resolver.resolve_chains(&pki.root));
    assert!(resolver.find_issuer(&pki.root).is_none());
}

#[test]
fn cycle_terminates() {
    // A is issued by B and B is issued by A
    let a = make_cert("CN=A", b"a-key", "CN=B", b"b-key", 10, vec![ca_ext()]);
    let b = make_cert("CN=B", b"b-key", "CN=A", b"a-key", 11, vec![ca_ext()]);
    let env = test_env();
    let mut ti = TrustIndex::new();
    ti.add_known(&[a.clone(), b.clone()], CertificateOrigin::SignatureContainer);
    let mut resolver = ChainResolver::new(&env, &mut ti);
    let chains = resolver.resolve_chains(&a);
    assert_eq!(vec![vec![b.clone(), a.clone()]], chains);
}

#[test]
fn dead_end_returns_partial_chain() {
    let env = test_env();
    let pki = pki();
    let mut ti = TrustIndex::new();
    ti.add_known(&[pki.leaf.clone()], CertificateOrigin::SignatureContainer);
    let mut resolver = ChainResolver::new(&env, &mut ti);
    assert_eq!(vec![vec![pki.leaf.clone()]], resolver.resolve_chains(&pki.leaf));
    assert!(resolver.find_issuer(&pki.leaf).is_none());
}

#[test]
fn cross_certified_intermediate_yields_two_chains() {
    let env = test_env();
    let pki = pki();
    let other_root = make_cert(
        "CN=Other Root",
        b"other-root-key",
        "CN=Other Root",
        b"other-root-key",
        20,
        vec![ca_ext()],
    );
    // same subject and key as the intermediate, issued by the other root
    let cross = make_cert(
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        "CN=Other Root",
        b"other-root-key",
        21,
        vec![ca_ext()],
    );
    let mut ti = index_with(&pki);
    ti.add_trusted(&[other_root.clone()]);
    ti.add_known(&[cross.clone()], CertificateOrigin::Aia);

    let mut resolver = ChainResolver::new(&env, &mut ti);
    let chains = resolver.resolve_chains(&pki.leaf);
    assert_eq!(2, chains.len());
    assert!(chains.contains(&vec![
        pki.root.clone(),
        pki.intermediate.clone(),
        pki.leaf.clone()
    ]));
    assert!(chains.contains(&vec![other_root, cross, pki.leaf.clone()]));
}

#[test]
fn reissued_intermediate_reaches_shared_root() {
    let env = test_env();
    let pki = pki();
    let reissued = make_cert(
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        ROOT,
        ROOT_KEY,
        99,
        vec![ca_ext()],
    );
    let mut ti = index_with(&pki);
    ti.add_known(&[reissued.clone()], CertificateOrigin::Aia);

    let mut resolver = ChainResolver::new(&env, &mut ti);
    let chains = resolver.resolve_chains(&pki.leaf);
    assert_eq!(2, chains.len());
    for chain in &chains {
        assert_eq!(3, chain.len());
        assert_eq!(pki.root, chain[0]);
    }
    assert!(chains.contains(&vec![pki.root.clone(), reissued, pki.leaf.clone()]));
}

#[test]
fn end_entity_is_never_an_issuer() {
    let env = test_env();
    let pki = pki();
    // name and key match the intermediate, but basic constraints deny cA
    let impostor = make_cert(
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        ROOT,
        ROOT_KEY,
        98,
        vec![end_entity_ext()],
    );
    let mut ti = index_with(&pki);
    ti.add_known(&[impostor], CertificateOrigin::Aia);

    let mut resolver = ChainResolver::new(&env, &mut ti);
    assert_eq!(
        vec![vec![
            pki.root.clone(),
            pki.intermediate.clone(),
            pki.leaf.clone()
        ]],
        resolver.resolve_chains(&pki.leaf)
    );
}

#[test]
fn issuer_retrieved_via_aia() {
    let pki = pki();
    let leaf = make_cert(
        LEAF,
        LEAF_KEY,
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        30,
        vec![ca_issuers_ext(&[
            "ldap://example.com/int",
            "http://example.com/int.cer",
        ])],
    );

    let mut fetcher = MockAiaFetcher::default();
    fetcher.resources.insert(
        "http://example.com/int.cer".to_string(),
        pki.intermediate.encoded_cert.clone(),
    );
    let calls = Rc::clone(&fetcher.calls);
    let mut env = test_env();
    env.add_aia_fetcher(Box::new(fetcher));

    let mut ti = TrustIndex::new();
    ti.add_trusted(&[pki.root.clone()]);
    {
        let mut resolver = ChainResolver::new(&env, &mut ti);
        resolver.set_retrieve_from_aia(false);
        assert_eq!(vec![vec![leaf.clone()]], resolver.resolve_chains(&leaf));
    }
    assert_eq!(0, calls.get());

    let mut resolver = ChainResolver::new(&env, &mut ti);
    let chains = resolver.resolve_chains(&leaf);
    assert_eq!(
        vec![vec![pki.root.clone(), pki.intermediate.clone(), leaf.clone()]],
        chains
    );
    assert!(calls.get() >= 1);
    assert_eq!(
        Some(CertificateOrigin::Aia),
        ti.origin_of(&pki.intermediate)
    );
}

#[test]
fn completes_partial_chain() {
    let env = test_env();
    let pki = pki();
    let stray = make_cert("CN=Stray", b"stray-key", "CN=Nobody", b"nobody-key", 40, vec![]);
    let mut ti = index_with(&pki);
    let mut resolver = ChainResolver::new(&env, &mut ti);

    let completed = resolver.complete_partial_chain(&[pki.leaf.clone(), stray.clone()]);
    assert_eq!(
        vec![
            pki.leaf.clone(),
            pki.intermediate.clone(),
            pki.root.clone(),
            stray
        ],
        completed
    );
    assert!(resolver.complete_partial_chain(&[]).is_empty());
}

#[test]
fn origin_keeps_earliest_source() {
    let pki = pki();
    let mut ti = TrustIndex::new();
    ti.add_known(&[pki.intermediate.clone()], CertificateOrigin::Aia);
    assert_eq!(Some(CertificateOrigin::Aia), ti.origin_of(&pki.intermediate));
    ti.add_known(
        &[pki.intermediate.clone()],
        CertificateOrigin::SignatureContainer,
    );
    assert_eq!(
        Some(CertificateOrigin::SignatureContainer),
        ti.origin_of(&pki.intermediate)
    );
    ti.add_known(&[pki.intermediate.clone()], CertificateOrigin::Crl);
    assert_eq!(
        Some(CertificateOrigin::SignatureContainer),
        ti.origin_of(&pki.intermediate)
    );

    ti.add_trusted(&[pki.root.clone()]);
    assert!(ti.is_trusted(&pki.root));
    assert_eq!(Some(CertificateOrigin::Trusted), ti.origin_of(&pki.root));
    assert_eq!(1, ti.lookup_by_issuer_name(pki.intermediate.issuer()).len());
}

#[test]
fn malformed_known_certificates_are_dropped() {
    let pki = pki();
    let mut ti = TrustIndex::new();
    let blobs = vec![
        pki.intermediate.encoded_cert.clone(),
        b"garbage".to_vec(),
        pki.leaf.encoded_cert.clone(),
    ];
    assert_eq!(2, ti.add_known_from_der(&blobs, CertificateOrigin::OcspResponse));
    assert_eq!(2, ti.len());
    assert!(ti.trusted_certificates().is_empty());
    assert_eq!(Some(CertificateOrigin::OcspResponse), ti.origin_of(&pki.leaf));
}

#[cfg(feature = "std")]
#[test]
fn trust_anchors_loaded_from_folder() {
    use std::fs;

    let pki = pki();
    let expired = make_cert_with_validity(
        "CN=Expired Root",
        b"expired-key",
        "CN=Expired Root",
        b"expired-key",
        90,
        vec![ca_ext()],
        NOW - 3 * 365 * 86_400,
        NOW - 365 * 86_400,
    );
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("root.der"), &pki.root.encoded_cert).unwrap();
    let pem = pem_rfc7468::encode_string(
        "CERTIFICATE",
        pem_rfc7468::LineEnding::LF,
        &pki.intermediate.encoded_cert,
    )
    .unwrap();
    fs::write(dir.path().join("intermediate.pem"), pem).unwrap();
    fs::write(dir.path().join("expired.cer"), &expired.encoded_cert).unwrap();
    fs::write(dir.path().join("notes.txt"), b"not a certificate").unwrap();
    fs::write(dir.path().join("broken.crt"), b"not a certificate").unwrap();

    let folder = dir.path().to_str().unwrap();
    let mut ti = TrustIndex::new();
    assert_eq!(2, load_trust_anchors_from_folder(&mut ti, folder, now()).unwrap());
    assert!(ti.is_trusted(&pki.root));
    assert!(ti.is_trusted(&pki.intermediate));
    assert!(!ti.is_trusted(&expired));

    let mut known = TrustIndex::new();
    assert_eq!(
        2,
        load_known_certificates_from_folder(&mut known, folder, CertificateOrigin::Aia, now())
            .unwrap()
    );
    assert_eq!(Some(CertificateOrigin::Aia), known.origin_of(&pki.root));

    let mut settings = LtvSettings::new();
    let mut from_settings = TrustIndex::new();
    assert_eq!(
        0,
        load_trust_anchors_from_settings(&mut from_settings, &settings).unwrap()
    );
    set_trust_anchor_folder(&mut settings, folder.to_string());
    set_time_of_interest(&mut settings, now());
    assert_eq!(
        2,
        load_trust_anchors_from_settings(&mut from_settings, &settings).unwrap()
    );
    assert!(from_settings.is_trusted(&pki.intermediate));
}
